use crate::firestore::models::{Fields, MapValue, Value};

/// Field paths restricting which fields an update writes.
///
/// Paths are dot separated (`address.city`). Fields outside the mask are left untouched
/// on the server; a masked field missing from the payload is deleted by the server.
/// Segments that are not plain identifiers (`sub-title`, `1st`) are backtick quoted
/// when sent, see [`FieldMask::field_paths`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldMask {
    paths: Vec<String>,
}

impl FieldMask {
    /// Builds a mask, dropping empty and repeated paths while keeping order.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for path in paths {
            let path = path.into();
            if !path.is_empty() && !out.contains(&path) {
                out.push(path);
            }
        }
        Self { paths: out }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The paths in Firestore field path syntax, as sent in `updateMask.fieldPaths`.
    pub fn field_paths(&self) -> Vec<String> {
        self.paths.iter().map(|path| quote_path(path)).collect()
    }

    /// Keeps only the masked fields. Each selected value is kept whole.
    pub fn apply(&self, fields: &Fields) -> Fields {
        let mut out = Fields::new();
        for path in &self.paths {
            let segments: Vec<&str> = path.split('.').collect();
            select(fields, &segments, &mut out);
        }
        out
    }
}

fn is_simple_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

fn quote_path(path: &str) -> String {
    path.split('.')
        .map(|segment| {
            if is_simple_segment(segment) {
                segment.to_string()
            } else {
                let escaped = segment.replace('\\', "\\\\").replace('`', "\\`");
                format!("`{}`", escaped)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn select(fields: &Fields, segments: &[&str], out: &mut Fields) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let Some(value) = fields.get(*first) else {
        return;
    };

    if rest.is_empty() {
        out.insert(first.to_string(), value.clone());
        return;
    }

    if let Value::MapValue(nested) = value {
        let entry = out
            .entry(first.to_string())
            .or_insert_with(|| Value::MapValue(MapValue::default()));
        // A parent path already copied the whole map
        if let Value::MapValue(target) = entry {
            select(&nested.fields, rest, &mut target.fields);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for FieldMask {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        FieldMask::new(iter)
    }
}
