use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// The field mapping of a document or of a `mapValue`.
pub type Fields = HashMap<String, Value>;

/// A Firestore document.
///
/// `Document<Fields>` is the generic envelope and matches the REST wire shape exactly.
/// `Document<T>` carries the fields decoded into a model type; see [`Document::decode`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document<T = Fields> {
    /// The full resource name, e.g. `projects/p/databases/(default)/documents/users/alice`.
    #[serde(default)]
    pub name: String,
    // Empty documents come back without `fields`
    #[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
    pub fields: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl<T> Document<T> {
    /// The document id, i.e. the last segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    /// The document path relative to the database root, e.g. `users/alice`.
    pub fn path(&self) -> &str {
        match self.name.find("/documents/") {
            Some(idx) => &self.name[idx + "/documents/".len()..],
            None => &self.name,
        }
    }
}

impl Document<Fields> {
    /// Decodes the raw fields into `T`, keeping name and timestamps.
    pub fn decode<T: serde::de::DeserializeOwned>(
        self,
    ) -> Result<Document<T>, crate::firestore::codec::DecodeError> {
        let fields = crate::firestore::codec::from_fields(self.fields)?;
        Ok(Document {
            name: self.name,
            fields,
            create_time: self.create_time,
            update_time: self.update_time,
        })
    }
}

/// A single typed value as sent over the wire: exactly one tag per value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    // Firestore sends integers as strings
    IntegerValue(#[serde(deserialize_with = "integer_string")] String),
    // Non-finite values travel as "NaN", "Infinity" and "-Infinity"
    DoubleValue(
        #[serde(serialize_with = "serialize_double", deserialize_with = "deserialize_double")]
        f64,
    ),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String), // base64 encoded
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

impl Value {
    /// The wire tag of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::NullValue(_) => FieldType::Null,
            Value::BooleanValue(_) => FieldType::Boolean,
            Value::IntegerValue(_) => FieldType::Integer,
            Value::DoubleValue(_) => FieldType::Double,
            Value::TimestampValue(_) => FieldType::Timestamp,
            Value::StringValue(_) => FieldType::String,
            Value::BytesValue(_) => FieldType::Bytes,
            Value::ReferenceValue(_) => FieldType::Reference,
            Value::GeoPointValue(_) => FieldType::GeoPoint,
            Value::ArrayValue(_) => FieldType::Array,
            Value::MapValue(_) => FieldType::Map,
        }
    }

    pub fn null() -> Self {
        Value::NullValue(())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::NullValue(_))
    }
}

/// Discriminator of a [`Value`], named after its wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Null,
    Boolean,
    Integer,
    Double,
    Timestamp,
    String,
    Bytes,
    Reference,
    GeoPoint,
    Array,
    Map,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Null => "nullValue",
            FieldType::Boolean => "booleanValue",
            FieldType::Integer => "integerValue",
            FieldType::Double => "doubleValue",
            FieldType::Timestamp => "timestampValue",
            FieldType::String => "stringValue",
            FieldType::Bytes => "bytesValue",
            FieldType::Reference => "referenceValue",
            FieldType::GeoPoint => "geoPointValue",
            FieldType::Array => "arrayValue",
            FieldType::Map => "mapValue",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

/// Wire form of a geo point. Zero coordinates may be omitted by the server.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    // An empty collection is returned as `{}`
    #[serde(default)]
    pub documents: Vec<Document>,
    pub next_page_token: Option<String>,
}

/// One page of a document listing.
#[derive(Debug, Clone)]
pub struct DocumentPage<T> {
    pub documents: Vec<Document<T>>,
    pub next_page_token: Option<String>,
}

fn integer_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntegerRepr {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match IntegerRepr::deserialize(deserializer)? {
        IntegerRepr::Text(s) => s,
        IntegerRepr::Signed(i) => i.to_string(),
        IntegerRepr::Unsigned(u) => u.to_string(),
    })
}

fn serialize_double<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_nan() {
        serializer.serialize_str("NaN")
    } else if value.is_infinite() && value.is_sign_positive() {
        serializer.serialize_str("Infinity")
    } else if value.is_infinite() {
        serializer.serialize_str("-Infinity")
    } else {
        serializer.serialize_f64(*value)
    }
}

fn deserialize_double<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DoubleRepr {
        Number(f64),
        Text(String),
    }

    match DoubleRepr::deserialize(deserializer)? {
        DoubleRepr::Number(d) => Ok(d),
        DoubleRepr::Text(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid double value '{}'", other))),
        },
    }
}
