//! Model-side types that carry a Firestore wire type.
//!
//! Each of these serializes through a serde newtype struct with a reserved name. The
//! Firestore codec recognises the name and emits the matching tag (`timestampValue`,
//! `geoPointValue`, `referenceValue`); any other serde format sees the inner value only,
//! so the types stay usable with `serde_json` and friends.

use super::models::LatLng;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub(crate) const TIMESTAMP_TOKEN: &str = "$firestore::Timestamp";
pub(crate) const GEO_POINT_TOKEN: &str = "$firestore::GeoPoint";
pub(crate) const REFERENCE_TOKEN: &str = "$firestore::Reference";

const DEFAULT_DATABASE: &str = "(default)";

/// A point in time, stored as `timestampValue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// RFC 3339 in UTC with as many fractional digits as needed.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|dt| Self(dt.with_timezone(&Utc)))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(TIMESTAMP_TOKEN, &self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimestampVisitor;

        impl<'de> Visitor<'de> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an RFC 3339 timestamp")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Timestamp, E> {
                Timestamp::parse(v).map_err(|e| E::custom(format!("invalid timestamp '{}': {}", v, e)))
            }

            fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<Timestamp, D::Error> {
                d.deserialize_str(self)
            }
        }

        deserializer.deserialize_newtype_struct(TIMESTAMP_TOKEN, TimestampVisitor)
    }
}

/// `#[serde(with = "firestore_rest::timestamp")]` for plain `DateTime<Utc>` fields.
pub mod timestamp {
    use super::Timestamp;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        Timestamp(*dt).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        Timestamp::deserialize(deserializer).map(|ts| ts.0)
    }

    /// The same for `Option<DateTime<Utc>>`; `None` is stored as `nullValue`.
    pub mod option {
        use super::Timestamp;
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            dt.map(Timestamp).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Ok(Option::<Timestamp>::deserialize(deserializer)?.map(|ts| ts.0))
        }
    }
}

/// A geographic point, stored as `geoPointValue`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl Serialize for GeoPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let lat_lng = LatLng {
            latitude: self.latitude,
            longitude: self.longitude,
        };
        serializer.serialize_newtype_struct(GEO_POINT_TOKEN, &lat_lng)
    }
}

impl<'de> Deserialize<'de> for GeoPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GeoPointVisitor;

        impl<'de> Visitor<'de> for GeoPointVisitor {
            type Value = GeoPoint;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a geo point")
            }

            fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<GeoPoint, D::Error> {
                let lat_lng = LatLng::deserialize(d)?;
                Ok(GeoPoint::new(lat_lng.latitude, lat_lng.longitude))
            }

            fn visit_map<A: de::MapAccess<'de>>(self, map: A) -> Result<GeoPoint, A::Error> {
                let lat_lng = LatLng::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(GeoPoint::new(lat_lng.latitude, lat_lng.longitude))
            }
        }

        deserializer.deserialize_newtype_struct(GEO_POINT_TOKEN, GeoPointVisitor)
    }
}

/// A reference to another document, stored as `referenceValue`. Never dereferenced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub project_id: String,
    pub database_id: String,
    /// Path relative to the database root, e.g. `users/alice`.
    pub document_path: String,
}

impl Reference {
    /// A reference into the `(default)` database of `project_id`.
    pub fn new(project_id: impl Into<String>, document_path: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: DEFAULT_DATABASE.to_string(),
            document_path: document_path.into().trim_matches('/').to_string(),
        }
    }

    /// `projects/{project}/databases/{database}/documents/{path}`
    pub fn resource_name(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}",
            self.project_id, self.database_id, self.document_path
        )
    }

    /// Parses a full resource name. Returns `None` when it is not a document name.
    pub fn parse(resource_name: &str) -> Option<Self> {
        let rest = resource_name.strip_prefix("projects/")?;
        let (project_id, rest) = rest.split_once("/databases/")?;
        let (database_id, document_path) = rest.split_once("/documents/")?;

        if project_id.is_empty() || database_id.is_empty() || document_path.is_empty() {
            return None;
        }

        Some(Self {
            project_id: project_id.to_string(),
            database_id: database_id.to_string(),
            document_path: document_path.to_string(),
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource_name())
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(REFERENCE_TOKEN, &self.resource_name())
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ReferenceVisitor;

        impl<'de> Visitor<'de> for ReferenceVisitor {
            type Value = Reference;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a document resource name")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Reference, E> {
                Reference::parse(v).ok_or_else(|| E::custom(format!("invalid reference '{}'", v)))
            }

            fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<Reference, D::Error> {
                d.deserialize_str(self)
            }
        }

        deserializer.deserialize_newtype_struct(REFERENCE_TOKEN, ReferenceVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_resource_name() {
        let reference = Reference::new("p", "/test/tester/");
        assert_eq!(
            reference.resource_name(),
            "projects/p/databases/(default)/documents/test/tester"
        );
        assert_eq!(Reference::parse(&reference.resource_name()), Some(reference));
    }

    #[test]
    fn test_reference_parse_rejects_non_documents() {
        assert!(Reference::parse("test/tester").is_none());
        assert!(Reference::parse("projects/p/databases/(default)/documents/").is_none());
    }

    #[test]
    fn test_types_are_plain_json_outside_firestore() {
        let ts = Timestamp::parse("2024-01-01T00:00:00.5Z").unwrap();
        assert_eq!(serde_json::to_value(ts).unwrap(), "2024-01-01T00:00:00.500Z");

        let gp: GeoPoint = serde_json::from_str(r#"{"latitude": 15.03, "longitude": 10.0}"#).unwrap();
        assert_eq!(gp, GeoPoint::new(15.03, 10.0));
    }
}
