//! Conversion between Rust models and Firestore's typed wire values.
//!
//! The codec is a serde `Serializer`/`Deserializer` pair over [`Value`]. The declared wire
//! type of a model field is its Rust type: `String` is a `stringValue`, `i64` an
//! `integerValue`, [`Timestamp`](crate::firestore::types::Timestamp) a `timestampValue`,
//! [`GeoPoint`](crate::firestore::types::GeoPoint) a `geoPointValue` and so on. Decoding
//! checks every wire tag against the declared type.
//!
//! ```rust
//! use firestore_rest::{from_fields, to_fields, GeoPoint};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! #[serde(rename_all = "camelCase")]
//! struct Place {
//!     title: String,
//!     location: GeoPoint,
//!     note: Option<String>,
//! }
//!
//! let place = Place { title: "Home".into(), location: GeoPoint::new(15.03, 15.03), note: None };
//! let fields = to_fields(&place).unwrap();
//! assert!(fields["note"].is_null());
//! assert_eq!(from_fields::<Place>(fields).unwrap(), place);
//! ```

mod de;
mod error;
mod mask;
mod ser;

#[cfg(test)]
mod tests;

pub use self::de::ValueDeserializer;
pub use self::error::{DecodeError, EncodeError};
pub use self::mask::FieldMask;
pub use self::ser::ValueSerializer;

use super::models::{Fields, MapValue, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a single value.
pub fn to_value<T: ?Sized + Serialize>(value: &T) -> Result<Value, EncodeError> {
    value.serialize(ValueSerializer)
}

/// Decodes a single value.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, DecodeError> {
    T::deserialize(ValueDeserializer::new(value))
}

/// Encodes a model into the `fields` of a document.
pub fn to_fields<T: ?Sized + Serialize>(value: &T) -> Result<Fields, EncodeError> {
    match to_value(value)? {
        Value::MapValue(map) => Ok(map.fields),
        other => Err(EncodeError::NotAMap(other.field_type())),
    }
}

/// Decodes the `fields` of a document into a model.
pub fn from_fields<T: DeserializeOwned>(fields: Fields) -> Result<T, DecodeError> {
    from_value(Value::MapValue(MapValue { fields }))
}
