use super::error::DecodeError;
use crate::firestore::models::{Fields, LatLng, MapValue, Value};
use crate::firestore::types::{Reference, Timestamp, GEO_POINT_TOKEN, REFERENCE_TOKEN, TIMESTAMP_TOKEN};
use base64::Engine;
use serde::de::value::StringDeserializer;
use serde::de::{self, DeserializeSeed, Visitor};
use std::collections::hash_map;

/// Deserializes a Firestore [`Value`] into any `Deserialize` type.
///
/// Every typed entry point checks the wire tag against the type the target asks for
/// and fails with [`DecodeError::TypeMismatch`] instead of coercing.
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

fn parse_integer(s: String) -> Result<i64, DecodeError> {
    s.parse::<i64>().map_err(|_| DecodeError::InvalidInteger(s))
}

fn decode_bytes(s: &str) -> Result<Vec<u8>, DecodeError> {
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| DecodeError::InvalidBytes(e.to_string()))
}

fn lat_lng_fields(lat_lng: LatLng) -> Fields {
    let mut fields = Fields::with_capacity(2);
    fields.insert("latitude".to_string(), Value::DoubleValue(lat_lng.latitude));
    fields.insert("longitude".to_string(), Value::DoubleValue(lat_lng.longitude));
    fields
}

fn visit_array<'de, V: Visitor<'de>>(values: Vec<Value>, visitor: V) -> Result<V::Value, DecodeError> {
    let len = values.len();
    let mut seq = SeqDeserializer {
        iter: values.into_iter().enumerate(),
    };
    let out = visitor.visit_seq(&mut seq)?;
    if seq.iter.len() == 0 {
        Ok(out)
    } else {
        Err(de::Error::invalid_length(len, &"fewer elements in array"))
    }
}

fn visit_map<'de, V: Visitor<'de>>(fields: Fields, visitor: V) -> Result<V::Value, DecodeError> {
    visitor.visit_map(MapDeserializer {
        iter: fields.into_iter(),
        pending: None,
    })
}

macro_rules! deserialize_integer {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
                match self.value {
                    Value::IntegerValue(s) => visitor.visit_i64(parse_integer(s)?),
                    other => Err(DecodeError::mismatch("integerValue", other.field_type())),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::NullValue(_) => visitor.visit_unit(),
            Value::BooleanValue(b) => visitor.visit_bool(b),
            Value::IntegerValue(s) => visitor.visit_i64(parse_integer(s)?),
            Value::DoubleValue(d) => visitor.visit_f64(d),
            Value::TimestampValue(s) | Value::StringValue(s) | Value::ReferenceValue(s) => {
                visitor.visit_string(s)
            }
            Value::BytesValue(s) => visitor.visit_byte_buf(decode_bytes(&s)?),
            Value::GeoPointValue(lat_lng) => visit_map(lat_lng_fields(lat_lng), visitor),
            Value::ArrayValue(array) => visit_array(array.values, visitor),
            Value::MapValue(map) => visit_map(map.fields, visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::BooleanValue(b) => visitor.visit_bool(b),
            other => Err(DecodeError::mismatch("booleanValue", other.field_type())),
        }
    }

    deserialize_integer! {
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::DoubleValue(d) => visitor.visit_f64(d),
            // integerValue widens into float fields
            Value::IntegerValue(s) => visitor.visit_f64(parse_integer(s)? as f64),
            other => Err(DecodeError::mismatch("doubleValue", other.field_type())),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::StringValue(s) => visitor.visit_string(s),
            other => Err(DecodeError::mismatch("stringValue", other.field_type())),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::BytesValue(s) => visitor.visit_byte_buf(decode_bytes(&s)?),
            other => Err(DecodeError::mismatch("bytesValue", other.field_type())),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::NullValue(_) => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::NullValue(_) => visitor.visit_unit(),
            other => Err(DecodeError::mismatch("nullValue", other.field_type())),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match name {
            TIMESTAMP_TOKEN => match self.value {
                Value::TimestampValue(s) => {
                    if Timestamp::parse(&s).is_err() {
                        return Err(DecodeError::InvalidTimestamp(s));
                    }
                    visitor.visit_newtype_struct(ValueDeserializer::new(Value::StringValue(s)))
                }
                other => Err(DecodeError::mismatch("timestampValue", other.field_type())),
            },
            REFERENCE_TOKEN => match self.value {
                Value::ReferenceValue(s) => {
                    if Reference::parse(&s).is_none() {
                        return Err(DecodeError::InvalidReference(s));
                    }
                    visitor.visit_newtype_struct(ValueDeserializer::new(Value::StringValue(s)))
                }
                other => Err(DecodeError::mismatch("referenceValue", other.field_type())),
            },
            GEO_POINT_TOKEN => match self.value {
                Value::GeoPointValue(lat_lng) => {
                    let fields = lat_lng_fields(lat_lng);
                    visitor.visit_newtype_struct(ValueDeserializer::new(Value::MapValue(MapValue { fields })))
                }
                other => Err(DecodeError::mismatch("geoPointValue", other.field_type())),
            },
            _ => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::ArrayValue(array) => visit_array(array.values, visitor),
            other => Err(DecodeError::mismatch("arrayValue", other.field_type())),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::MapValue(map) => visit_map(map.fields, visitor),
            other => Err(DecodeError::mismatch("mapValue", other.field_type())),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::StringValue(variant) => visitor.visit_enum(StringDeserializer::<DecodeError>::new(variant)),
            Value::MapValue(map) if map.fields.len() == 1 => {
                let (variant, value) = map
                    .fields
                    .into_iter()
                    .next()
                    .ok_or_else(|| DecodeError::Message("empty enum map".to_string()))?;
                visitor.visit_enum(EnumDeserializer { variant, value })
            }
            other => Err(DecodeError::mismatch(
                "stringValue or single-entry mapValue",
                other.field_type(),
            )),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }
}

struct SeqDeserializer {
    iter: std::iter::Enumerate<std::vec::IntoIter<Value>>,
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = DecodeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DecodeError> {
        match self.iter.next() {
            Some((index, value)) => seed
                .deserialize(ValueDeserializer::new(value))
                .map(Some)
                .map_err(|e| e.in_element(index)),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: hash_map::IntoIter<String, Value>,
    pending: Option<(String, Value)>,
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = DecodeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DecodeError> {
        match self.iter.next() {
            Some((key, value)) => {
                let out = seed.deserialize(StringDeserializer::<DecodeError>::new(key.clone()))?;
                self.pending = Some((key, value));
                Ok(Some(out))
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, DecodeError> {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| DecodeError::Message("map value requested before its key".to_string()))?;
        seed.deserialize(ValueDeserializer::new(value))
            .map_err(|e| e.in_field(&key))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct EnumDeserializer {
    variant: String,
    value: Value,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = DecodeError;
    type Variant = VariantDeserializer;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, VariantDeserializer), DecodeError> {
        let variant = seed.deserialize(StringDeserializer::<DecodeError>::new(self.variant.clone()))?;
        Ok((
            variant,
            VariantDeserializer {
                variant: self.variant,
                value: self.value,
            },
        ))
    }
}

struct VariantDeserializer {
    variant: String,
    value: Value,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = DecodeError;

    fn unit_variant(self) -> Result<(), DecodeError> {
        match self.value {
            Value::NullValue(_) => Ok(()),
            other => Err(DecodeError::mismatch("nullValue", other.field_type()).in_field(&self.variant)),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, DecodeError> {
        seed.deserialize(ValueDeserializer::new(self.value))
            .map_err(|e| e.in_field(&self.variant))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, DecodeError> {
        de::Deserializer::deserialize_seq(ValueDeserializer::new(self.value), visitor)
            .map_err(|e| e.in_field(&self.variant))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        de::Deserializer::deserialize_map(ValueDeserializer::new(self.value), visitor)
            .map_err(|e| e.in_field(&self.variant))
    }
}
