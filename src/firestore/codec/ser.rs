use super::error::EncodeError;
use crate::firestore::models::{ArrayValue, Fields, LatLng, MapValue, Value};
use crate::firestore::types::{GEO_POINT_TOKEN, REFERENCE_TOKEN, TIMESTAMP_TOKEN};
use base64::Engine;
use serde::ser::{self, Serialize};

/// Serializes any `Serialize` value into a Firestore [`Value`].
pub struct ValueSerializer;

fn integer(v: i64) -> Value {
    Value::IntegerValue(v.to_string())
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = EncodeError;

    type SerializeSeq = SerializeArray;
    type SerializeTuple = SerializeArray;
    type SerializeTupleStruct = SerializeArray;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Value, EncodeError> {
        Ok(Value::BooleanValue(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, EncodeError> {
        Ok(integer(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, EncodeError> {
        Ok(integer(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, EncodeError> {
        Ok(integer(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, EncodeError> {
        Ok(integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, EncodeError> {
        Ok(integer(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, EncodeError> {
        Ok(integer(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, EncodeError> {
        Ok(integer(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, EncodeError> {
        i64::try_from(v)
            .map(integer)
            .map_err(|_| EncodeError::IntegerOverflow(v.to_string()))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, EncodeError> {
        Ok(Value::DoubleValue(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, EncodeError> {
        Ok(Value::DoubleValue(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, EncodeError> {
        Ok(Value::StringValue(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, EncodeError> {
        Ok(Value::StringValue(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, EncodeError> {
        Ok(Value::BytesValue(
            base64::engine::general_purpose::STANDARD.encode(v),
        ))
    }

    fn serialize_none(self) -> Result<Value, EncodeError> {
        Ok(Value::null())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, EncodeError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, EncodeError> {
        Ok(Value::null())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, EncodeError> {
        Ok(Value::null())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, EncodeError> {
        Ok(Value::StringValue(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Value, EncodeError> {
        let inner = value.serialize(ValueSerializer)?;
        match name {
            TIMESTAMP_TOKEN => match inner {
                Value::StringValue(s) => Ok(Value::TimestampValue(s)),
                other => Err(EncodeError::Message(format!(
                    "timestamp must serialize to a string, got {}",
                    other.field_type()
                ))),
            },
            REFERENCE_TOKEN => match inner {
                Value::StringValue(s) => Ok(Value::ReferenceValue(s)),
                other => Err(EncodeError::Message(format!(
                    "reference must serialize to a string, got {}",
                    other.field_type()
                ))),
            },
            GEO_POINT_TOKEN => geo_point(inner),
            _ => Ok(inner),
        }
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, EncodeError> {
        let mut fields = Fields::with_capacity(1);
        fields.insert(variant.to_string(), value.serialize(ValueSerializer)?);
        Ok(Value::MapValue(MapValue { fields }))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeArray, EncodeError> {
        Ok(SerializeArray {
            values: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeArray, EncodeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SerializeArray, EncodeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant, EncodeError> {
        Ok(SerializeTupleVariant {
            variant,
            values: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeMap, EncodeError> {
        Ok(SerializeMap {
            fields: Fields::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeMap, EncodeError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeStructVariant, EncodeError> {
        Ok(SerializeStructVariant {
            variant,
            fields: Fields::with_capacity(len),
        })
    }
}

fn geo_point(inner: Value) -> Result<Value, EncodeError> {
    let fields = match inner {
        Value::MapValue(MapValue { fields }) => fields,
        other => {
            return Err(EncodeError::Message(format!(
                "geo point must serialize to a map, got {}",
                other.field_type()
            )))
        }
    };

    let coordinate = |key: &str| match fields.get(key) {
        Some(Value::DoubleValue(d)) => Ok(*d),
        _ => Err(EncodeError::Message(format!("geo point is missing {}", key))),
    };

    Ok(Value::GeoPointValue(LatLng {
        latitude: coordinate("latitude")?,
        longitude: coordinate("longitude")?,
    }))
}

fn map_key(key: Value) -> Result<String, EncodeError> {
    match key {
        Value::StringValue(s) | Value::IntegerValue(s) => Ok(s),
        Value::BooleanValue(b) => Ok(b.to_string()),
        other => Err(EncodeError::InvalidKey(other.field_type())),
    }
}

pub struct SerializeArray {
    values: Vec<Value>,
}

impl ser::SerializeSeq for SerializeArray {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.values.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodeError> {
        Ok(Value::ArrayValue(ArrayValue {
            values: self.values,
        }))
    }
}

impl ser::SerializeTuple for SerializeArray {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, EncodeError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeArray {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, EncodeError> {
        ser::SerializeSeq::end(self)
    }
}

pub struct SerializeTupleVariant {
    variant: &'static str,
    values: Vec<Value>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.values.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodeError> {
        let mut fields = Fields::with_capacity(1);
        fields.insert(
            self.variant.to_string(),
            Value::ArrayValue(ArrayValue {
                values: self.values,
            }),
        );
        Ok(Value::MapValue(MapValue { fields }))
    }
}

pub struct SerializeMap {
    fields: Fields,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), EncodeError> {
        self.next_key = Some(map_key(key.serialize(ValueSerializer)?)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| EncodeError::Message("map value without a key".to_string()))?;
        self.fields.insert(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodeError> {
        Ok(Value::MapValue(MapValue {
            fields: self.fields,
        }))
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.fields
            .insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodeError> {
        ser::SerializeMap::end(self)
    }
}

pub struct SerializeStructVariant {
    variant: &'static str,
    fields: Fields,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.fields
            .insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodeError> {
        let mut outer = Fields::with_capacity(1);
        outer.insert(
            self.variant.to_string(),
            Value::MapValue(MapValue {
                fields: self.fields,
            }),
        );
        Ok(Value::MapValue(MapValue { fields: outer }))
    }
}
