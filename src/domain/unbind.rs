// SPDX-License-Identifier: MIT OR Apache-2.0

//! Projection of typed records into configuration mappings.
//!
//! The inverse of [`bind`](crate::domain::bind::bind): a serde `Serializer`
//! that produces a [`Value`] tree. Record fields keep their declared names,
//! nested records become nested maps, and `None` fields are left out entirely
//! so they never shadow a value from another layer.
//!
//! Fields renamed with a leading `@` are embedded records (see
//! [`bind`](crate::domain::bind)): their fields are written into the enclosing
//! mapping. Outer fields keep their values on collisions, and among embedded
//! siblings the first one declared wins.

use crate::domain::bind::is_embedded;
use crate::domain::config_value::{Map, Value};
use crate::domain::errors::BindError;
use serde::ser::{self, Impossible, Serialize, Serializer};

/// Converts any serializable value into a [`Value`].
///
/// # Examples
///
/// ```
/// use mergecfg::domain::config_value::Value;
/// use mergecfg::domain::unbind::unbind;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Server {
///     host: String,
///     port: u16,
///     tls: Option<bool>,
/// }
///
/// let value = unbind(&Server { host: "h".into(), port: 80, tls: None }).unwrap();
/// let map = value.as_map().unwrap();
/// assert_eq!(map.get("port"), Some(&Value::Int(80)));
/// assert!(!map.contains_key("tls"));
/// ```
pub fn unbind<T: Serialize + ?Sized>(value: &T) -> Result<Value, BindError> {
    value.serialize(ValueSerializer)
}

/// Converts a record into a mapping. Fails when `value` is not map-shaped.
pub fn unbind_map<T: Serialize + ?Sized>(value: &T) -> Result<Map, BindError> {
    match unbind(value)? {
        Value::Map(map) => Ok(map),
        other => Err(BindError::InvalidTarget { found: other.kind() }),
    }
}

struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = BindError;

    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = VariantSerializer<SeqSerializer>;
    type SerializeMap = MapSerializer;
    type SerializeStruct = MapSerializer;
    type SerializeStructVariant = VariantSerializer<MapSerializer>;

    fn serialize_bool(self, v: bool) -> Result<Value, BindError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, BindError> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, BindError> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, BindError> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, BindError> {
        Ok(Value::from(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, BindError> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, BindError> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, BindError> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, BindError> {
        Ok(Value::from(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, BindError> {
        Ok(Value::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, BindError> {
        Ok(Value::from(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, BindError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, BindError> {
        Ok(Value::from(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, BindError> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Value, BindError> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, BindError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, BindError> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, BindError> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, BindError> {
        Ok(Value::from(variant))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, BindError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, BindError> {
        let mut map = Map::new();
        map.insert(variant.to_string(), value.serialize(ValueSerializer)?);
        Ok(Value::Map(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer, BindError> {
        Ok(SeqSerializer {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer, BindError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqSerializer, BindError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSerializer<SeqSerializer>, BindError> {
        Ok(VariantSerializer {
            variant,
            inner: self.serialize_seq(Some(len))?,
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapSerializer, BindError> {
        Ok(MapSerializer::default())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<MapSerializer, BindError> {
        Ok(MapSerializer::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantSerializer<MapSerializer>, BindError> {
        Ok(VariantSerializer {
            variant,
            inner: MapSerializer::default(),
        })
    }
}

struct SeqSerializer {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = Value;
    type Error = BindError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), BindError> {
        let index = self.items.len();
        let item = value
            .serialize(ValueSerializer)
            .map_err(|e| e.at_index(index))?;
        self.items.push(item);
        Ok(())
    }

    fn end(self) -> Result<Value, BindError> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = Value;
    type Error = BindError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), BindError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, BindError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = Value;
    type Error = BindError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), BindError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, BindError> {
        ser::SerializeSeq::end(self)
    }
}

/// Collects map entries and record fields. Null values are dropped.
#[derive(Default)]
struct MapSerializer {
    map: Map,
    embedded: Map,
    next_key: Option<String>,
}

impl MapSerializer {
    fn insert(&mut self, key: String, value: Value) {
        if !value.is_null() {
            self.map.insert(key, value);
        }
    }

    fn embed(&mut self, field: &'static str, value: Value) -> Result<(), BindError> {
        match value {
            Value::Null => Ok(()),
            Value::Map(fields) => {
                for (key, value) in fields {
                    self.embedded.entry(key).or_insert(value);
                }
                Ok(())
            }
            other => Err(BindError::InvalidTarget { found: other.kind() }.in_field(field)),
        }
    }

    fn finish(mut self) -> Map {
        for (key, value) in self.embedded {
            self.map.entry(key).or_insert(value);
        }
        self.map
    }
}

impl ser::SerializeMap for MapSerializer {
    type Ok = Value;
    type Error = BindError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), BindError> {
        self.next_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), BindError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| BindError::Message("map value serialized before its key".into()))?;
        let value = value
            .serialize(ValueSerializer)
            .map_err(|e| e.at_key(key.as_str()))?;
        self.insert(key, value);
        Ok(())
    }

    fn end(self) -> Result<Value, BindError> {
        Ok(Value::Map(self.map))
    }
}

impl ser::SerializeStruct for MapSerializer {
    type Ok = Value;
    type Error = BindError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), BindError> {
        let value = value
            .serialize(ValueSerializer)
            .map_err(|e| e.in_field(key))?;
        if is_embedded(key) {
            return self.embed(key, value);
        }
        self.insert(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<Value, BindError> {
        Ok(Value::Map(self.finish()))
    }
}

/// Wraps a tuple or struct variant payload as `{variant: payload}`.
struct VariantSerializer<S> {
    variant: &'static str,
    inner: S,
}

impl VariantSerializer<SeqSerializer> {
    fn finish(self) -> Value {
        let mut map = Map::new();
        map.insert(self.variant.to_string(), Value::Array(self.inner.items));
        Value::Map(map)
    }
}

impl ser::SerializeTupleVariant for VariantSerializer<SeqSerializer> {
    type Ok = Value;
    type Error = BindError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), BindError> {
        ser::SerializeSeq::serialize_element(&mut self.inner, value)
    }

    fn end(self) -> Result<Value, BindError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for VariantSerializer<MapSerializer> {
    type Ok = Value;
    type Error = BindError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), BindError> {
        ser::SerializeStruct::serialize_field(&mut self.inner, key, value)
    }

    fn end(self) -> Result<Value, BindError> {
        let mut map = Map::new();
        map.insert(self.variant.to_string(), Value::Map(self.inner.finish()));
        Ok(Value::Map(map))
    }
}

/// Renders map keys as text.
struct KeySerializer;

fn unsupported_key(kind: &'static str) -> BindError {
    BindError::UnsupportedKey(kind)
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = BindError;

    type SerializeSeq = Impossible<String, BindError>;
    type SerializeTuple = Impossible<String, BindError>;
    type SerializeTupleStruct = Impossible<String, BindError>;
    type SerializeTupleVariant = Impossible<String, BindError>;
    type SerializeMap = Impossible<String, BindError>;
    type SerializeStruct = Impossible<String, BindError>;
    type SerializeStructVariant = Impossible<String, BindError>;

    fn serialize_bool(self, v: bool) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, v: f32) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_f64(self, v: f64) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, BindError> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, BindError> {
        Err(unsupported_key("bytes"))
    }

    fn serialize_none(self) -> Result<String, BindError> {
        Err(unsupported_key("none"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<String, BindError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String, BindError> {
        Err(unsupported_key("unit"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, BindError> {
        Err(unsupported_key("unit struct"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String, BindError> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, BindError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, BindError> {
        Err(unsupported_key("newtype variant"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, BindError> {
        Err(unsupported_key("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, BindError> {
        Err(unsupported_key("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, BindError> {
        Err(unsupported_key("tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, BindError> {
        Err(unsupported_key("tuple variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, BindError> {
        Err(unsupported_key("map"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, BindError> {
        Err(unsupported_key("struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, BindError> {
        Err(unsupported_key("struct variant"))
    }
}
