// SPDX-License-Identifier: MIT OR Apache-2.0

//! Projection of a configuration mapping onto typed records.
//!
//! Binding is a serde [`Deserializer`] over a borrowed [`Value`] tree that is
//! lenient about kinds: configuration arrives as strings from environment
//! variables and dotenv files, so `"8080"` binds into a `u16`, `"yes"` into a
//! `bool`, and a number into a `String`. Narrowing is always checked; a value
//! that does not fit its destination is an error, never a silent wrap.
//!
//! Record fields are looked up by their declared (serde) name first and by the
//! lower-cased name second. Keys with no matching field are ignored. Fields with
//! no matching key follow serde's usual rules (`Option` becomes `None`,
//! `#[serde(default)]` applies, anything else is a missing-field error).
//!
//! A record field renamed with a leading `@` is embedded: its own fields are
//! read from the enclosing mapping instead of a nested one, with the same
//! coercion, case-insensitive lookup and error paths as directly declared
//! fields. Outer fields win keys they share with an embedded record, and among
//! embedded siblings the first one declared wins. Embedding nests to any depth.
//!
//! ```
//! use mergecfg::domain::bind::bind;
//! use mergecfg::domain::config_value::{Map, Value};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Common {
//!     port: u16,
//!     debug: bool,
//! }
//!
//! #[derive(Deserialize)]
//! struct Service {
//!     name: String,
//!     #[serde(rename = "@common")]
//!     common: Common,
//! }
//!
//! let mut map = Map::new();
//! map.insert("name".to_string(), Value::from("svc"));
//! map.insert("port".to_string(), Value::from("8080"));
//! map.insert("debug".to_string(), Value::from("true"));
//!
//! let service: Service = bind(&map).unwrap();
//! assert_eq!(service.common.port, 8080);
//! assert!(service.common.debug);
//! ```
//!
//! `#[serde(flatten)]` also shares a level, but serde buffers flattened values
//! before they reach the binder, so they bypass coercion and the
//! case-insensitive lookup. Prefer `@` embedding for configuration records.
//!
//! # Examples
//!
//! ```
//! use mergecfg::domain::bind::bind;
//! use mergecfg::domain::config_value::{Map, Value};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Server {
//!     host: String,
//!     port: u16,
//!     debug: bool,
//! }
//!
//! let mut map = Map::new();
//! map.insert("host".to_string(), Value::from("localhost"));
//! map.insert("port".to_string(), Value::from("8080"));
//! map.insert("debug".to_string(), Value::from("on"));
//!
//! let server: Server = bind(&map).unwrap();
//! assert_eq!(server.port, 8080);
//! assert!(server.debug);
//! ```

use crate::domain::config_value::{Map, Value};
use crate::domain::errors::BindError;
use serde::de::value::BorrowedStrDeserializer;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess,
    SeqAccess, VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use std::cell::RefCell;
use std::collections::{btree_map, HashMap, HashSet};
use std::rc::Rc;

static NULL: Value = Value::Null;

/// Leading character of a field name that marks an embedded record.
pub const EMBED_MARKER: char = '@';

/// Returns true when a declared field name marks an embedded record.
pub(crate) fn is_embedded(field: &str) -> bool {
    field.starts_with(EMBED_MARKER)
}

/// Keys of one mapping already owned by a field, shared by a record and the
/// records embedded in it.
type Claims = Rc<RefCell<HashSet<String>>>;

/// Binds a mapping onto a record or map type.
///
/// Returns [`BindError::InvalidTarget`] when `T` is neither (a bare integer, a
/// sequence, an enum...).
pub fn bind<T: DeserializeOwned>(map: &Map) -> Result<T, BindError> {
    T::deserialize(RootDeserializer::new(map, Claims::default()))
}

/// Converts a single value with the same coercion rules as [`bind`].
///
/// # Examples
///
/// ```
/// use mergecfg::domain::bind::from_value;
/// use mergecfg::domain::config_value::Value;
///
/// let port: u16 = from_value(&Value::from("5432")).unwrap();
/// assert_eq!(port, 5432);
/// assert!(from_value::<i8>(&Value::from("99999")).is_err());
/// ```
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, BindError> {
    T::deserialize(ValueDeserializer::new(value))
}

/// Parses the boolean spellings accepted in configuration text.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Deserializes a whole mapping: the bind root, or the enclosing mapping seen
/// by an embedded record.
struct RootDeserializer<'de> {
    map: &'de Map,
    claims: Claims,
}

impl<'de> RootDeserializer<'de> {
    fn new(map: &'de Map, claims: Claims) -> Self {
        Self { map, claims }
    }
}

macro_rules! reject_root {
    ($($method:ident => $found:expr),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, BindError> {
            Err(BindError::InvalidTarget { found: $found })
        }
    )*};
}

impl<'de> Deserializer<'de> for RootDeserializer<'de> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_map(MapDeserializer::new(self.map))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_map(StructDeserializer::new(self.map, fields, self.claims))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    reject_root! {
        deserialize_bool => "bool",
        deserialize_i8 => "i8",
        deserialize_i16 => "i16",
        deserialize_i32 => "i32",
        deserialize_i64 => "i64",
        deserialize_u8 => "u8",
        deserialize_u16 => "u16",
        deserialize_u32 => "u32",
        deserialize_u64 => "u64",
        deserialize_f32 => "f32",
        deserialize_f64 => "f64",
        deserialize_char => "char",
        deserialize_str => "string",
        deserialize_string => "string",
        deserialize_bytes => "bytes",
        deserialize_byte_buf => "bytes",
        deserialize_unit => "unit",
        deserialize_seq => "sequence",
        deserialize_identifier => "identifier",
        deserialize_ignored_any => "ignored value",
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, BindError> {
        Err(BindError::InvalidTarget {
            found: "unit struct",
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, BindError> {
        Err(BindError::InvalidTarget { found: "tuple" })
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, BindError> {
        Err(BindError::InvalidTarget {
            found: "tuple struct",
        })
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, BindError> {
        Err(BindError::InvalidTarget { found: "enum" })
    }
}

/// Lenient deserializer over one borrowed value.
pub(crate) struct ValueDeserializer<'de> {
    value: &'de Value,
}

impl<'de> ValueDeserializer<'de> {
    pub(crate) fn new(value: &'de Value) -> Self {
        Self { value }
    }

    fn invalid(&self, expected: &'static str) -> BindError {
        BindError::InvalidType {
            expected,
            found: self.value.kind(),
        }
    }
}

/// Width of an integer destination.
#[derive(Clone, Copy)]
struct IntTarget {
    kind: &'static str,
    min: i128,
    max: i128,
}

impl IntTarget {
    const fn new(kind: &'static str, min: i128, max: i128) -> Self {
        Self { kind, min, max }
    }

    fn unsigned(&self) -> bool {
        self.min == 0
    }

    fn check(&self, n: i128) -> Result<i128, BindError> {
        if n < self.min || n > self.max {
            return Err(BindError::IntegerOverflow {
                kind: self.kind,
                value: n.to_string(),
            });
        }
        Ok(n)
    }

    fn negative(&self, source_kind: &'static str, value: impl ToString) -> BindError {
        BindError::NegativeUnsigned {
            source_kind,
            kind: self.kind,
            value: value.to_string(),
        }
    }

    fn parse_str(&self, text: &str) -> Result<i128, BindError> {
        let trimmed = text.trim();
        let n = trimmed
            .parse::<i128>()
            .map_err(|e| BindError::Parse {
                expected: self.kind,
                value: text.to_string(),
                message: e.to_string(),
            })?;
        if self.unsigned() && n < 0 {
            return Err(self.negative("string", trimmed));
        }
        self.check(n)
    }

    fn coerce(&self, value: &Value) -> Result<i128, BindError> {
        match value {
            Value::Null => Ok(0),
            Value::Int(n) => {
                if self.unsigned() && *n < 0 {
                    return Err(self.negative("int", n));
                }
                self.check(i128::from(*n))
            }
            Value::UInt(n) => self.check(i128::from(*n)),
            Value::Float(f) => {
                if self.unsigned() && *f < 0.0 {
                    return Err(self.negative("float", f));
                }
                if !f.is_finite() {
                    return Err(BindError::IntegerOverflow {
                        kind: self.kind,
                        value: f.to_string(),
                    });
                }
                // saturating cast; anything past i128 fails the range check
                self.check(f.trunc() as i128)
            }
            Value::String(s) => self.parse_str(s),
            other => Err(BindError::InvalidType {
                expected: self.kind,
                found: other.kind(),
            }),
        }
    }
}

const I8: IntTarget = IntTarget::new("i8", i8::MIN as i128, i8::MAX as i128);
const I16: IntTarget = IntTarget::new("i16", i16::MIN as i128, i16::MAX as i128);
const I32: IntTarget = IntTarget::new("i32", i32::MIN as i128, i32::MAX as i128);
const I64: IntTarget = IntTarget::new("i64", i64::MIN as i128, i64::MAX as i128);
const U8: IntTarget = IntTarget::new("u8", 0, u8::MAX as i128);
const U16: IntTarget = IntTarget::new("u16", 0, u16::MAX as i128);
const U32: IntTarget = IntTarget::new("u32", 0, u32::MAX as i128);
const U64: IntTarget = IntTarget::new("u64", 0, u64::MAX as i128);

fn coerce_float(value: &Value, expected: &'static str) -> Result<f64, BindError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Int(n) => Ok(*n as f64),
        Value::UInt(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        Value::String(s) => s.trim().parse::<f64>().map_err(|e| BindError::Parse {
            expected,
            value: s.clone(),
            message: e.to_string(),
        }),
        other => Err(BindError::InvalidType {
            expected,
            found: other.kind(),
        }),
    }
}

fn bool_from_str(text: &str) -> Result<bool, BindError> {
    parse_bool(text).ok_or_else(|| BindError::Parse {
        expected: "bool",
        value: text.to_string(),
        message: "not a boolean".to_string(),
    })
}

fn char_from_str(text: &str) -> Result<char, BindError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(BindError::Parse {
            expected: "char",
            value: text.to_string(),
            message: "expected a single character".to_string(),
        }),
    }
}

/// Matches a supplied variant name against the declared ones, exactly first and
/// then ignoring case. Unmatched names pass through so serde can apply aliases
/// or report the unknown variant.
fn resolve_variant<'a>(name: &'a str, variants: &'static [&'static str]) -> &'a str {
    if variants.contains(&name) {
        return name;
    }
    variants
        .iter()
        .find(|v| v.eq_ignore_ascii_case(name))
        .copied()
        .unwrap_or(name)
}

macro_rules! deserialize_int {
    ($($method:ident => $visit:ident, $target:expr, $t:ty);* $(;)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
            let n = $target.coerce(self.value)?;
            // range already checked against the destination width
            visitor.$visit(n as $t)
        }
    )*};
}

impl<'de> Deserializer<'de> for ValueDeserializer<'de> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Int(n) => visitor.visit_i64(*n),
            Value::UInt(n) => visitor.visit_u64(*n),
            Value::Float(f) => visitor.visit_f64(*f),
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Bytes(b) => visitor.visit_borrowed_bytes(b),
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items, 0)),
            Value::Map(map) => visitor.visit_map(MapDeserializer::new(map)),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        let b = match self.value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::UInt(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => bool_from_str(s)?,
            _ => return Err(self.invalid("bool")),
        };
        visitor.visit_bool(b)
    }

    deserialize_int! {
        deserialize_i8 => visit_i8, I8, i8;
        deserialize_i16 => visit_i16, I16, i16;
        deserialize_i32 => visit_i32, I32, i32;
        deserialize_i64 => visit_i64, I64, i64;
        deserialize_u8 => visit_u8, U8, u8;
        deserialize_u16 => visit_u16, U16, u16;
        deserialize_u32 => visit_u32, U32, u32;
        deserialize_u64 => visit_u64, U64, u64;
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_f32(coerce_float(self.value, "f32")? as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_f64(coerce_float(self.value, "f64")?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::Null => visitor.visit_char('\0'),
            Value::String(s) => visitor.visit_char(char_from_str(s)?),
            _ => Err(self.invalid("char")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::Null => visitor.visit_borrowed_str(""),
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Bytes(b) => visitor.visit_string(String::from_utf8_lossy(b).into_owned()),
            other => visitor.visit_string(other.to_string()),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::Null => visitor.visit_borrowed_bytes(&[]),
            Value::Bytes(b) => visitor.visit_borrowed_bytes(b),
            Value::String(s) => visitor.visit_borrowed_bytes(s.as_bytes()),
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items, 0)),
            _ => Err(self.invalid("bytes")),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            _ => Err(self.invalid("unit")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::Null => visitor.visit_seq(SeqDeserializer::new(&[], 0)),
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items, 0)),
            _ => Err(self.invalid("sequence")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        match self.value {
            Value::Null => visitor.visit_seq(SeqDeserializer::new(&[], len)),
            Value::Array(items) if items.len() == len => {
                visitor.visit_seq(SeqDeserializer::new(items, 0))
            }
            Value::Array(items) => Err(BindError::LengthMismatch {
                expected: len,
                actual: items.len(),
            }),
            _ => Err(self.invalid("array")),
        }
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::Null => visitor.visit_map(MapDeserializer::empty()),
            Value::Map(map) => visitor.visit_map(MapDeserializer::new(map)),
            _ => Err(self.invalid("map")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        match self.value {
            Value::Null => visitor.visit_map(StructDeserializer::zeroed(fields)),
            Value::Map(map) => visitor.visit_map(StructDeserializer::new(
                map,
                fields,
                Claims::default(),
            )),
            _ => Err(self.invalid("struct")),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        match self.value {
            Value::String(s) => visitor.visit_enum(EnumDeserializer {
                variant: resolve_variant(s, variants),
                value: None,
            }),
            Value::Map(map) if map.len() == 1 => {
                let Some((key, value)) = map.iter().next() else {
                    return Err(self.invalid("enum"));
                };
                visitor.visit_enum(EnumDeserializer {
                    variant: resolve_variant(key, variants),
                    value: Some(value),
                })
            }
            _ => Err(self.invalid("enum")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }
}

struct SeqDeserializer<'de> {
    items: std::slice::Iter<'de, Value>,
    padding: usize,
    index: usize,
}

impl<'de> SeqDeserializer<'de> {
    /// Yields `items`, then `padding` nulls.
    fn new(items: &'de [Value], padding: usize) -> Self {
        Self {
            items: items.iter(),
            padding,
            index: 0,
        }
    }
}

impl<'de> SeqAccess<'de> for SeqDeserializer<'de> {
    type Error = BindError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, BindError> {
        let value = match self.items.next() {
            Some(value) => value,
            None if self.padding > 0 => {
                self.padding -= 1;
                &NULL
            }
            None => return Ok(None),
        };
        let index = self.index;
        self.index += 1;
        seed.deserialize(ValueDeserializer::new(value))
            .map(Some)
            .map_err(|e| e.at_index(index))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len() + self.padding)
    }
}

struct MapDeserializer<'de> {
    iter: Option<btree_map::Iter<'de, String, Value>>,
    pending: Option<(&'de str, &'de Value)>,
}

impl<'de> MapDeserializer<'de> {
    fn new(map: &'de Map) -> Self {
        Self {
            iter: Some(map.iter()),
            pending: None,
        }
    }

    fn empty() -> Self {
        Self {
            iter: None,
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for MapDeserializer<'de> {
    type Error = BindError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, BindError> {
        let Some((key, value)) = self.iter.as_mut().and_then(Iterator::next) else {
            return Ok(None);
        };
        self.pending = Some((key.as_str(), value));
        seed.deserialize(KeyDeserializer { key: key.as_str() })
            .map(Some)
            .map_err(|e| e.at_key(key.as_str()))
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, BindError> {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| BindError::Message("map value requested before its key".into()))?;
        seed.deserialize(ValueDeserializer::new(value))
            .map_err(|e| e.at_key(key))
    }

    fn size_hint(&self) -> Option<usize> {
        self.iter.as_ref().map(ExactSizeIterator::len)
    }
}

/// Where a record field takes its value from.
enum FieldSource<'de> {
    Value(&'de Value),
    /// An embedded record reading the enclosing mapping.
    Embedded(&'de Map, Claims),
}

/// Feeds a record's fields from a mapping.
///
/// Each key is owned by at most one field: declared names claim their exact key
/// first, then lower-cased names claim what is left, earlier fields first. Keys
/// already claimed by an enclosing or earlier embedded record are skipped.
/// Only fields with a value are yielded, in declaration order; embedded fields
/// are always yielded.
struct StructDeserializer<'de> {
    entries: std::vec::IntoIter<(&'static str, FieldSource<'de>)>,
    pending: Option<(&'static str, FieldSource<'de>)>,
}

impl<'de> StructDeserializer<'de> {
    fn new(map: &'de Map, fields: &'static [&'static str], claims: Claims) -> Self {
        let declared = || fields.iter().copied().filter(|f| !is_embedded(f));

        let mut owners: HashMap<String, &'static str> = HashMap::with_capacity(fields.len() * 2);
        for field in declared() {
            owners.entry(field.to_string()).or_insert(field);
        }
        for field in declared() {
            owners.entry(field.to_lowercase()).or_insert(field);
        }

        let mut entries = Vec::with_capacity(fields.len());
        {
            let mut claimed = claims.borrow_mut();
            for &field in fields {
                if is_embedded(field) {
                    entries.push((field, FieldSource::Embedded(map, Rc::clone(&claims))));
                    continue;
                }
                let lowered = field.to_lowercase();
                let found = [field, lowered.as_str()]
                    .into_iter()
                    .filter_map(|key| map.get_key_value(key))
                    .find(|(key, _)| {
                        !claimed.contains(key.as_str())
                            && owners.get(key.as_str()).is_some_and(|f| *f == field)
                    });
                if let Some((key, value)) = found {
                    claimed.insert(key.clone());
                    entries.push((field, FieldSource::Value(value)));
                }
            }
        }

        Self {
            entries: entries.into_iter(),
            pending: None,
        }
    }

    /// Yields every field as null, so a null record binds as its zero value.
    fn zeroed(fields: &'static [&'static str]) -> Self {
        let entries: Vec<_> = fields
            .iter()
            .map(|&field| (field, FieldSource::Value(&NULL)))
            .collect();
        Self {
            entries: entries.into_iter(),
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for StructDeserializer<'de> {
    type Error = BindError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, BindError> {
        let Some((field, source)) = self.entries.next() else {
            return Ok(None);
        };
        self.pending = Some((field, source));
        seed.deserialize(BorrowedStrDeserializer::new(field))
            .map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, BindError> {
        let (field, source) = self
            .pending
            .take()
            .ok_or_else(|| BindError::Message("field value requested before its name".into()))?;
        match source {
            FieldSource::Value(value) => seed
                .deserialize(ValueDeserializer::new(value))
                .map_err(|e| e.in_field(field)),
            // embedded fields report errors under their own names
            FieldSource::Embedded(map, claims) => seed
                .deserialize(RootDeserializer::new(map, claims))
                .map_err(|e| {
                    if matches!(e, BindError::InvalidTarget { .. }) {
                        e.in_field(field)
                    } else {
                        e
                    }
                }),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Deserializes a map key, parsing it into the declared key type.
struct KeyDeserializer<'de> {
    key: &'de str,
}

macro_rules! deserialize_int_key {
    ($($method:ident => $visit:ident, $target:expr, $t:ty);* $(;)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
            let n = $target.parse_str(self.key)?;
            visitor.$visit(n as $t)
        }
    )*};
}

impl<'de> Deserializer<'de> for KeyDeserializer<'de> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_borrowed_str(self.key)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_bool(bool_from_str(self.key)?)
    }

    deserialize_int_key! {
        deserialize_i8 => visit_i8, I8, i8;
        deserialize_i16 => visit_i16, I16, i16;
        deserialize_i32 => visit_i32, I32, i32;
        deserialize_i64 => visit_i64, I64, i64;
        deserialize_u8 => visit_u8, U8, u8;
        deserialize_u16 => visit_u16, U16, u16;
        deserialize_u32 => visit_u32, U32, u32;
        deserialize_u64 => visit_u64, U64, u64;
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_f32(coerce_float(&Value::from(self.key), "f32")? as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_f64(coerce_float(&Value::from(self.key), "f64")?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_char(char_from_str(self.key)?)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_enum(EnumDeserializer {
            variant: resolve_variant(self.key, variants),
            value: None,
        })
    }

    forward_to_deserialize_any! {
        str string bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

struct EnumDeserializer<'a, 'de> {
    variant: &'a str,
    value: Option<&'de Value>,
}

impl<'a, 'de> EnumAccess<'de> for EnumDeserializer<'a, 'de> {
    type Error = BindError;
    type Variant = VariantDeserializer<'de>;

    fn variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<(S::Value, Self::Variant), BindError> {
        let name: de::value::StrDeserializer<'_, BindError> = self.variant.into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer<'de> {
    value: Option<&'de Value>,
}

impl<'de> VariantDeserializer<'de> {
    fn payload(self, expected: &'static str) -> Result<&'de Value, BindError> {
        self.value.ok_or(BindError::InvalidType {
            expected,
            found: "unit variant",
        })
    }
}

impl<'de> VariantAccess<'de> for VariantDeserializer<'de> {
    type Error = BindError;

    fn unit_variant(self) -> Result<(), BindError> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, BindError> {
        seed.deserialize(ValueDeserializer::new(self.payload("newtype variant")?))
    }

    fn tuple_variant<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, BindError> {
        Deserializer::deserialize_tuple(
            ValueDeserializer::new(self.payload("tuple variant")?),
            len,
            visitor,
        )
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        Deserializer::deserialize_struct(
            ValueDeserializer::new(self.payload("struct variant")?),
            "",
            fields,
            visitor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::{BTreeMap, HashMap};

    fn map(entries: Vec<(&str, Value)>) -> Map {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Database {
        host: String,
        port: u16,
        #[serde(default)]
        replicas: Vec<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct App {
        name: String,
        debug: bool,
        database: Database,
        timeout: Option<f64>,
    }

    #[test]
    fn test_bind_nested_record() {
        let src = map(vec![
            ("name", Value::from("demo")),
            ("debug", Value::from("yes")),
            (
                "database",
                Value::Map(map(vec![
                    ("host", Value::from("db")),
                    ("port", Value::from("5432")),
                    ("replicas", Value::from(vec!["r1", "r2"])),
                ])),
            ),
            ("unknown", Value::from(1)),
        ]);
        let app: App = bind(&src).unwrap();
        assert_eq!(app.name, "demo");
        assert!(app.debug);
        assert_eq!(app.database.port, 5432);
        assert_eq!(app.database.replicas, vec!["r1", "r2"]);
        assert_eq!(app.timeout, None);
    }

    #[test]
    fn test_bind_rejects_non_record_target() {
        let err = bind::<u32>(&Map::new()).unwrap_err();
        assert!(matches!(err, BindError::InvalidTarget { found: "u32" }));
        let err = bind::<Vec<String>>(&Map::new()).unwrap_err();
        assert!(matches!(err, BindError::InvalidTarget { .. }));
    }

    #[test]
    fn test_bind_into_maps_and_values() {
        let src = map(vec![("a", Value::from(1)), ("b", Value::from("2"))]);
        let as_map: HashMap<String, u8> = bind(&src).unwrap();
        assert_eq!(as_map.get("b"), Some(&2));
        let as_value: Value = bind(&src).unwrap();
        assert_eq!(as_value, Value::Map(src.clone()));
        let as_tree: Map = bind(&src).unwrap();
        assert_eq!(as_tree, src);
    }

    #[test]
    fn test_integer_overflow_is_reported_with_field() {
        #[derive(Debug, Deserialize)]
        struct Small {
            level: i8,
        }
        let err = bind::<Small>(&map(vec![("level", Value::from("99999"))])).unwrap_err();
        assert_eq!(err.to_string(), "field level: integer overflows i8: 99999");

        let ok: Small = bind(&map(vec![("level", Value::from("100"))])).unwrap();
        assert_eq!(ok.level, 100);
    }

    #[test]
    fn test_negative_into_unsigned_names_source_kind() {
        for (value, kind) in [
            (Value::from(-1), "int"),
            (Value::from(-1.5), "float"),
            (Value::from("-7"), "string"),
        ] {
            let err = from_value::<u32>(&value).unwrap_err();
            match err {
                BindError::NegativeUnsigned {
                    source_kind,
                    kind: target,
                    ..
                } => {
                    assert_eq!(source_kind, kind);
                    assert_eq!(target, "u32");
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn test_floats_truncate_into_integers() {
        assert_eq!(from_value::<i32>(&Value::from(3.9)).unwrap(), 3);
        assert_eq!(from_value::<i32>(&Value::from(-3.9)).unwrap(), -3);
        assert!(from_value::<i8>(&Value::from(300.0)).is_err());
        assert!(from_value::<i64>(&Value::from(f64::NAN)).is_err());
    }

    #[test]
    fn test_large_unsigned_values() {
        assert_eq!(from_value::<u64>(&Value::from(u64::MAX)).unwrap(), u64::MAX);
        let err = from_value::<i64>(&Value::from(u64::MAX)).unwrap_err();
        assert!(matches!(err, BindError::IntegerOverflow { kind: "i64", .. }));
    }

    #[test]
    fn test_bool_coercions() {
        for text in ["true", "T", "yes", "ON", "1"] {
            assert!(from_value::<bool>(&Value::from(text)).unwrap(), "{text}");
        }
        for text in ["false", "f", "No", "off", "0"] {
            assert!(!from_value::<bool>(&Value::from(text)).unwrap(), "{text}");
        }
        assert!(from_value::<bool>(&Value::from(2)).unwrap());
        assert!(!from_value::<bool>(&Value::from(0.0)).unwrap());
        assert!(from_value::<bool>(&Value::from("maybe")).is_err());
    }

    #[test]
    fn test_strings_from_other_kinds() {
        assert_eq!(from_value::<String>(&Value::from(42)).unwrap(), "42");
        assert_eq!(from_value::<String>(&Value::from(true)).unwrap(), "true");
        assert_eq!(
            from_value::<String>(&Value::bytes(b"raw".to_vec())).unwrap(),
            "raw"
        );
        assert_eq!(from_value::<String>(&Value::Null).unwrap(), "");
    }

    #[test]
    fn test_null_becomes_zero_values() {
        assert_eq!(from_value::<u16>(&Value::Null).unwrap(), 0);
        assert!(!from_value::<bool>(&Value::Null).unwrap());
        assert_eq!(from_value::<Option<u8>>(&Value::Null).unwrap(), None);
        assert!(from_value::<Vec<u8>>(&Value::Null).unwrap().is_empty());
        assert!(from_value::<BTreeMap<String, u8>>(&Value::Null)
            .unwrap()
            .is_empty());
        assert_eq!(from_value::<[u8; 3]>(&Value::Null).unwrap(), [0, 0, 0]);
    }

    #[test]
    fn test_fixed_length_mismatch() {
        let err = from_value::<[u8; 3]>(&Value::from(vec![1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "array length mismatch: dest 3 src 2");
        let ok: (String, u8) = from_value(&Value::from(vec![Value::from("a"), Value::from("7")])).unwrap();
        assert_eq!(ok, ("a".to_string(), 7));
    }

    #[test]
    fn test_sequence_element_errors_carry_index() {
        let err = from_value::<Vec<u8>>(&Value::from(vec!["1", "x"])).unwrap_err();
        assert!(err.to_string().starts_with("index 1: "));
    }

    #[test]
    fn test_map_keys_are_parsed() {
        let src = map(vec![("1", Value::from("a")), ("20", Value::from("b"))]);
        let parsed: BTreeMap<u8, String> = bind(&src).unwrap();
        assert_eq!(parsed.get(&20), Some(&"b".to_string()));

        let bad = map(vec![("300", Value::from("a"))]);
        let err = bind::<BTreeMap<u8, String>>(&bad).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            BindError::IntegerOverflow { kind: "u8", .. }
        ));
    }

    #[test]
    fn test_case_insensitive_field_fallback() {
        #[derive(Debug, Deserialize)]
        struct Renamed {
            #[serde(rename = "maxConns")]
            max_conns: u32,
        }
        let bound: Renamed = bind(&map(vec![("maxconns", Value::from(9))])).unwrap();
        assert_eq!(bound.max_conns, 9);

        let exact: Renamed = bind(&map(vec![
            ("maxConns", Value::from(1)),
            ("maxconns", Value::from(2)),
        ]))
        .unwrap();
        assert_eq!(exact.max_conns, 1);
    }

    #[test]
    fn test_exact_name_claims_key_first() {
        #[derive(Debug, Deserialize)]
        struct Both {
            #[serde(rename = "Name")]
            upper: Option<String>,
            name: Option<String>,
        }
        let bound: Both = bind(&map(vec![("name", Value::from("x"))])).unwrap();
        assert_eq!(bound.name.as_deref(), Some("x"));
        assert_eq!(bound.upper, None);
    }

    #[test]
    fn test_enums_match_case_insensitively() {
        #[derive(Debug, Deserialize, PartialEq)]
        enum Level {
            Debug,
            Info,
            Custom(u8),
        }
        assert_eq!(from_value::<Level>(&Value::from("info")).unwrap(), Level::Info);
        assert_eq!(from_value::<Level>(&Value::from("Debug")).unwrap(), Level::Debug);
        let custom = Value::Map(map(vec![("custom", Value::from("3"))]));
        assert_eq!(from_value::<Level>(&custom).unwrap(), Level::Custom(3));

        let err = from_value::<Level>(&Value::from("verbose")).unwrap_err();
        assert!(matches!(err, BindError::UnknownVariant { .. }));
    }

    #[test]
    fn test_flattened_record_fields_at_outer_level() {
        #[derive(Debug, Deserialize, Default)]
        struct Common {
            #[serde(default)]
            region: String,
            #[serde(default)]
            name: String,
        }
        #[derive(Debug, Deserialize)]
        struct Service {
            name: String,
            #[serde(flatten)]
            common: Common,
        }
        let bound: Service = bind(&map(vec![
            ("name", Value::from("outer")),
            ("region", Value::from("eu")),
        ]))
        .unwrap();
        assert_eq!(bound.name, "outer");
        assert_eq!(bound.common.region, "eu");
        assert_eq!(bound.common.name, "");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Common {
        port: u16,
        debug: bool,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Service {
        name: String,
        #[serde(rename = "@common")]
        common: Common,
    }

    #[test]
    fn test_embedded_record_fields_are_coerced() {
        let bound: Service = bind(&map(vec![
            ("name", Value::from("svc")),
            ("port", Value::from("8080")),
            ("debug", Value::from("true")),
        ]))
        .unwrap();
        assert_eq!(bound.name, "svc");
        assert_eq!(bound.common, Common { port: 8080, debug: true });
    }

    #[test]
    fn test_embedded_record_errors_name_the_field() {
        let err = bind::<Service>(&map(vec![
            ("name", Value::from("svc")),
            ("port", Value::from("99999")),
            ("debug", Value::from("true")),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "field port: integer overflows u16: 99999");
    }

    #[test]
    fn test_embedded_record_with_null_field() {
        let bound: Service = bind(&map(vec![
            ("name", Value::from("svc")),
            ("port", Value::Null),
            ("debug", Value::from("on")),
        ]))
        .unwrap();
        assert_eq!(bound.common.port, 0);
        assert!(bound.common.debug);
    }

    #[test]
    fn test_outer_fields_win_over_embedded() {
        #[derive(Debug, Deserialize)]
        struct Meta {
            #[serde(default)]
            name: String,
            region: String,
        }
        #[derive(Debug, Deserialize)]
        struct Outer {
            #[serde(rename = "@meta")]
            meta: Meta,
            name: String,
            #[serde(rename = "maxConns")]
            max_conns: u32,
        }
        let bound: Outer = bind(&map(vec![
            ("name", Value::from("outer")),
            ("region", Value::from("eu")),
            ("maxconns", Value::from("5")),
        ]))
        .unwrap();
        assert_eq!(bound.name, "outer");
        assert_eq!(bound.meta.name, "");
        assert_eq!(bound.meta.region, "eu");
        assert_eq!(bound.max_conns, 5);
    }

    #[test]
    fn test_first_embedded_sibling_wins() {
        #[derive(Debug, Deserialize)]
        struct Left {
            id: Option<String>,
        }
        #[derive(Debug, Deserialize)]
        struct Right {
            id: Option<String>,
        }
        #[derive(Debug, Deserialize)]
        struct Both {
            #[serde(rename = "@left")]
            left: Left,
            #[serde(rename = "@right")]
            right: Right,
        }
        let bound: Both = bind(&map(vec![("id", Value::from("x"))])).unwrap();
        assert_eq!(bound.left.id.as_deref(), Some("x"));
        assert_eq!(bound.right.id, None);
    }

    #[test]
    fn test_embedded_target_must_be_a_record() {
        #[derive(Debug, Deserialize)]
        struct Bad {
            #[serde(rename = "@port")]
            _port: u16,
        }
        let err = bind::<Bad>(&Map::new()).unwrap_err();
        assert!(matches!(err, BindError::Field { ref field, .. } if field == "@port"));
        assert!(matches!(err.root_cause(), BindError::InvalidTarget { .. }));
    }

    #[test]
    fn test_null_record_binds_zero_values() {
        #[derive(Debug, Deserialize)]
        struct Db {
            host: String,
            port: u16,
            replicas: Vec<String>,
            #[serde(rename = "@common")]
            common: Common,
        }
        #[derive(Debug, Deserialize)]
        struct WithDb {
            db: Db,
        }
        let bound: WithDb = bind(&map(vec![("db", Value::Null)])).unwrap();
        assert_eq!(bound.db.host, "");
        assert_eq!(bound.db.port, 0);
        assert!(bound.db.replicas.is_empty());
        assert_eq!(bound.db.common, Common { port: 0, debug: false });
    }

    #[test]
    fn test_missing_required_field() {
        let err = bind::<Database>(&map(vec![("host", Value::from("h"))])).unwrap_err();
        assert!(err.to_string().contains("port"));
    }
}
