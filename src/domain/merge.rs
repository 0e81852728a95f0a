// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deep merging of configuration mappings.
//!
//! Both merges normalize keys (trimmed and lower-cased) as they go and drop
//! keys that normalize to the empty string. Sub-trees copied in from the source
//! are normalized too, so the destination never holds a non-normalized key.

use crate::domain::config_key::normalize_segment;
use crate::domain::config_value::{Map, Value};

/// Merges `src` into `dst`, letting `src` win every conflict.
///
/// Two mappings under the same key are merged recursively; any other pair is
/// replaced by the source value.
///
/// # Examples
///
/// ```
/// use mergecfg::domain::config_value::{Map, Value};
/// use mergecfg::domain::merge::merge;
///
/// let mut dst = Map::new();
/// dst.insert("port".to_string(), Value::from(80));
/// dst.insert("host".to_string(), Value::from("a"));
///
/// let mut src = Map::new();
/// src.insert("Port".to_string(), Value::from(8080));
///
/// merge(&mut dst, src);
/// assert_eq!(dst.get("port"), Some(&Value::from(8080)));
/// assert_eq!(dst.get("host"), Some(&Value::from("a")));
/// ```
pub fn merge(dst: &mut Map, src: Map) {
    for (key, value) in src {
        let key = normalize_segment(&key);
        if key.is_empty() {
            continue;
        }
        match value {
            Value::Map(incoming) => match dst.get_mut(&key) {
                Some(Value::Map(existing)) => merge(existing, incoming),
                _ => {
                    dst.insert(key, normalize_value(Value::Map(incoming)));
                }
            },
            value => {
                dst.insert(key, normalize_value(value));
            }
        }
    }
}

/// Merges `src` into `dst` without replacing anything already present.
///
/// Existing keys keep their destination value, except that two mappings are
/// merged recursively. Missing keys are filled from `src`.
pub fn merge_without_override(dst: &mut Map, src: Map) {
    for (key, value) in src {
        let key = normalize_segment(&key);
        if key.is_empty() {
            continue;
        }
        match dst.get_mut(&key) {
            Some(Value::Map(existing)) => {
                if let Value::Map(incoming) = value {
                    merge_without_override(existing, incoming);
                }
            }
            Some(_) => {}
            None => {
                dst.insert(key, normalize_value(value));
            }
        }
    }
}

/// Normalizes every key of `map` in place, recursively.
///
/// Keys that collide after normalization are merged with the later key (in
/// iteration order) winning.
pub fn lowercase_keys(map: &mut Map) {
    let original = std::mem::take(map);
    merge(map, original);
}

pub(crate) fn normalize_value(value: Value) -> Value {
    match value {
        Value::Map(inner) => {
            let mut out = Map::new();
            merge(&mut out, inner);
            Value::Map(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        other => other,
    }
}
