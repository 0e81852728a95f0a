// SPDX-License-Identifier: MIT OR Apache-2.0

//! Navigation of nested configuration mappings.
//!
//! A dotted key `a.b.c` addresses the entry `c` inside the mapping reached by
//! following `a` then `b` from the root. These helpers locate (and, for
//! writers, create) that enclosing mapping.

use crate::domain::config_value::{Map, Value};

/// Finds the mapping that directly contains the leaf addressed by `containers`.
///
/// Returns the root when `containers` is empty. Returns `None` when a segment is
/// missing or names something other than a mapping.
///
/// # Examples
///
/// ```
/// use mergecfg::domain::config_value::{Map, Value};
/// use mergecfg::domain::nested::find_nested_map;
///
/// let mut db = Map::new();
/// db.insert("host".to_string(), Value::from("localhost"));
/// let mut root = Map::new();
/// root.insert("database".to_string(), Value::Map(db));
///
/// let found = find_nested_map(&root, &["database".to_string()]).unwrap();
/// assert_eq!(found.get("host"), Some(&Value::from("localhost")));
/// ```
pub fn find_nested_map<'a>(root: &'a Map, containers: &[String]) -> Option<&'a Map> {
    let mut current = root;
    for segment in containers {
        current = match current.get(segment) {
            Some(Value::Map(next)) => next,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable counterpart of [`find_nested_map`].
///
/// With `create` set, missing segments are inserted as empty mappings. An
/// existing entry that is not a mapping blocks the path in either mode; it is
/// never replaced.
pub fn find_nested_map_mut<'a>(
    root: &'a mut Map,
    containers: &[String],
    create: bool,
) -> Option<&'a mut Map> {
    let mut current = root;
    for segment in containers {
        if create {
            current
                .entry(segment.clone())
                .or_insert_with(|| Value::Map(Map::new()));
        }
        current = match current.get_mut(segment) {
            Some(Value::Map(next)) => next,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(path: &[&str]) -> Vec<String> {
        path.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Map {
        let mut primary = Map::new();
        primary.insert("host".to_string(), Value::from("db1"));
        let mut database = Map::new();
        database.insert("primary".to_string(), Value::Map(primary));
        database.insert("port".to_string(), Value::from(5432));
        let mut root = Map::new();
        root.insert("database".to_string(), Value::Map(database));
        root
    }

    #[test]
    fn test_empty_containers_returns_root() {
        let root = sample();
        let found = find_nested_map(&root, &[]).unwrap();
        assert!(found.contains_key("database"));
    }

    #[test]
    fn test_descends_through_maps() {
        let root = sample();
        let found = find_nested_map(&root, &segs(&["database", "primary"])).unwrap();
        assert_eq!(found.get("host"), Some(&Value::from("db1")));
    }

    #[test]
    fn test_missing_segment_is_absent_without_create() {
        let mut root = sample();
        assert!(find_nested_map(&root, &segs(&["cache"])).is_none());
        assert!(find_nested_map_mut(&mut root, &segs(&["cache"]), false).is_none());
        assert!(!root.contains_key("cache"));
    }

    #[test]
    fn test_create_inserts_empty_maps() {
        let mut root = Map::new();
        let leaf_parent = find_nested_map_mut(&mut root, &segs(&["a", "b"]), true).unwrap();
        leaf_parent.insert("c".to_string(), Value::from(1));

        let b = find_nested_map(&root, &segs(&["a", "b"])).unwrap();
        assert_eq!(b.get("c"), Some(&Value::from(1)));
    }

    #[test]
    fn test_scalar_blocks_path_even_in_create_mode() {
        let mut root = sample();
        assert!(find_nested_map(&root, &segs(&["database", "port"])).is_none());
        assert!(find_nested_map_mut(&mut root, &segs(&["database", "port", "x"]), true).is_none());
        let database = find_nested_map(&root, &segs(&["database"])).unwrap();
        assert_eq!(database.get("port"), Some(&Value::from(5432)));
    }
}
