// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property-based tests using proptest.
//!
//! These tests use property-based testing to verify that merging, key paths
//! and binding hold their guarantees for arbitrary inputs.

mod common;

use common::isolated_config;
use mergecfg::domain::merge::{merge, merge_without_override};
use mergecfg::domain::{from_value, KeyPath, Map, Value};
use mergecfg::prelude::ConfigurationService;
use proptest::prelude::*;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9 ]{0,8}".prop_map(Value::from),
    ]
}

fn flat_map() -> impl Strategy<Value = Map> {
    prop::collection::btree_map("[a-z]{1,4}", scalar(), 0..8)
}

fn segment() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_]{0,5}"
}

// Test that override merge is right-biased on shared keys
proptest! {
    #[test]
    fn test_merge_is_right_biased(a in flat_map(), b in flat_map()) {
        let mut merged = a.clone();
        merge(&mut merged, b.clone());

        for (key, value) in &b {
            prop_assert_eq!(merged.get(key), Some(value));
        }
        for (key, value) in &a {
            if !b.contains_key(key) {
                prop_assert_eq!(merged.get(key), Some(value));
            }
        }
    }
}

// Test that no-override merge keeps existing keys and adds new ones
proptest! {
    #[test]
    fn test_merge_without_override_is_left_biased(a in flat_map(), b in flat_map()) {
        let mut merged = a.clone();
        merge_without_override(&mut merged, b.clone());

        for (key, value) in &merged {
            let expected = a.get(key).or_else(|| b.get(key));
            prop_assert_eq!(Some(value), expected);
        }
        prop_assert_eq!(merged.len(), a.keys().chain(b.keys()).collect::<std::collections::BTreeSet<_>>().len());
    }
}

// Test that merging normalizes keys so case variants collapse
proptest! {
    #[test]
    fn test_merge_collapses_case_variants(key in "[a-z]{1,6}", x in scalar(), y in scalar()) {
        let mut dst = Map::new();
        merge(&mut dst, [(key.to_uppercase(), x)].into_iter().collect());
        merge(&mut dst, [(format!("  {}", key), y.clone())].into_iter().collect());

        prop_assert_eq!(dst.len(), 1);
        prop_assert_eq!(dst.get(&key), Some(&y));
    }
}

// Test that every value set at a path is read back through any casing
proptest! {
    #[test]
    fn test_path_round_trip(segments in prop::collection::vec(segment(), 1..4), value in scalar()) {
        let key = segments.join(".");
        let config = isolated_config(vec![]);
        config.set_default(&key, value.clone());

        let expected = if value.is_null() { None } else { Some(value.clone()) };
        prop_assert_eq!(config.get(&key.to_uppercase()), expected.clone());
        prop_assert_eq!(config.get(&key.to_lowercase()), expected);

        let path = KeyPath::parse(&key).unwrap();
        prop_assert_eq!(path.segments().len(), segments.len());
    }
}

// Test that set_default never overwrites and set always does
proptest! {
    #[test]
    fn test_set_default_never_overwrites(key in segment(), first in scalar(), second in scalar()) {
        let config = isolated_config(vec![]);
        config.set_default(&key, first.clone());
        config.set_default(&key, second.clone());
        prop_assert_eq!(config.find(&key), Some(first));

        config.set(&key, second.clone());
        prop_assert_eq!(config.find(&key), Some(second));
    }
}

// Test that keys containing empty segments never reach the tree
proptest! {
    #[test]
    fn test_keys_with_empty_segments_are_ignored(a in segment(), b in segment(), value in scalar()) {
        let config = isolated_config(vec![]);
        for key in [format!("{}..{}", a, b), format!("{}.", a), format!(".{}", b), "   ".to_string()] {
            config.set(&key, value.clone());
            config.set_default(&key, value.clone());
            prop_assert!(config.find(&key).is_none());
        }
        prop_assert!(config.values().is_empty());
    }
}

// Test that i8 binding accepts exactly the representable range
proptest! {
    #[test]
    fn test_i8_binding_checks_range(n in -1000i64..1000) {
        let result = from_value::<i8>(&Value::from(n.to_string()));
        if (i8::MIN as i64..=i8::MAX as i64).contains(&n) {
            prop_assert_eq!(result.unwrap() as i64, n);
        } else {
            prop_assert!(result.is_err());
        }
    }
}

// Test that unsigned binding rejects every negative number
proptest! {
    #[test]
    fn test_unsigned_rejects_negative(n in i64::MIN..0) {
        prop_assert!(from_value::<u32>(&Value::from(n)).is_err());
        prop_assert!(from_value::<u64>(&Value::from(n.to_string())).is_err());
    }
}
