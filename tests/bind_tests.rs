// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for binding the merged tree onto typed records.

mod common;

use common::{isolated_config, map, MockProvider};
use mergecfg::domain::{bind, unbind, BindError};
use mergecfg::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Mode {
    Primary,
    Replica,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
struct Limits {
    max_conns: u32,
    idle: i16,
    ratio: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
struct Node {
    name: String,
    mode: Mode,
    enabled: bool,
    limits: Limits,
    tags: Vec<String>,
    weights: BTreeMap<String, u8>,
    pair: (u8, String),
}

fn sample() -> Node {
    let mut weights = BTreeMap::new();
    weights.insert("a".to_string(), 1);
    weights.insert("b".to_string(), 2);
    Node {
        name: "node-1".to_string(),
        mode: Mode::Replica,
        enabled: true,
        limits: Limits {
            max_conns: 64,
            idle: -3,
            ratio: 0.5,
        },
        tags: vec!["x".to_string(), "y".to_string()],
        weights,
        pair: (7, "seven".to_string()),
    }
}

#[test]
fn test_unbind_bind_round_trip() {
    let node = sample();
    let tree = match unbind(&node).unwrap() {
        Value::Map(map) => map,
        other => panic!("expected a mapping, got {}", other.kind()),
    };

    let back: Node = bind(&tree).unwrap();
    assert_eq!(back, node);
}

#[test]
fn test_round_trip_through_config() {
    let config = isolated_config(vec![]);
    config.set_defaults(&sample()).unwrap();

    assert_eq!(config.get("limits.max_conns"), Some(Value::from(64)));
    assert_eq!(config.get("mode"), Some(Value::from("replica")));

    let back: Node = config.bind().unwrap();
    assert_eq!(back, sample());
}

#[test]
fn test_overflow_boundary_for_i8() {
    #[derive(Debug, Deserialize)]
    struct Level {
        level: i8,
    }

    let config = isolated_config(vec![]);
    config.set("level", Value::from("99999"));
    let err = config.bind::<Level>().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Bind(BindError::Field { ref field, .. }) if field == "level"
    ));
    assert_eq!(err.to_string(), "field level: integer overflows i8: 99999");

    config.set("level", Value::from("100"));
    assert_eq!(config.bind::<Level>().unwrap().level, 100);
}

#[test]
fn test_negative_into_unsigned_for_every_source_kind() {
    #[derive(Debug, Deserialize)]
    struct Counts {
        count: u64,
    }

    for value in [Value::from(-1), Value::from(-1.0), Value::from("-1")] {
        let config = isolated_config(vec![]);
        config.set("count", value.clone());
        let err = config.bind::<Counts>().unwrap_err();
        match err {
            ConfigError::Bind(e) => assert!(
                matches!(e.root_cause(), BindError::NegativeUnsigned { .. }),
                "{value:?}: {e}"
            ),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn test_flattened_record_with_outer_precedence() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Meta {
        region: String,
        owner: Option<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Service {
        owner: String,
        #[serde(flatten)]
        meta: Meta,
    }

    let config = isolated_config(vec![Box::new(MockProvider::with_map(
        "svc",
        map([
            ("owner", Value::from("team-a")),
            ("region", Value::from("eu-west")),
        ]),
    ))]);
    config.load().unwrap();

    let service: Service = config.bind().unwrap();
    assert_eq!(service.owner, "team-a");
    assert_eq!(service.meta.region, "eu-west");
    assert_eq!(service.meta.owner, None);
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
struct Common {
    port: u16,
    debug: bool,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
struct EmbeddedService {
    name: String,
    #[serde(rename = "@common")]
    common: Common,
}

#[test]
fn test_embedded_record_from_environment() {
    let config = isolated_config(vec![Box::new(
        EnvProvider::with_vars([
            ("APP_NAME", "svc"),
            ("APP_PORT", "8080"),
            ("APP_DEBUG", "true"),
        ])
        .prefix("APP_"),
    )]);
    config.load().unwrap();

    let service: EmbeddedService = config.bind().unwrap();
    assert_eq!(
        service,
        EmbeddedService {
            name: "svc".to_string(),
            common: Common {
                port: 8080,
                debug: true,
            },
        }
    );
}

#[test]
fn test_embedded_record_round_trip() {
    let service = EmbeddedService {
        name: "svc".to_string(),
        common: Common {
            port: 9000,
            debug: false,
        },
    };
    let config = isolated_config(vec![]);
    config.set_defaults(&service).unwrap();

    assert_eq!(config.get("port"), Some(Value::from(9000)));
    assert!(config.get("@common").is_none());
    assert_eq!(config.bind::<EmbeddedService>().unwrap(), service);
}

#[test]
fn test_nested_embedded_records() {
    #[derive(Debug, Deserialize)]
    struct Level1 {
        field1: String,
        retries: u8,
    }

    #[derive(Debug, Deserialize)]
    struct Level2 {
        #[serde(rename = "@level1")]
        level1: Level1,
        field2: String,
    }

    #[derive(Debug, Deserialize)]
    struct Parent {
        #[serde(rename = "@level2")]
        level2: Level2,
        parent_field: String,
    }

    let config = isolated_config(vec![Box::new(MockProvider::with_map(
        "levels",
        map([
            ("field1", Value::from("level1_value")),
            ("retries", Value::from("3")),
            ("field2", Value::from("level2_value")),
            ("parent_field", Value::from("parent_value")),
        ]),
    ))]);
    config.load().unwrap();

    let parent: Parent = config.bind().unwrap();
    assert_eq!(parent.level2.level1.field1, "level1_value");
    assert_eq!(parent.level2.level1.retries, 3);
    assert_eq!(parent.level2.field2, "level2_value");
    assert_eq!(parent.parent_field, "parent_value");
}

#[test]
fn test_renamed_outer_field_beside_embedded_record() {
    #[derive(Debug, Deserialize)]
    struct Pool {
        #[serde(rename = "maxConns")]
        max_conns: u32,
        #[serde(rename = "@common")]
        common: Common,
    }

    let config = isolated_config(vec![]);
    config.set("maxConns", Value::from(5));
    config.set("port", Value::from("1"));
    config.set("debug", Value::from("off"));

    let pool: Pool = config.bind().unwrap();
    assert_eq!(pool.max_conns, 5);
    assert_eq!(pool.common.port, 1);
    assert!(!pool.common.debug);
}

#[test]
fn test_null_nested_record_binds_zero_values() {
    #[derive(Debug, Deserialize)]
    struct Db {
        host: String,
        port: u16,
    }

    #[derive(Debug, Deserialize)]
    struct App {
        db: Db,
    }

    let config = isolated_config(vec![]);
    config.set("db", Value::Null);

    let app: App = config.bind().unwrap();
    assert_eq!(app.db.host, "");
    assert_eq!(app.db.port, 0);
}

#[test]
fn test_field_names_match_case_insensitively() {
    #[derive(Debug, Deserialize)]
    struct Pool {
        #[serde(rename = "MaxConns")]
        max_conns: u32,
    }

    let config = isolated_config(vec![Box::new(
        EnvProvider::with_vars([("POOL_MAX_CONNS", "12")]).prefix("POOL_"),
    )]);
    config.load().unwrap();

    // Only the compact alias "maxconns" can match "MaxConns".
    let pool: Pool = config.bind().unwrap();
    assert_eq!(pool.max_conns, 12);
}

#[test]
fn test_enum_variant_from_environment() {
    #[derive(Debug, Deserialize)]
    struct Replica {
        mode: Mode,
    }

    let config = isolated_config(vec![Box::new(EnvProvider::with_vars([(
        "MODE", "PRIMARY",
    )]))]);
    config.load().unwrap();

    assert_eq!(config.bind::<Replica>().unwrap().mode, Mode::Primary);
}

#[test]
fn test_bind_into_hash_map() {
    let config = isolated_config(vec![Box::new(MockProvider::with_map(
        "ports",
        map([("http", Value::from("80")), ("https", Value::from(443))]),
    ))]);
    config.load().unwrap();

    let ports: BTreeMap<String, u16> = config.bind().unwrap();
    assert_eq!(ports.get("http"), Some(&80));
    assert_eq!(ports.get("https"), Some(&443));
}
