// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for the integration tests.

use mergecfg::prelude::*;

/// Provider that returns a fixed mapping, or fails when asked to.
#[allow(dead_code)]
pub struct MockProvider {
    name: String,
    values: Map,
    error: Option<String>,
}

#[allow(dead_code)]
impl MockProvider {
    /// Creates a provider returning an empty mapping.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Map::new(),
            error: None,
        }
    }

    /// Creates a provider returning `values`.
    pub fn with_map(name: &str, values: Map) -> Self {
        Self {
            values,
            ..Self::new(name)
        }
    }

    /// Creates a provider whose load always fails with `message`.
    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::new(name)
        }
    }
}

impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Map> {
        match &self.error {
            Some(message) => Err(ConfigError::source_error(&self.name, message, None)),
            None => Ok(self.values.clone()),
        }
    }
}

/// Builds a mapping from `(key, value)` pairs.
#[allow(dead_code)]
pub fn map<const N: usize>(entries: [(&str, Value); N]) -> Map {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Creates a configuration over `providers` with an empty environment, so the
/// test process environment never leaks into assertions.
#[allow(dead_code)]
pub fn isolated_config(providers: Vec<Box<dyn Provider>>) -> Config {
    let mut all: Vec<Box<dyn Provider>> =
        vec![Box::new(EnvProvider::with_vars(Vec::<(String, String)>::new()))];
    all.extend(providers);
    Config::new(all)
}

/// Installs a test subscriber once so `tracing` output shows up with
/// `--nocapture`.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
