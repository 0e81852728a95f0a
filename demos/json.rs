// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON file example.
//!
//! This example demonstrates:
//! - Reading a JSON file through the safe file system
//! - Layering environment variables over the file
//! - Validating the bound record
//!
//! To run this example:
//! ```bash
//! # Optionally override the file
//! export JSONDEMO_SERVER__PORT="7070"
//! cargo run --example json --features json
//! ```

use mergecfg::prelude::*;
use serde::Deserialize;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct Server {
    host: String,
    port: u16,
    workers: u8,
}

#[derive(Debug, Deserialize)]
struct AppConfig {
    server: Server,
    features: Vec<String>,
}

impl Validate for AppConfig {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.server.workers == 0 {
            return Err(ValidationError::new("server.workers", "must be at least 1"));
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    println!("=== mergecfg: JSON File ===\n");

    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("config.json"),
        r#"{
  "server": {"host": "0.0.0.0", "port": 8080, "workers": 4},
  "features": ["auth", "metrics"]
}"#,
    )?;
    println!("Wrote config.json to {}", dir.path().display());

    let config = Config::builder()
        .with_provider(
            FileProvider::json("config.json").file_system(SafeFileSystem::with_base_dir(dir.path())),
        )
        .with_env_prefix("JSONDEMO_")
        .build();
    config.load()?;

    let app: AppConfig = config.bind_with(BindOptions::default())?;
    println!("{:#?}", app);

    println!("\n--- Validation Failure ---");
    config.set("server.workers", Value::from(0));
    match config.bind_with::<AppConfig>(BindOptions::default()) {
        Ok(_) => println!("✗ expected a validation error"),
        Err(e) => println!("✓ {}", e),
    }

    Ok(())
}
