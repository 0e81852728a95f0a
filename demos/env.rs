// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment variable example.
//!
//! This example demonstrates:
//! - Filtering variables by prefix
//! - Nesting with the `__` separator
//! - The compact, underscore-free alias for every name
//!
//! To run this example:
//! ```bash
//! export MYAPP_DATABASE__HOST="db.example.com"
//! export MYAPP_DATABASE__MAX_CONNS="25"
//! cargo run --example env
//! ```

use mergecfg::prelude::*;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize)]
struct Database {
    #[serde(default)]
    host: String,
    #[serde(rename = "maxConns", default)]
    max_conns: u32,
}

#[derive(Debug, Deserialize)]
struct AppConfig {
    database: Option<Database>,
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    println!("=== mergecfg: Environment Variables ===\n");

    if env::var("MYAPP_DATABASE__HOST").is_err() {
        println!("MYAPP_DATABASE__HOST is not set, using a demo value");
        env::set_var("MYAPP_DATABASE__HOST", "localhost");
        env::set_var("MYAPP_DATABASE__MAX_CONNS", "10");
    }

    let config = Config::builder().with_env_prefix("MYAPP_").build();
    config.load()?;

    println!("--- Loaded Tree ---");
    for (key, value) in config.values() {
        println!("{} = {}", key, value);
    }

    println!("\n--- Both Spellings ---");
    println!("database.max_conns = {:?}", config.get("database.max_conns"));
    println!("database.maxconns  = {:?}", config.get("database.maxconns"));

    println!("\n--- Binding ---");
    let app: AppConfig = config.bind()?;
    println!("{:#?}", app);

    Ok(())
}
