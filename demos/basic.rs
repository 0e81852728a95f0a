// SPDX-License-Identifier: MIT OR Apache-2.0

//! Basic usage example for the configuration crate.
//!
//! This example demonstrates:
//! - Seeding defaults from a record
//! - Loading the environment over the defaults
//! - Reading single values with and without type conversion
//! - Binding the whole tree onto a typed record
//!
//! To run this example:
//! ```bash
//! # Override some of the defaults
//! export SERVER__PORT="9090"
//! export DEBUG="yes"
//!
//! # Run the example
//! cargo run --example basic
//! ```

use mergecfg::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Server {
    host: String,
    port: u16,
}

#[derive(Debug, Serialize, Deserialize)]
struct AppConfig {
    name: String,
    debug: bool,
    server: Server,
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    println!("=== mergecfg: Basic Usage ===\n");

    // No providers given, so only the environment is read
    let config = Config::new(Vec::new());

    println!("--- Example 1: Defaults ---");
    config.set_defaults(&AppConfig {
        name: "demo".to_string(),
        debug: false,
        server: Server {
            host: "127.0.0.1".to_string(),
            port: 8080,
        },
    })?;
    config.set_default("log.level", Value::from("info"));
    println!("Defaults seeded: {:?}", config.values());

    println!("\n--- Example 2: Loading ---");
    config.load()?;
    println!("✓ Environment loaded");

    println!("\n--- Example 3: Single Values ---");
    match config.get("server.port") {
        Some(value) => println!("server.port = {} ({})", value, value.kind()),
        None => println!("✗ server.port not set"),
    }
    let port: Option<u16> = config.get_as("server.port")?;
    println!("server.port as u16 = {:?}", port);
    println!("log.level = {}", config.require("log.level")?);

    println!("\n--- Example 4: Binding ---");
    let app: AppConfig = config.bind()?;
    println!("{:#?}", app);

    println!("\n=== Example Complete ===");
    Ok(())
}
