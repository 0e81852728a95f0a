// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded configuration example.
//!
//! This example demonstrates:
//! - Serving configuration files from memory
//! - Writing an extension that runs around the load
//! - Passing attributes to extensions through a load context
//!
//! To run this example:
//! ```bash
//! cargo run --example json_fs --features json
//! ```

use mergecfg::prelude::*;

const BASE: &str = r#"{"service": {"name": "catalog", "replicas": 2}}"#;
const OVERLAY: &str = r#"{"service": {"replicas": 5}, "region": "eu-west-1"}"#;

/// Records which profile the configuration was loaded for.
struct ProfileStamp;

impl Extension for ProfileStamp {
    fn name(&self) -> &str {
        "profile-stamp"
    }

    fn pre_load(&self, ctx: &LoadContext, _config: &dyn ConfigurationService) -> Result<()> {
        tracing::info!("Loading profile {}", ctx.value("profile").unwrap_or("default"));
        Ok(())
    }

    fn post_load(&self, ctx: &LoadContext, config: &dyn ConfigurationService) -> Result<()> {
        let profile = ctx.value("profile").unwrap_or("default");
        config.set("meta.profile", Value::from(profile));
        Ok(())
    }
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    println!("=== mergecfg: Embedded JSON ===\n");

    let fs = MemoryFileSystem::new()
        .with_file("base.json", BASE)
        .with_file("overlay.json", OVERLAY);

    let config = Config::builder()
        .with_provider(FileProvider::json("base.json").file_system(fs.clone()))
        .with_provider(FileProvider::json("overlay.json").file_system(fs))
        .with_extension(ProfileStamp)
        .build();

    config.load_with_context(&LoadContext::new().with_value("profile", "staging"))?;

    println!("service.name     = {:?}", config.get("service.name"));
    println!("service.replicas = {:?}", config.get_as::<u32>("service.replicas")?);
    println!("region           = {:?}", config.get("region"));
    println!("meta.profile     = {:?}", config.get("meta.profile"));

    Ok(())
}
