//! # Perks API Main Entry Point
//!
//! This is the main entry point for the Perks API service.

use std::sync::Arc;

use perks_api::migration::{Migrator, MigratorTrait};
use perks_api::seo::SitemapWriter;
use perks_api::{config::ConfigLoader, db, seeds, server::run_server, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;

    // Log the loaded configuration (secrets are redacted)
    println!("Loaded configuration for profile: {}", config.profile);
    if let Ok(redacted_json) = config.redacted_json() {
        println!("Configuration: {}", redacted_json);
    }

    let db = Arc::new(db::init_pool(&config).await?);
    Migrator::up(db.as_ref(), None).await?;

    seeds::seed_settings(db.as_ref()).await?;

    // First write of sitemap.xml and robots.txt. The public handlers
    // regenerate missing files on demand, so a failed write only warns.
    let sitemap = SitemapWriter::new(config.public_base_url.clone(), config.seo_output_dir.clone());
    if let Err(error) = sitemap.write_all(&db).await {
        tracing::warn!(error = ?error, "initial sitemap generation failed");
    }

    // Start the server with the loaded configuration
    run_server(Arc::new(config), db).await
}
