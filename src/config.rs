use anyhow::Result;
use config::{Config, Environment, File};
use moka::future::Cache;
use sea_orm::Database;
use serde::Deserialize;
use std::time::Duration;
use crate::schemas::AppState;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://billjobs.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Application configuration.
///
/// Layered from built-in defaults, an optional `billjobs.toml` (or any format
/// the `config` crate understands) in the working directory, then
/// `BILLJOBS_*` environment variables. A `.env` file is loaded first.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    /// Requests running longer than this are aborted
    pub request_timeout_secs: u64,
    /// Maximum number of catalog services kept in memory
    pub service_cache_capacity: u64,
    pub service_cache_ttl_secs: u64,
}

impl AppConfig {
    /// Load configuration from defaults, file and environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("request_timeout_secs", 30_i64)?
            .set_default("service_cache_capacity", 1000_i64)?
            .set_default("service_cache_ttl_secs", 300_i64)?
            .add_source(File::with_name("billjobs").required(false))
            .add_source(Environment::with_prefix("BILLJOBS"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Replace the database URL and bind address with command line values, when given
    pub fn with_overrides(mut self, database_url: Option<String>, bind_address: Option<String>) -> Self {
        if let Some(database_url) = database_url {
            self.database_url = database_url;
        }
        if let Some(bind_address) = bind_address {
            self.bind_address = bind_address;
        }
        self
    }
}

/// Initialize application state from configuration
pub async fn initialize_app_state(config: &AppConfig) -> Result<AppState> {
    // Connect to database
    tracing::info!("Connecting to database: {}", config.database_url);
    let db = Database::connect(&config.database_url).await?;

    // Initialize cache
    let service_cache = Cache::builder()
        .max_capacity(config.service_cache_capacity)
        .time_to_live(Duration::from_secs(config.service_cache_ttl_secs))
        .build();

    Ok(AppState {
        db,
        service_cache,
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    })
}
