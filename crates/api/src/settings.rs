//! Service configuration
//!
//! Built-in defaults, overridden by an optional `sensor-api.{toml,yaml,json}`
//! file in the working directory, overridden by environment variables
//! (`MONGO_URI`, `PORT`, ...).

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use sensor_generator::GeneratorConfig;
use serde::Deserialize;
use std::time::Duration;
use storage::{RetentionPolicy, DEFAULT_RETENTION_SECS};

/// Connection string used when `MONGO_URI` is not set
pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";

/// Which backend holds the readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongo,
    Memory,
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub mongo_uri: String,
    pub database_name: String,
    pub collection_name: String,
    pub storage_backend: StorageBackend,
    pub bind_address: String,
    pub port: u16,
    /// Seconds between generator cycles
    pub generate_interval_secs: u64,
    /// Age in seconds after which readings expire
    pub retention_secs: u64,
    /// Readings returned by `/api/latest`
    pub latest_limit: usize,
}

impl AppConfig {
    /// Load defaults, then the optional config file, then the environment
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Self::defaults()?
            .add_source(File::with_name("sensor-api").required(false))
            .add_source(Environment::default().try_parsing(true));

        Self::from_builder(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("mongo_uri", DEFAULT_MONGO_URI)?
            .set_default("database_name", "sensor_db")?
            .set_default("collection_name", "sensor_data")?
            .set_default("storage_backend", "mongo")?
            .set_default("bind_address", "0.0.0.0")?
            .set_default("port", 5000_i64)?
            .set_default("generate_interval_secs", 2_i64)?
            .set_default("retention_secs", DEFAULT_RETENTION_SECS as i64)?
            .set_default("latest_limit", 20_i64)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    /// `address:port` to bind the HTTP listener on
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(Duration::from_secs(self.retention_secs))
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            interval: Duration::from_secs(self.generate_interval_secs),
        }
    }
}
