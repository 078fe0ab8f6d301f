//! Service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Base name of the optional configuration file (`.toml`, `.json`, `.yaml`)
const CONFIG_FILE: &str = "sleep-service";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    /// Name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port serving predictions, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Path to the artifact manifest
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,
}

fn default_service_name() -> String {
    "sleep-service".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("model/artifact.json")
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            bind_address: default_bind_address(),
            api_port: default_api_port(),
            artifact_path: default_artifact_path(),
        }
    }
}

impl ServiceConfig {
    /// Load from `sleep-service.*` in the working directory and `SLEEP_*` env vars
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from an optional config file (extension may be omitted) and `SLEEP_*` env vars
    pub fn load_from(file: &Path) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(config::Environment::with_prefix("SLEEP").try_parsing(true))
            .build()
            .context("Failed to read service configuration")?;

        config
            .try_deserialize()
            .context("Invalid service configuration")
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.api_port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid bind address {}:{}",
                    self.bind_address, self.api_port
                )
            })
    }
}
