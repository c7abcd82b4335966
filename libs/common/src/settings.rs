//! Service settings loaded from the environment with the `config` crate

use anyhow::Result;
use serde::Deserialize;

/// Where a service keeps its records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// PostgreSQL through `DATABASE_URL`
    Postgres,
    /// Process-local store, lost on restart
    Memory,
}

/// Listener and storage settings shared by the services
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Interface to bind
    pub server_host: String,
    /// Port to bind
    pub server_port: u16,
    /// Storage backend selection
    pub storage_backend: StorageBackend,
}

impl ServiceConfig {
    /// Load settings from the environment
    ///
    /// # Environment Variables
    /// - `SERVER_HOST`: Interface to bind (default: "0.0.0.0")
    /// - `SERVER_PORT`: Port to bind (default: `default_port`)
    /// - `STORAGE_BACKEND`: `postgres` or `memory` (default: "postgres")
    pub fn from_env(default_port: u16) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", default_port)?
            .set_default("storage_backend", "postgres")?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
