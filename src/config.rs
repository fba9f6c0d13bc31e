//! # Configuration Management
//!
//! This module handles loading and managing application configuration from
//! multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! The `HOST` and `PORT` variables used by deployment platforms are honored
//! as overrides even though they don't carry the APP_ prefix.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, storage, stream)
/// keeps each section small and maps one-to-one onto config.toml tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub stream: StreamConfig,
}

/// Server-specific configuration settings.
///
/// ## Fields:
/// - `host`: IP address or hostname to bind to ("127.0.0.1" for development,
///   "0.0.0.0" to accept connections from any interface)
/// - `port`: TCP port to listen on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where terminated streams are persisted.
///
/// ## Fields:
/// - `data_dir`: directory for capture artifacts, created on demand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

/// Per-connection streaming behavior.
///
/// ## Fields:
/// - `max_concurrent_sessions`: upgrade requests beyond this limit are
///   rejected with 503 before a session is created
/// - `heartbeat_interval_secs`: how often the server pings idle connections
/// - `client_timeout_secs`: a connection that hasn't answered a ping within
///   this window is dropped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub max_concurrent_sessions: usize,
    pub heartbeat_interval_secs: u64,
    pub client_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            storage: StorageConfig {
                data_dir: "data".to_string(),
            },
            stream: StreamConfig {
                max_concurrent_sessions: 32,
                heartbeat_interval_secs: 30,
                client_timeout_secs: 60,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle the special HOST and PORT environment variables
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms commonly inject these without the APP_ prefix.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0 (port 0 is reserved)
    /// - The data directory is not empty
    /// - At least one concurrent session is allowed
    /// - The client timeout is longer than the heartbeat interval, so a
    ///   connection always gets at least one ping before it can time out
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.storage.data_dir.is_empty() {
            return Err(anyhow::anyhow!("Storage data_dir cannot be empty"));
        }

        if self.stream.max_concurrent_sessions == 0 {
            return Err(anyhow::anyhow!(
                "Max concurrent sessions must be greater than 0"
            ));
        }

        if self.stream.client_timeout_secs <= self.stream.heartbeat_interval_secs {
            return Err(anyhow::anyhow!(
                "Client timeout ({}s) must be longer than the heartbeat interval ({}s)",
                self.stream.client_timeout_secs,
                self.stream.heartbeat_interval_secs
            ));
        }

        Ok(())
    }
}
