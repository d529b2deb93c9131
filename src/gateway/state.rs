//! Process-wide settings shared with every request handler.

use crate::config::Config;
use crate::db::{ClickHouseHandle, ClientOptions, StatementBuilder};
use crate::error::BridgeResult;
use crate::models::ConnectionConfig;
use crate::staging::StagingDirs;
use std::path::PathBuf;

/// Settings resolved once at startup and passed by reference into each component.
#[derive(Debug, Clone)]
pub struct Settings {
    pub staging: StagingDirs,
    pub statements: StatementBuilder,
    pub client: ClientOptions,
    pub static_dir: PathBuf,
    pub upload_limit_bytes: usize,
    /// Allowed CORS origins; empty means any
    pub cors_origins: Vec<String>,
}

impl Settings {
    /// Resolve settings from the server configuration. Does not touch the filesystem.
    pub fn from_config(config: &Config) -> std::io::Result<Self> {
        let cors_origins = if config.cors_origin.trim() == "*" {
            Vec::new()
        } else {
            config
                .cors_origin
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        Ok(Self {
            staging: config.staging_dirs()?,
            statements: StatementBuilder::new(config.identifier_mode()),
            client: ClientOptions {
                connect_timeout: config.connect_timeout_duration(),
            },
            static_dir: std::env::current_dir()?.join(&config.static_dir),
            upload_limit_bytes: config.upload_limit_bytes(),
            cors_origins,
        })
    }

    /// Settings rooted at explicit staging directories, with defaults elsewhere.
    pub fn with_staging(staging: StagingDirs) -> Self {
        let config = Config::default_config();
        Self {
            staging,
            statements: StatementBuilder::default(),
            client: ClientOptions::default(),
            static_dir: PathBuf::from(&config.static_dir),
            upload_limit_bytes: config.upload_limit_bytes(),
            cors_origins: Vec::new(),
        }
    }

    /// Open a fresh connection for one request.
    pub async fn connect(&self, config: &ConnectionConfig) -> BridgeResult<ClickHouseHandle> {
        ClickHouseHandle::connect(config, &self.client).await
    }
}
