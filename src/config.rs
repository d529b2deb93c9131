//! Configuration handling for the bridge.
//!
//! Server-side settings come from CLI arguments and environment variables. Database
//! connection parameters are not configured here: they arrive with every request.

use crate::db::statement::IdentifierMode;
use crate::staging::StagingDirs;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 5000;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_STATIC_DIR: &str = "frontend";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPLOAD_LIMIT_MB: usize = 100;
pub const DEFAULT_CORS_ORIGIN: &str = "*";

/// Configuration for the bridge server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "clickhouse-flatfile-bridge",
    about = "HTTP bridge for moving data between ClickHouse tables and CSV flat files",
    version,
    author
)]
pub struct Config {
    /// HTTP host to bind to
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "BRIDGE_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "BRIDGE_HTTP_PORT")]
    pub http_port: u16,

    /// Directory for uploaded CSV files (relative to the working directory)
    #[arg(long, default_value = DEFAULT_UPLOAD_DIR, env = "BRIDGE_UPLOAD_DIR")]
    pub upload_dir: PathBuf,

    /// Directory for generated CSV files (relative to the working directory)
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "BRIDGE_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Directory holding the frontend's index.html
    #[arg(long, default_value = DEFAULT_STATIC_DIR, env = "BRIDGE_STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Timeout in seconds for establishing a connection to ClickHouse
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "BRIDGE_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Maximum accepted upload size in megabytes
    #[arg(
        long,
        default_value_t = DEFAULT_UPLOAD_LIMIT_MB,
        env = "BRIDGE_UPLOAD_LIMIT_MB"
    )]
    pub upload_limit_mb: usize,

    /// CORS allowed origins (comma-separated, "*" for any)
    #[arg(long, default_value = DEFAULT_CORS_ORIGIN, env = "BRIDGE_CORS_ORIGIN")]
    pub cors_origin: String,

    /// Quote table and column identifiers with backticks instead of passing them verbatim
    #[arg(long, env = "BRIDGE_QUOTE_IDENTIFIERS")]
    pub quote_identifiers: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "BRIDGE_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "BRIDGE_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            upload_limit_mb: DEFAULT_UPLOAD_LIMIT_MB,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            quote_identifiers: false,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Get the upload limit in bytes.
    pub fn upload_limit_bytes(&self) -> usize {
        self.upload_limit_mb.saturating_mul(1024 * 1024)
    }

    pub fn identifier_mode(&self) -> IdentifierMode {
        if self.quote_identifiers {
            IdentifierMode::Quoted
        } else {
            IdentifierMode::Verbatim
        }
    }

    /// Staging directories resolved against the current working directory.
    /// Nothing is created on disk until [`StagingDirs::prepare`] is called.
    pub fn staging_dirs(&self) -> std::io::Result<StagingDirs> {
        let cwd = std::env::current_dir()?;
        Ok(StagingDirs::new(
            cwd.join(&self.upload_dir),
            cwd.join(&self.output_dir),
        ))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
