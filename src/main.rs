//! ClickHouse flat-file bridge - Main entry point.

use clickhouse_flatfile_bridge::config::Config;
use clickhouse_flatfile_bridge::gateway::{self, Settings};
use clickhouse_flatfile_bridge::transport::{HttpTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();
    init_tracing(&config);

    info!(
        address = %config.http_bind_addr(),
        quote_identifiers = config.quote_identifiers,
        "Starting ClickHouse flat-file bridge v{}",
        env!("CARGO_PKG_VERSION")
    );

    let settings = Settings::from_config(&config)?;
    settings.staging.prepare()?;

    let router = gateway::router(Arc::new(settings));
    let transport = HttpTransport::new(router, &config.http_host, config.http_port);
    info!(transport = transport.name(), "Using HTTP transport");

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
