//! flatfile-ingest - Main entry point.
//!
//! Serves the REST API that moves data between a database and CSV files.

use clap::Parser;
use flatfile_ingest::api::AppState;
use flatfile_ingest::config::Config;
use flatfile_ingest::db::DatabaseGateway;
use flatfile_ingest::pipeline::FileCatalog;
use flatfile_ingest::transport::HttpTransport;
use tracing::{error, info, warn};
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
    let config = Config::parse();
    init_tracing(&config);

    info!(
        upload_dir = %config.upload_dir.display(),
        max_upload_size = config.max_upload_size,
        "Starting flatfile-ingest v{}",
        env!("CARGO_PKG_VERSION")
    );

    let gateway = DatabaseGateway::new(config.client_options());

    // A failed startup connection is not fatal; clients can POST /connect later
    if let Some(startup) = config.startup_connection()? {
        match gateway.connect(startup).await {
            Ok(tables) => info!(tables = tables.len(), "Startup connection ready"),
            Err(e) => warn!(error = %e, "Startup connection failed, starting disconnected"),
        }
    }

    let state = AppState::new(
        gateway,
        FileCatalog::new(config.upload_dir.clone()),
        config.max_upload_size,
    );
    let transport = HttpTransport::new(state, &config.http_host, config.http_port);

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
