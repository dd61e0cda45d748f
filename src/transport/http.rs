//! HTTP transport serving the REST API.

use crate::api::{AppState, create_router};
use crate::error::{IngestError, IngestResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Time allowed for in-flight requests (large exports, uploads) after a
/// shutdown signal before the server is dropped.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    state: AppState,
    host: String,
    port: u16,
}

impl HttpTransport {
    pub fn new(state: AppState, host: impl Into<String>, port: u16) -> Self {
        Self {
            state,
            host: host.into(),
            port,
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Serve until a shutdown signal, then close the database connection.
    pub async fn run(&self) -> IngestResult<()> {
        let bind_addr = self.bind_addr();
        let app = create_router(self.state.clone());

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            IngestError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;
        info!(
            addr = %bind_addr,
            upload_dir = %self.state.catalog.dir().display(),
            "HTTP API listening"
        );

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        // Server completing normally vs forced timeout/second signal after shutdown
        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(IngestError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for requests to finish (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        info!("Closing database connection");
        self.state.gateway.close_all().await;

        Ok(())
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseGateway;
    use crate::pipeline::FileCatalog;

    fn state() -> AppState {
        AppState::new(DatabaseGateway::default(), FileCatalog::new("uploads"), 1024)
    }

    #[test]
    fn test_http_transport_creation() {
        let transport = HttpTransport::new(state(), "127.0.0.1", 8000);
        assert_eq!(transport.bind_addr(), "127.0.0.1:8000");
    }

    #[test]
    fn test_http_transport_bind_addr() {
        let transport = HttpTransport::new(state(), "0.0.0.0", 3000);
        assert_eq!(transport.bind_addr(), "0.0.0.0:3000");
    }
}
