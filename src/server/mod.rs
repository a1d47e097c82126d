// Local HTTP server: dashboard page and JSON API

mod handlers;
mod routes;

pub use handlers::{AppState, ErrorBody};
pub use routes::router;

use crate::config::Config;
use crate::error::{RelinkError, Result};
use crate::services::{ProcessControl, Registry};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Server options taken from the command line on top of `Config`
#[derive(Debug, Clone, Copy)]
pub struct ServeOptions {
    pub port: u16,
    pub open_browser: bool,
}

impl ServeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.port,
            open_browser: config.open_browser,
        }
    }
}

/// Address the listener binds to; port 0 lets the OS pick
pub fn bind_addr(config: &Config, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = config.bind_address.parse().map_err(|_| {
        RelinkError::Config(format!("invalid bind address '{}'", config.bind_address))
    })?;
    Ok(SocketAddr::new(ip, port))
}

/// Serve until Ctrl+C or SIGTERM
pub async fn serve(
    config: &Config,
    registry: Arc<Registry>,
    processes: Arc<dyn ProcessControl>,
    options: ServeOptions,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr(config, options.port)?).await?;
    let addr = listener.local_addr()?;
    let url = format!("http://{}", addr);

    tracing::info!("Relink dashboard running at {}", url);
    eprintln!("Relink running at {}", url);

    if options.open_browser {
        if let Err(e) = processes.open_url(&url).await {
            tracing::warn!("Could not open browser: {}", e);
        }
    }

    let app = router(AppState::new(registry, config.remote_host.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Relink shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
