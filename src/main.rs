// ABOUTME: Main entry point for the notespace workspace and note API server
// ABOUTME: Reads configuration, sets up logging, serves until a shutdown signal, then closes storage

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod auth;
mod config;
mod entities;
mod error;
mod handlers;
mod links;
mod middleware;
mod migration;
mod notes;
mod permissions;
mod storage;
mod tags;
mod types;
mod users;
mod versioning;
mod workspaces;

#[cfg(test)]
mod integration_tests;

pub use app::AppState;

use app::App;
use config::{Config, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        bind_addr = %config.bind_addr,
        app_env = %config.app_env,
        "Starting notespace"
    );

    let app = App::build(config).await?;
    let listener = TcpListener::bind(&app.config().bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    app.serve(listener, shutdown_signal()).await?;

    tracing::info!("Server stopped, shutting down");
    app.shutdown().await?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notespace=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl-C received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }
}
