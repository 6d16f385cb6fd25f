//! MaoFlow CLI and REST API entry point.
//!
//! Binary name: `maoflow`
//!
//! Parses CLI arguments, loads configuration, opens the database, then
//! either runs migrations or starts the REST API server.

mod cli;
mod http;
mod state;

use std::path::Path;

use anyhow::Context;
use clap::Parser;

use maoflow_infra::config::{load_global_config, resolve_data_dir, resolve_database_url};
use maoflow_infra::sqlite::pool::DatabasePool;
use maoflow_observe::tracing_setup::{default_filter, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = resolve_data_dir();
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let config = load_global_config(&data_dir).await;
    let enable_otel = cli.command.otel_requested() || config.observability.otel;
    init_tracing(default_filter(cli.verbose, cli.quiet), enable_otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli.command, &data_dir, config).await;
    shutdown_tracing();
    result
}

async fn run(
    command: Commands,
    data_dir: &Path,
    mut config: maoflow_types::config::GlobalConfig,
) -> anyhow::Result<()> {
    let db_url = resolve_database_url(data_dir);
    let db_pool = DatabasePool::new(&db_url)
        .await
        .with_context(|| format!("failed to open database at {db_url}"))?;

    match command {
        Commands::Migrate => {
            tracing::info!(database = %db_url, "Database schema is up to date");
            db_pool.close().await;
        }

        Commands::Serve { host, port, .. } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let addr = format!("{}:{}", config.server.host, config.server.port);

            let state = AppState::new(db_pool.clone(), config)?;
            let router = http::router::build_router(state);

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            tracing::info!(%addr, data_dir = %data_dir.display(), "MaoFlow API listening");

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            db_pool.close().await;
            tracing::info!("Server stopped");
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
///
/// If a handler cannot be installed, that signal is simply never awaited.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
