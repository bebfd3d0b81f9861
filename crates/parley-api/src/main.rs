//! Parley CLI and REST API entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, sets up tracing, loads configuration, then either
//! runs the HTTP server or a one-shot session maintenance command.

mod cli;
mod http;
mod state;

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;

use cli::{Cli, Commands};
use parley_core::chat::session::SessionManager;
use parley_infra::config::{load_config, process_env};
use parley_observe::tracing_setup::{init_tracing, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_directive(), cli.log_format, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref(), process_env)
        .await
        .context("invalid configuration")?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await?;
        }

        Commands::History {
            session_id,
            limit,
            json,
        } => {
            let sessions = SessionManager::new(state::open_store(&config.store).await?);
            let result = cli::session::show_history(&sessions, &session_id, limit, json).await;
            sessions.store().pool().close().await;
            result?;
        }

        Commands::DeleteSession { session_id, json } => {
            let sessions = SessionManager::new(state::open_store(&config.store).await?);
            let result = cli::session::delete_session(&sessions, &session_id, json).await;
            sessions.store().pool().close().await;
            result?;
        }
    }

    Ok(())
}

async fn serve(config: parley_types::config::RelayConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(
        model_id = %config.inference.model_id,
        region = %config.inference.region,
        rate_limit = %format!("{}/{}s", config.rate_limit.quota, config.rate_limit.window_secs),
        history_read_failure = %config.chat.history_read_failure,
        persist_failure = %config.chat.persist_failure,
        "Starting Parley"
    );

    let state = AppState::init(config).await?;
    tracing::info!(provider = state.chat_service.provider_name(), "Chat service ready");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    println!(
        "  {} Parley API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state.clone());

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    state.shutdown().await;
    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
