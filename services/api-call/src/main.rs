//! api-call
//!
//! Command-line front end for the HTTP call gateway:
//! 1. `call` issues one gateway call and prints the result as JSON
//! 2. `relay` serves a remote API through the gateway over HTTP

mod cli;
mod config;
mod error;
mod metrics;
mod relay;
mod token_file;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gateway_client::{ApiClient, CallResult, Json, Text, Verb};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{CallArgs, Cli, Command};
use crate::config::Config;
use crate::relay::AppState;

/// How long in-flight relay requests may drain after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let client = ApiClient::new(config.client_config());
    client.set_credentials(config.credentials()).await;
    info!(
        host = %config.api.host,
        timeout_ms = config.api.timeout_ms,
        mode = client.auth_mode().await.label(),
        "configuration loaded"
    );

    match cli.command {
        Command::Call(args) => Ok(if run_call(&client, args).await? {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }),
        Command::Relay => {
            run_relay(Arc::new(client), &config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Issue one call and print the result on stdout. Returns whether it succeeded.
async fn run_call(client: &ApiClient, args: CallArgs) -> Result<bool> {
    if args.text {
        print_result(&call::<Text>(client, &args).await)
    } else {
        print_result(&call::<Json<serde_json::Value>>(client, &args).await)
    }
}

async fn call<D: gateway_client::DecodeTarget>(
    client: &ApiClient,
    args: &CallArgs,
) -> CallResult<D::Output> {
    let query = args.query_pairs();
    let body = args.body.clone().unwrap_or(serde_json::Value::Null);
    let auth = args.auth();
    match args.verb() {
        Verb::Get => client.get::<D>(&args.address, auth, &query).await,
        Verb::Delete => client.delete::<D>(&args.address, auth, &query).await,
        Verb::Post => client.post::<D, _>(&args.address, &body, auth).await,
        Verb::Put => client.put::<D, _>(&args.address, &body, auth).await,
        Verb::Patch => client.patch::<D, _>(&args.address, &body, auth).await,
    }
}

fn print_result<T: Serialize>(result: &CallResult<T>) -> Result<bool> {
    let json = serde_json::to_string_pretty(result).context("failed to render result")?;
    println!("{json}");
    if let CallResult::Problem(problem) = result {
        warn!(
            kind = problem.problem_type.as_deref().unwrap_or(""),
            status = problem.status.unwrap_or_default(),
            "call returned a problem"
        );
    }
    Ok(result.is_success())
}

async fn run_relay(client: Arc<ApiClient>, config: &Config) -> Result<()> {
    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder().context("failed to install metrics recorder")?;

    let app = relay::build_router(
        AppState::new(client, prometheus),
        config.relay.max_connections,
    );

    let listen_addr = config.relay.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "relay accepting requests");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    // The drain timer starts at signal receipt
    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
