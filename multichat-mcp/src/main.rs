//! MCP Server entry point for MultiChat.
//!
//! Connects exactly one messenger backend (selected on the command line) and
//! serves its tools over the stdio transport until the client goes away or
//! the process receives SIGINT/SIGTERM.

mod config;
mod server;

use std::process::ExitCode;

use clap::Parser;
use multichat_messenger::{Messenger, create_messenger};
use rmcp::ServiceExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::Cli;
use server::MultichatMcp;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing to stderr (MCP uses stdout for protocol)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_directive()));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_ansi(false),
        )
        .with(filter)
        .init();

    tracing::info!(
        "Starting MultiChat MCP Server (messenger: {}, log level: {})",
        cli.messenger,
        cli.log_level.as_directive()
    );

    let messenger = match create_messenger(cli.messenger_config()).await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Failed to create {} messenger: {}", cli.messenger, e);
            return ExitCode::FAILURE;
        }
    };

    // Ctrl-C / SIGTERM 取消配对等待和进行中的调用
    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    tracing::info!("Connecting to {}...", messenger.name());
    if let Err(e) = messenger.connect(&shutdown).await {
        tracing::error!("Failed to connect to {}: {}", messenger.name(), e);
        messenger.disconnect().await;
        return ExitCode::FAILURE;
    }
    tracing::info!("{} connected successfully", messenger.name());

    let mcp_server = match MultichatMcp::new(std::sync::Arc::clone(&messenger)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to register tools: {}", e);
            messenger.disconnect().await;
            return ExitCode::FAILURE;
        }
    };

    // Start serving via stdio
    tracing::info!("Starting MCP server on stdio transport");
    let service = match mcp_server.serve(rmcp::transport::stdio()).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start MCP server: {}", e);
            messenger.disconnect().await;
            return ExitCode::FAILURE;
        }
    };

    let service_ct = service.cancellation_token();
    let exit = tokio::select! {
        result = service.waiting() => match result {
            Ok(reason) => {
                tracing::info!("MCP session ended: {:?}", reason);
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("MCP server error: {}", e);
                ExitCode::FAILURE
            }
        },
        () = shutdown.cancelled() => {
            tracing::info!("Shutdown signal received, closing connections...");
            service_ct.cancel();
            ExitCode::SUCCESS
        }
    };

    shutdown.cancel();
    messenger.disconnect().await;
    exit
}

async fn watch_signals(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    shutdown.cancel();
}
