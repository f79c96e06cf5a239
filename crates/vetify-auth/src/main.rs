//! Vetify identity issuer service entry point.

use anyhow::Context;
use clap::Parser;
use vetify_auth::{Config, from_settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize logging
    let default_filter = if config.debug {
        "debug"
    } else {
        "info,vetify=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let settings = config.validate().context("invalid configuration")?;
    let bind_addr = settings.bind_addr;
    tracing::info!(issuer = %settings.issuer_url, "Starting Vetify issuer");

    let issuer = from_settings(settings).context("failed to assemble issuer")?;
    let app = issuer.router();

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
