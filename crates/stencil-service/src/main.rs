use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use stencil_service::{logging, router, Cli};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    logging::init_tracing(&config.log_filter);

    let engine = Arc::new(config.engine());
    let address = config.server.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    info!(
        %address,
        max_depth = config.limits.max_depth,
        max_iterations = config.limits.max_iterations,
        cache = config.cache.enabled,
        "stencil listening"
    );

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("stencil stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
