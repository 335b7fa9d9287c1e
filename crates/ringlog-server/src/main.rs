use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use ringlog_core::LogAccessPoint;
use ringlog_logging::SubscriberBuilder;
use ringlog_server::{Cli, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;

    // Keep the guard alive so file output is flushed on exit
    let _log_guard = SubscriberBuilder::new()
        .with_config(config.logging.clone())
        .try_init()?;

    let shutdown = CancellationToken::new();
    let log = Arc::new(LogAccessPoint::with_interrupt(shutdown.clone()));
    let server = Server::bind(config, log).await?;

    tokio::spawn(wait_for_signal(shutdown.clone()));

    if let Err(e) = server.run(shutdown).await {
        error!(error = %e, "Server failed");
        return Err(e.into());
    }
    info!("Exited cleanly");
    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM
async fn wait_for_signal(shutdown: CancellationToken) {
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
                error!(error = %e, "Cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Caught signal, exiting");
    shutdown.cancel();
}
