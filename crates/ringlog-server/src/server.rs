//! TCP accept loop
//!
//! [`Server::run`] accepts connections until the shutdown token fires, giving
//! each one its own [`ConnectionWorker`]. Finished workers are reaped after
//! every accept. On shutdown the remaining workers are cancelled and joined,
//! the timestamp injector is stopped, and the log's storage is released.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use ringlog_core::LogAccessPoint;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::registry::WorkerRegistry;
use crate::timestamp::TimestampInjector;
use crate::worker::{ConnectionWorker, WorkerId};

/// Pause after a failed accept (e.g. out of file descriptors)
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Bound listener plus the shared log it serves
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    log: Arc<LogAccessPoint>,
    next_worker_id: u64,
}

impl Server {
    /// Bind the configured listen address
    #[instrument(skip(config, log), fields(addr = %config.listen_addr))]
    pub async fn bind(config: ServerConfig, log: Arc<LogAccessPoint>) -> ServerResult<Self> {
        config.validate()?;
        let addr = config.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        info!(addr = %listener.local_addr()?, "Listening");

        Ok(Self {
            listener,
            config,
            log,
            next_worker_id: 0,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn access_point(&self) -> &Arc<LogAccessPoint> {
        &self.log
    }

    /// Serve until `shutdown` is cancelled
    ///
    /// Returns once every worker has exited and the log has been released.
    pub async fn run(mut self, shutdown: CancellationToken) -> ServerResult<()> {
        let injector = self.config.timestamps.enabled.then(|| {
            let cancel = shutdown.child_token();
            let handle = TimestampInjector::new(
                self.log.clone(),
                self.config.timestamps.interval(),
                cancel.clone(),
            )
            .spawn();
            (cancel, handle)
        });

        let mut registry = WorkerRegistry::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            info!("Accepted connection from {}", peer.ip());
                            let id = self.allocate_id();
                            let worker = ConnectionWorker::new(
                                id,
                                peer.ip().to_string(),
                                stream,
                                self.log.clone(),
                                self.config.read_chunk_size,
                                shutdown.child_token(),
                            );
                            registry.register(worker.spawn());
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            accept_backoff(&shutdown).await;
                        }
                    }
                    registry.reap_completed().await;
                }
            }
        }

        let outstanding = registry.shutdown_all().await;
        debug!(outstanding, "Workers stopped");

        if let Some((cancel, handle)) = injector {
            cancel.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "Timestamp injector ended abnormally");
            }
        }

        let released = self.log.release().await;
        info!(released, "Log released");
        Ok(())
    }

    fn allocate_id(&mut self) -> WorkerId {
        let id = WorkerId(self.next_worker_id);
        self.next_worker_id += 1;
        id
    }
}

/// Wait out [`ACCEPT_ERROR_BACKOFF`] unless shutdown arrives first
async fn accept_backoff(shutdown: &CancellationToken) {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => {}
    }
}
