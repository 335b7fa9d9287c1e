//! Registry of live connection workers
//!
//! The accept loop registers every spawned worker here, reaps finished ones
//! after each accept, and cancels and joins whatever is left at shutdown.

use tracing::{debug, info, warn};

use crate::worker::{WorkerHandle, WorkerId};

/// Ordered collection of spawned workers
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: Vec<WorkerHandle>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly spawned worker
    ///
    /// Returns `false` (and leaves the registry unchanged) if a worker with
    /// the same id is already registered; the rejected worker is cancelled.
    pub fn register(&mut self, handle: WorkerHandle) -> bool {
        if self.workers.iter().any(|w| w.id == handle.id) {
            warn!(worker_id = %handle.id, "Worker already registered");
            handle.cancel();
            return false;
        }
        debug!(
            worker_id = %handle.id,
            peer = %handle.peer,
            live = self.workers.len() + 1,
            "Registered worker"
        );
        self.workers.push(handle);
        true
    }

    /// Join and remove every worker whose completion flag is set
    ///
    /// Returns the number of workers reaped.
    pub async fn reap_completed(&mut self) -> usize {
        let (done, live): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.workers)
                .into_iter()
                .partition(WorkerHandle::is_complete);
        self.workers = live;

        let reaped = done.len();
        for worker in done {
            join(worker).await;
        }
        if reaped > 0 {
            debug!(reaped, live = self.workers.len(), "Reaped completed workers");
        }
        reaped
    }

    /// Cancel every registered worker, wait for each to exit, and clear
    ///
    /// Returns the number of workers that were still registered.
    pub async fn shutdown_all(&mut self) -> usize {
        let workers = std::mem::take(&mut self.workers);
        let count = workers.len();
        if count > 0 {
            info!(count, "Cancelling outstanding workers");
        }

        for worker in &workers {
            worker.cancel();
        }
        for worker in workers {
            join(worker).await;
        }
        count
    }

    /// Number of registered workers
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Ids of registered workers, in registration order
    pub fn ids(&self) -> Vec<WorkerId> {
        self.workers.iter().map(|w| w.id).collect()
    }

    /// Peer address of a registered worker
    pub fn peer_of(&self, id: WorkerId) -> Option<&str> {
        self.workers
            .iter()
            .find(|w| w.id == id)
            .map(|w| w.peer.as_str())
    }
}

impl Drop for WorkerRegistry {
    fn drop(&mut self) {
        // Nothing may outlive the registry; abort whatever shutdown_all missed
        for worker in self.workers.drain(..) {
            worker.cancel();
            worker.task.abort();
        }
    }
}

async fn join(worker: WorkerHandle) {
    let WorkerHandle { id, peer, task, .. } = worker;
    if let Err(e) = task.await {
        if e.is_panic() {
            warn!(worker_id = %id, peer = %peer, "Worker panicked");
        } else {
            debug!(worker_id = %id, peer = %peer, "Worker task aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use ringlog_core::LogAccessPoint;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
    use tokio_util::sync::CancellationToken;

    use crate::worker::ConnectionWorker;

    fn spawn_worker(
        id: u64,
        log: &Arc<LogAccessPoint>,
    ) -> (WorkerHandle, tokio::io::DuplexStream) {
        let (client, server) = duplex(1024);
        let worker = ConnectionWorker::new(
            WorkerId(id),
            format!("peer-{id}"),
            server,
            log.clone(),
            64,
            CancellationToken::new(),
        );
        (worker.spawn(), client)
    }

    async fn wait_complete(registry: &WorkerRegistry, id: WorkerId) {
        for _ in 0..200 {
            if registry.workers.iter().any(|w| w.id == id && w.is_complete()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("worker {id} never completed");
    }

    #[tokio::test]
    async fn test_register_and_reap() {
        let log: Arc<LogAccessPoint> = Arc::new(LogAccessPoint::new());
        let mut registry = WorkerRegistry::new();

        let (a, mut client_a) = spawn_worker(1, &log);
        let (b, _client_b) = spawn_worker(2, &log);
        assert!(registry.register(a));
        assert!(registry.register(b));
        assert_eq!(registry.len(), 2);

        // Finish worker 1 only
        client_a.write_all(b"done\n").await.unwrap();
        let mut reply = Vec::new();
        client_a.read_to_end(&mut reply).await.unwrap();
        wait_complete(&registry, WorkerId(1)).await;

        assert_eq!(registry.reap_completed().await, 1);
        assert_eq!(registry.ids(), vec![WorkerId(2)]);
        assert_eq!(registry.peer_of(WorkerId(2)), Some("peer-2"));
        assert_eq!(registry.peer_of(WorkerId(1)), None);

        assert_eq!(registry.shutdown_all().await, 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let log: Arc<LogAccessPoint> = Arc::new(LogAccessPoint::new());
        let mut registry = WorkerRegistry::new();

        let (first, _c1) = spawn_worker(7, &log);
        let (dup, _c2) = spawn_worker(7, &log);
        assert!(registry.register(first));
        assert!(!registry.register(dup));
        assert_eq!(registry.len(), 1);

        registry.shutdown_all().await;
    }

    #[tokio::test]
    async fn test_shutdown_cancels_blocked_workers() {
        let log: Arc<LogAccessPoint> = Arc::new(LogAccessPoint::new());
        let mut registry = WorkerRegistry::new();
        let mut clients = Vec::new();

        for id in 0..5 {
            let (handle, mut client) = spawn_worker(id, &log);
            // Partial record keeps every worker blocked in receive
            client.write_all(b"partial").await.unwrap();
            clients.push(client);
            registry.register(handle);
        }

        assert_eq!(registry.reap_completed().await, 0);
        assert_eq!(registry.shutdown_all().await, 5);
        assert!(registry.is_empty());
        assert_eq!(log.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reap_on_empty_registry() {
        let mut registry = WorkerRegistry::new();
        assert_eq!(registry.reap_completed().await, 0);
        assert_eq!(registry.shutdown_all().await, 0);
    }
}
