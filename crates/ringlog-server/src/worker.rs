//! Per-connection worker
//!
//! A [`ConnectionWorker`] serves exactly one client:
//!
//! 1. **Receiving**: read chunks into its own [`PendingAccumulator`] until a
//!    terminator arrives or the peer closes its write side.
//! 2. **Flushing**: store the first complete record in the shared log. Bytes
//!    after its terminator, including any already waiting on the connection,
//!    are counted and dropped, so what gets stored never depends on how the
//!    stream happened to be split into reads.
//! 3. **Replying**: stream the whole log back. The records are stored and the
//!    reply snapshot taken in one critical section, so the reply reflects the
//!    log exactly as this worker left it.
//! 4. **Closing**: shut the stream down and mark the worker complete.
//!
//! Partial bytes never reach the shared log: they live in the worker's own
//! accumulator and are dropped if the connection ends without a terminator.

use std::fmt;
use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Poll;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use ringlog_core::{LogAccessPoint, PendingAccumulator};

use crate::error::ServerResult;

/// Identifier assigned to each accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// How a worker finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The record (if any) was stored and the log was sent back
    Replied {
        /// Records stored in the log, 0 or 1
        stored: usize,
        /// Bytes that were not part of the stored record
        discarded: usize,
        /// Bytes sent back to the client
        reply_bytes: usize,
    },
    /// Cancelled before finishing
    Cancelled,
}

/// Sets the completion flag when dropped, however the worker ends
struct CompletionGuard(Arc<AtomicBool>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Handle the registry keeps for a spawned worker
#[derive(Debug)]
pub struct WorkerHandle {
    pub id: WorkerId,
    pub peer: String,
    pub(crate) task: JoinHandle<()>,
    pub(crate) completed: Arc<AtomicBool>,
    pub(crate) cancel: CancellationToken,
}

impl WorkerHandle {
    /// Whether the worker has finished (successfully or not)
    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Ask the worker to stop at its next await point
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Serves one client connection against the shared log
pub struct ConnectionWorker<S> {
    id: WorkerId,
    peer: String,
    stream: S,
    log: Arc<LogAccessPoint>,
    pending: PendingAccumulator,
    chunk_size: usize,
    cancel: CancellationToken,
}

impl<S> ConnectionWorker<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        id: WorkerId,
        peer: impl Into<String>,
        stream: S,
        log: Arc<LogAccessPoint>,
        chunk_size: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            peer: peer.into(),
            stream,
            log,
            pending: PendingAccumulator::new(),
            chunk_size: chunk_size.max(1),
            cancel,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Spawn the worker onto the runtime
    ///
    /// The completion flag is set when the task ends, including on error,
    /// cancellation or panic.
    pub fn spawn(self) -> WorkerHandle {
        let id = self.id;
        let peer = self.peer.clone();
        let cancel = self.cancel.clone();
        let completed = Arc::new(AtomicBool::new(false));
        let guard = CompletionGuard(completed.clone());
        let span = info_span!("worker", worker_id = %id, peer = %peer);

        let task = tokio::spawn(
            async move {
                let _guard = guard;
                let peer = self.peer.clone();
                match self.run().await {
                    Ok(WorkerOutcome::Cancelled) => debug!("Worker cancelled"),
                    Ok(outcome) => debug!(?outcome, "Worker finished"),
                    Err(e) => warn!(error = %e, "Worker failed"),
                }
                info!("Closed connection from {}", peer);
            }
            .instrument(span),
        );

        WorkerHandle {
            id,
            peer,
            task,
            completed,
            cancel,
        }
    }

    /// Run the full receive / flush / reply / close sequence
    ///
    /// Returns [`WorkerOutcome::Cancelled`] if the cancel token fires first;
    /// whatever step was in progress is abandoned.
    pub async fn run(mut self) -> ServerResult<WorkerOutcome> {
        let cancel = self.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(WorkerOutcome::Cancelled),
            result = self.serve() => result,
        }
    }

    async fn serve(&mut self) -> ServerResult<WorkerOutcome> {
        self.receive().await?;

        let record = self.pending.drain();
        let unread = if record.is_some() {
            self.discard_ready().await?
        } else {
            0
        };
        let discarded = self.pending.clear() + unread;
        if discarded > 0 {
            warn!(discarded, "Dropping bytes outside the stored record");
        }

        let records: Vec<_> = record.into_iter().collect();
        let stored = records.len();

        let snapshot = self.log.commit_and_snapshot(records).await?;
        debug!(stored, reply_bytes = snapshot.len(), "Stored records");

        self.stream.write_all(&snapshot).await?;
        self.stream.flush().await?;
        self.stream.shutdown().await?;

        Ok(WorkerOutcome::Replied {
            stored,
            discarded,
            reply_bytes: snapshot.len(),
        })
    }

    /// Read until a terminator is buffered or the peer stops sending
    async fn receive(&mut self) -> ServerResult<()> {
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                if !self.pending.is_empty() {
                    debug!(pending = self.pending.len(), "Peer closed before terminator");
                }
                return Ok(());
            }
            if self.pending.append(&buf[..n])? {
                return Ok(());
            }
        }
    }

    /// Read and drop whatever the connection can yield without waiting
    ///
    /// Returns the number of bytes dropped. Stops at the first read that would
    /// block, or at end of stream.
    async fn discard_ready(&mut self) -> io::Result<usize> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut dropped = 0;
        loop {
            let ready = poll_fn(|cx| {
                let mut read_buf = ReadBuf::new(&mut buf[..]);
                match Pin::new(&mut self.stream).poll_read(cx, &mut read_buf) {
                    Poll::Pending => Poll::Ready(None),
                    Poll::Ready(result) => {
                        Poll::Ready(Some(result.map(|()| read_buf.filled().len())))
                    }
                }
            })
            .await;

            match ready {
                None | Some(Ok(0)) => return Ok(dropped),
                Some(Ok(n)) => dropped += n,
                Some(Err(e)) => return Err(e),
            }
        }
    }
}
