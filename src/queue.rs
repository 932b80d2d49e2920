//! Queue processor: FIFO hand-off from many producers to one handler.
//!
//! Items pushed with [`QueueProcessor::put`] are buffered in a crossbeam
//! channel and handed, one at a time and in push order, to the handler on a
//! background worker thread. The worker is spawned on demand and exits as
//! soon as the buffer is empty, so an idle processor owns no thread.
//!
//! ```text
//! put() ──┐
//! put() ──┼──► [ unbounded FIFO ] ──► worker thread ──► handler(item)
//! put() ──┘                          (at most one alive)
//! ```
//!
//! The pending count and the "worker alive" flag share one mutex with the
//! channel send, which makes the worker's exit decision exact: a `put` either
//! lands before the worker checks for emptiness (and is drained by it) or
//! sees the flag cleared (and spawns a fresh worker).

use crate::config::{ThreadRole, ThreadSettings};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Handler invoked for every chunk drained from a queue.
pub type ChunkHandler<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Buffer<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

struct State<T> {
    /// Items pushed but not yet handled (including the one in the handler).
    pending: usize,
    /// Whether a worker currently owns the drain loop.
    processing: bool,
    /// Materialized on first `put`.
    buffer: Option<Buffer<T>>,
}

struct Shared<T> {
    handler: Option<ChunkHandler<T>>,
    state: Mutex<State<T>>,
    drained: Condvar,
    threads: ThreadSettings,
    owner: String,
    role: ThreadRole,
}

/// Asynchronous, order-preserving dispatcher.
///
/// Cloning yields another handle to the same queue.
pub struct QueueProcessor<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for QueueProcessor<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for QueueProcessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("QueueProcessor")
            .field("owner", &self.shared.owner)
            .field("role", &self.shared.role)
            .field("pending", &state.pending)
            .field("processing", &state.processing)
            .finish()
    }
}

impl<T: Send + 'static> QueueProcessor<T> {
    /// Creates a processor draining into `handler` with default thread settings.
    pub fn new(handler: impl Fn(T) + Send + Sync + 'static) -> Self {
        let handler: ChunkHandler<T> = Arc::new(handler);
        Self::from_handler(Some(handler))
    }

    /// Creates a processor from an optional handler. Without a handler every
    /// `put` is a no-op.
    pub fn from_handler(handler: Option<ChunkHandler<T>>) -> Self {
        Self::with_threads(handler, ThreadSettings::default(), "", ThreadRole::OutputWorker)
    }

    /// Creates a processor whose worker threads are named after `owner` and `role`.
    pub fn with_threads(
        handler: Option<ChunkHandler<T>>,
        threads: ThreadSettings,
        owner: impl Into<String>,
        role: ThreadRole,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                handler,
                state: Mutex::new(State {
                    pending: 0,
                    processing: false,
                    buffer: None,
                }),
                drained: Condvar::new(),
                threads,
                owner: owner.into(),
                role,
            }),
        }
    }

    /// Enqueues `item`, spawning a worker if none is draining.
    pub fn put(&self, item: T) {
        if self.shared.handler.is_none() {
            return;
        }

        let spawn_rx = {
            let mut state = self.shared.state.lock();
            let buffer = state.buffer.get_or_insert_with(|| {
                let (tx, rx) = unbounded();
                Buffer { tx, rx }
            });
            // The receiver lives in the same buffer, so the channel is never disconnected.
            if buffer.tx.send(item).is_err() {
                return;
            }
            let rx = buffer.rx.clone();
            state.pending += 1;
            if state.processing {
                None
            } else {
                state.processing = true;
                Some(rx)
            }
        };

        if let Some(rx) = spawn_rx {
            self.spawn_worker(rx);
        }
    }

    /// Blocks until every item pushed so far has been handled.
    pub fn wait(&self) {
        let mut state = self.shared.state.lock();
        while state.pending > 0 {
            self.shared.drained.wait(&mut state);
        }
    }

    /// Number of items pushed but not yet handled.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending
    }

    /// Whether a worker is currently draining.
    pub fn is_processing(&self) -> bool {
        self.shared.state.lock().processing
    }

    fn spawn_worker(&self, rx: Receiver<T>) {
        let shared = self.shared.clone();
        let builder = self.shared.threads.builder(&self.shared.owner, self.shared.role);
        let worker_rx = rx.clone();
        if let Err(e) = builder.spawn(move || shared.drain(&worker_rx)) {
            let dropped = self.shared.discard(&rx);
            tracing::error!(
                owner = %self.shared.owner,
                dropped,
                "Failed to spawn queue worker, discarding backlog: {}",
                e
            );
        }
    }
}

impl<T> Shared<T> {
    fn drain(&self, rx: &Receiver<T>) {
        let Some(handler) = self.handler.as_ref() else {
            return;
        };
        tracing::trace!(owner = %self.owner, role = ?self.role, "queue worker started");

        loop {
            while let Ok(item) = rx.try_recv() {
                if catch_unwind(AssertUnwindSafe(|| handler(item))).is_err() {
                    tracing::error!(
                        owner = %self.owner,
                        role = ?self.role,
                        "chunk handler panicked"
                    );
                }
                self.complete_one();
            }

            let mut state = self.state.lock();
            if rx.is_empty() {
                state.processing = false;
                break;
            }
        }

        tracing::trace!(owner = %self.owner, role = ?self.role, "queue worker exiting");
    }

    /// Throws away everything buffered and releases the drain flag.
    fn discard(&self, rx: &Receiver<T>) -> usize {
        let mut state = self.state.lock();
        let mut dropped = 0;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        state.pending -= dropped;
        state.processing = false;
        if state.pending == 0 {
            self.drained.notify_all();
        }
        dropped
    }

    fn complete_one(&self) {
        let mut state = self.state.lock();
        state.pending -= 1;
        if state.pending == 0 {
            self.drained.notify_all();
        }
    }
}
