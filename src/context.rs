//! Advisory cancellation signal shared down a node hierarchy.
//!
//! A [`Context`] is handed to a node with `set_context` and copied to every
//! client attached after that. Nothing in the hierarchy reacts to it on its
//! own; a node task observes it, typically to abort a blocking dial, by
//! selecting on [`Context::done`] next to its stop signal:
//!
//! ```ignore
//! crossbeam_channel::select! {
//!     recv(ctx.done()) -> _ => { /* cancelled */ }
//!     recv(stop.receiver()) -> _ => { /* node stopping */ }
//! }
//! ```
//!
//! Cancellation closes a channel, so every receiver observes it at once and
//! keeps observing it afterwards.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

struct Inner {
    cancel: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
}

impl Inner {
    fn cancel(&self) {
        self.cancel.lock().take();
    }
}

/// Cloneable cancellation signal. Clones share one underlying state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Context {
    /// A context that stays live until [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancel: Mutex::new(Some(tx)),
                done: rx,
            }),
        }
    }

    /// A context that cancels itself once `timeout` elapses.
    ///
    /// The deadline is enforced by a timer thread that exits early when the
    /// context is cancelled or every clone has been dropped.
    pub fn with_timeout(timeout: Duration) -> Self {
        let ctx = Self::new();
        let weak: Weak<Inner> = Arc::downgrade(&ctx.inner);
        let done = ctx.inner.done.clone();
        let spawned = thread::Builder::new()
            .name("relay-context-timer".to_string())
            .spawn(move || {
                crossbeam_channel::select! {
                    recv(crossbeam_channel::after(timeout)) -> _ => {
                        if let Some(inner) = weak.upgrade() {
                            inner.cancel();
                        }
                    }
                    recv(done) -> _ => {}
                }
            });
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn context timer, cancelling immediately: {}", e);
            ctx.cancel();
        }
        ctx
    }

    /// Cancels the context. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.inner.done.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes disconnected on cancellation. Never yields a value.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done
    }

    /// Blocks until the context is cancelled.
    pub fn wait(&self) {
        let _ = self.inner.done.recv();
    }

    /// Blocks until the context is cancelled or `timeout` elapses.
    /// Returns `true` if the context was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.inner.done.recv_timeout(timeout),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected)
        )
    }

    /// Whether two handles refer to the same context.
    pub fn same_as(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
