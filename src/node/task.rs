//! Background tasks and their cooperative stop protocol.
//!
//! A node task runs on its own thread from `start()` until it observes its
//! [`StopSignal`]. `stop()` closes the signal and joins the thread; joining is
//! the acknowledgment, so a task that never looks at its signal makes `stop()`
//! hang.

use crate::config::{ThreadRole, ThreadSettings};
use crate::error::{RelayError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Function run on a node's task thread.
pub type NodeTask = Arc<dyn Fn(StopSignal) + Send + Sync>;

/// Stop request handed to a running task.
///
/// The request is latched: once raised, every check keeps reporting it.
#[derive(Clone)]
pub struct StopSignal {
    rx: Receiver<()>,
}

impl fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopSignal")
            .field("requested", &self.is_requested())
            .finish()
    }
}

impl StopSignal {
    /// A signal paired with the sender whose drop raises it.
    pub(crate) fn channel() -> (Sender<()>, StopSignal) {
        let (tx, rx) = bounded(0);
        (tx, StopSignal { rx })
    }

    pub fn is_requested(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Blocks until stop is requested.
    pub fn wait(&self) {
        let _ = self.rx.recv();
    }

    /// Sleeps for up to `timeout`, waking early on a stop request.
    /// Returns `true` if stop was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Disconnected))
    }

    /// Receiver that disconnects on stop, for use in `crossbeam_channel::select!`.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

/// A task thread between `start()` and `stop()`.
///
/// The thread is parked until [`release`](RunningTask::release), so the task
/// body never observes its node in `Starting`.
pub(crate) struct RunningTask {
    stop: Sender<()>,
    go: Option<Sender<()>>,
    handle: JoinHandle<()>,
}

/// How a task thread ended once stop was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskExit {
    Returned,
    Panicked,
    /// `stop()` ran on the task's own thread, so it could not be joined.
    Detached,
}

impl RunningTask {
    pub(crate) fn spawn(task: NodeTask, threads: &ThreadSettings, node_id: &str) -> Result<Self> {
        let (stop, signal) = StopSignal::channel();
        let (go, gate) = bounded::<()>(0);
        let handle = threads
            .builder(node_id, ThreadRole::Task)
            .spawn(move || {
                let _ = gate.recv();
                if !signal.is_requested() {
                    task(signal);
                }
            })
            .map_err(|source| RelayError::Spawn {
                name: threads.thread_name(node_id, ThreadRole::Task),
                source,
            })?;
        Ok(Self {
            stop,
            go: Some(go),
            handle,
        })
    }

    /// Lets the task body run.
    pub(crate) fn release(&mut self) {
        self.go.take();
    }

    /// Raises the stop signal and waits for the task to return.
    pub(crate) fn stop_and_join(self) -> TaskExit {
        let RunningTask { stop, go, handle } = self;
        drop(stop);
        drop(go);
        if handle.thread().id() == thread::current().id() {
            return TaskExit::Detached;
        }
        match handle.join() {
            Ok(()) => TaskExit::Returned,
            Err(_) => TaskExit::Panicked,
        }
    }
}
