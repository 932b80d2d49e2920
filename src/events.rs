//! Lifecycle announcements and a small synchronous event bus.
//!
//! Every node owns an [`EventBus`] and triggers [`Lifecycle::Start`] after it
//! becomes Running and [`Lifecycle::Stop`] after it becomes Stopped.
//!
//! ## Rules
//! - **Synchronous**: `trigger()` invokes listeners on the calling thread.
//! - **Registration order**: listeners for one event run in the order they were added.
//! - **Snapshot delivery**: the listener list is copied before invocation, so a
//!   listener may register or remove listeners without deadlocking; changes
//!   apply to the next trigger.
//! - **One-shot**: listeners added with `once()` are removed as they fire.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle transitions announced by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Fired after the node transitioned to Running.
    Start,
    /// Fired after the node transitioned to Stopped.
    Stop,
}

impl Lifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Start => "start",
            Lifecycle::Stop => "stop",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by [`EventBus::on`] / [`EventBus::once`], used to remove a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<E> = Arc<dyn Fn(E) + Send + Sync>;

struct Listener<E> {
    id: ListenerId,
    event: E,
    once: bool,
    callback: Callback<E>,
}

/// Synchronous publish/subscribe notifier.
pub struct EventBus<E = Lifecycle> {
    listeners: Mutex<Vec<Listener<E>>>,
    next_id: AtomicU64,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl<E: Copy + PartialEq> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a persistent listener for `event`.
    pub fn on(&self, event: E, callback: impl Fn(E) + Send + Sync + 'static) -> ListenerId {
        self.register(event, false, Arc::new(callback))
    }

    /// Registers a listener that fires on the next `event` only.
    pub fn once(&self, event: E, callback: impl Fn(E) + Send + Sync + 'static) -> ListenerId {
        self.register(event, true, Arc::new(callback))
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Invokes every listener registered for `event`, in registration order.
    pub fn trigger(&self, event: E) {
        let callbacks: Vec<Callback<E>> = {
            let mut listeners = self.listeners.lock();
            let matching = listeners
                .iter()
                .filter(|l| l.event == event)
                .map(|l| l.callback.clone())
                .collect();
            listeners.retain(|l| !(l.once && l.event == event));
            matching
        };

        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: E) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|l| l.event == event)
            .count()
    }

    fn register(&self, event: E, once: bool, callback: Callback<E>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push(Listener {
            id,
            event,
            once,
            callback,
        });
        id
    }
}
