//! Server/client nodes that relay chunks down a tree.
//!
//! A [`Node`] is a cheap, cloneable handle. Clones share one node; identity
//! (used when detaching) is the shared record, never the handle or whatever
//! type embeds it.
//!
//! # Routing
//!
//! ```text
//!            input(chunk)                      output(chunk)
//! parent ──► [input queue] ──► input handler ──► [output queue] ──► output handler
//!                              (default: output)                    (default: every
//!                                                                    child's input)
//! ```
//!
//! Handlers and queues are prepared on the first chunk of each direction,
//! under the node's routing lock, so a handler may be installed any time
//! before the node first carries data. Queues are dropped when the node
//! stops and rebuilt on the next chunk after a restart.
//!
//! # Policy
//!
//! - **Server-like** (default): runs while it has at least one client.
//! - **Principally client**: runs while attached to a parent. Without a custom
//!   output handler it has no output queue and drops what reaches `output()`.

mod hierarchy;
mod lifecycle;
mod snapshot;
mod state;
mod task;

pub use snapshot::NodeSnapshot;
pub use state::State;
pub use task::{NodeTask, StopSignal};

use crate::config::{RelayConfig, ThreadRole, ThreadSettings};
use crate::context::Context;
use crate::events::{EventBus, Lifecycle, ListenerId};
use crate::queue::{ChunkHandler, QueueProcessor};
use hierarchy::Clients;
use parking_lot::{Condvar, Mutex};
use state::AtomicState;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use task::RunningTask;

/// Payload carried between nodes. Cloned once per child on fan-out.
pub trait Chunk: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Chunk for T {}

struct Routing<C> {
    input_handler: Option<ChunkHandler<C>>,
    output_handler: Option<ChunkHandler<C>>,
    input_queue: Option<QueueProcessor<C>>,
    output_queue: Option<QueueProcessor<C>>,
}

impl<C> Default for Routing<C> {
    fn default() -> Self {
        Self {
            input_handler: None,
            output_handler: None,
            input_queue: None,
            output_queue: None,
        }
    }
}

pub(crate) struct Core<C> {
    id: String,
    threads: ThreadSettings,
    state: AtomicState,
    principally_client: AtomicBool,
    parent: Mutex<Option<Weak<Core<C>>>>,
    /// Held through `add_client`/`remove_client`, including the start or stop
    /// they cause. Only ever acquired child before parent.
    attach: Mutex<()>,
    clients: Mutex<Clients<C>>,
    task: Mutex<Option<NodeTask>>,
    running_task: Mutex<Option<RunningTask>>,
    routing: Mutex<Routing<C>>,
    context: Mutex<Option<Context>>,
    events: EventBus<Lifecycle>,
    /// Incremented under this lock together with the store of `Stopped`.
    stops: Mutex<u64>,
    stopped: Condvar,
}

/// Handle to a node in the hierarchy.
pub struct Node<C> {
    core: Arc<Core<C>>,
}

impl<C> Clone for Node<C> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<C> fmt::Debug for Node<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.core.id)
            .field("state", &self.core.state.load())
            .field(
                "principally_client",
                &self.core.principally_client.load(Ordering::SeqCst),
            )
            .finish()
    }
}

/// Non-owning handle, for tasks and handlers that refer back to their node.
pub struct WeakNode<C> {
    core: Weak<Core<C>>,
}

impl<C> Clone for WeakNode<C> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<C> WeakNode<C> {
    pub fn upgrade(&self) -> Option<Node<C>> {
        self.core.upgrade().map(|core| Node { core })
    }
}

/// The node contract, for types that embed a [`Node`].
///
/// Implementors only provide [`node`](Relay::node); everything else forwards
/// to the embedded node, so a wrapper can be attached, detached and driven
/// exactly like a bare node.
pub trait Relay<C: Chunk>: Send + Sync {
    fn node(&self) -> &Node<C>;

    fn start(&self) {
        self.node().start()
    }

    fn stop(&self) {
        self.node().stop()
    }

    fn wait(&self) {
        self.node().wait()
    }

    fn add_client(&self, client: &dyn Relay<C>) {
        self.node().add_client(client)
    }

    fn remove_client(&self, client: &dyn Relay<C>) {
        self.node().remove_client(client)
    }

    fn output(&self, chunk: C) {
        self.node().output(chunk)
    }

    fn is_running(&self) -> bool {
        self.node().is_running()
    }

    fn is_stopping(&self) -> bool {
        self.node().is_stopping()
    }
}

impl<C: Chunk> Relay<C> for Node<C> {
    fn node(&self) -> &Node<C> {
        self
    }
}

impl<C: Chunk> Node<C> {
    /// Creates an inert, server-like node with default thread settings.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_threads(id, ThreadSettings::default())
    }

    /// Creates an inert node that spawns threads per `config`.
    pub fn with_config(id: impl Into<String>, config: &RelayConfig) -> Self {
        Self::with_threads(id, config.threads.clone())
    }

    /// Creates an inert, principally-client node.
    pub fn client(id: impl Into<String>) -> Self {
        let node = Self::new(id);
        node.set_principally_client(true);
        node
    }

    fn with_threads(id: impl Into<String>, threads: ThreadSettings) -> Self {
        Self {
            core: Arc::new(Core {
                id: id.into(),
                threads,
                state: AtomicState::default(),
                principally_client: AtomicBool::new(false),
                parent: Mutex::new(None),
                attach: Mutex::new(()),
                clients: Mutex::new(Clients::default()),
                task: Mutex::new(None),
                running_task: Mutex::new(None),
                routing: Mutex::new(Routing::default()),
                context: Mutex::new(None),
                events: EventBus::new(),
                stops: Mutex::new(0),
                stopped: Condvar::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.core.id
    }

    pub fn downgrade(&self) -> WeakNode<C> {
        WeakNode {
            core: Arc::downgrade(&self.core),
        }
    }

    /// Whether both handles refer to the same node.
    pub fn same_node(&self, other: &Node<C>) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    // ── Configuration ──

    /// Chooses the lifecycle policy. Meant to be set once, right after
    /// construction, before the node is attached anywhere.
    pub fn set_principally_client(&self, principally_client: bool) {
        self.core
            .principally_client
            .store(principally_client, Ordering::SeqCst);
    }

    pub fn is_principally_client(&self) -> bool {
        self.core.principally_client.load(Ordering::SeqCst)
    }

    /// Sets the background task run between `start()` and `stop()`.
    /// Takes effect on the next start.
    pub fn set_task(&self, task: impl Fn(StopSignal) + Send + Sync + 'static) {
        *self.core.task.lock() = Some(Arc::new(task));
    }

    /// Sets the input handler. Takes effect when the input queue is next
    /// created, i.e. before the first chunk or after the node next stops.
    pub fn set_input_handler(&self, handler: impl Fn(C) + Send + Sync + 'static) {
        self.core.routing.lock().input_handler = Some(Arc::new(handler));
    }

    /// Sets the output handler. Same timing rules as the input handler.
    pub fn set_output_handler(&self, handler: impl Fn(C) + Send + Sync + 'static) {
        self.core.routing.lock().output_handler = Some(Arc::new(handler));
    }

    pub fn set_context(&self, ctx: Context) {
        *self.core.context.lock() = Some(ctx);
    }

    pub fn context(&self) -> Option<Context> {
        self.core.context.lock().clone()
    }

    // ── State ──

    pub fn state(&self) -> State {
        self.core.state.load()
    }

    pub fn is_running(&self) -> bool {
        self.state() == State::Running
    }

    pub fn is_stopping(&self) -> bool {
        self.state() == State::Stopping
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == State::Stopped
    }

    // ── Lifecycle events ──

    /// Registers a persistent listener for a lifecycle event.
    pub fn on(
        &self,
        event: Lifecycle,
        callback: impl Fn(Lifecycle) + Send + Sync + 'static,
    ) -> ListenerId {
        self.core.events.on(event, callback)
    }

    /// Registers a listener for the next occurrence of a lifecycle event.
    pub fn once(
        &self,
        event: Lifecycle,
        callback: impl Fn(Lifecycle) + Send + Sync + 'static,
    ) -> ListenerId {
        self.core.events.once(event, callback)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.core.events.off(id)
    }

    // ── Routing ──

    /// Queues a chunk on this node's input side. Dropped unless Running.
    pub(crate) fn input(&self, chunk: C) {
        let mut routing = self.core.routing.lock();
        if !self.is_running() {
            return;
        }
        self.prepare_input(&mut routing).put(chunk);
    }

    /// Queues a chunk on this node's output side. Dropped unless Running,
    /// and dropped by a principally-client node without an output handler.
    pub fn output(&self, chunk: C) {
        let mut routing = self.core.routing.lock();
        if !self.is_running() {
            return;
        }
        if let Some(queue) = self.prepare_output(&mut routing) {
            queue.put(chunk);
        }
    }

    fn prepare_input(&self, routing: &mut Routing<C>) -> QueueProcessor<C> {
        if let Some(queue) = &routing.input_queue {
            return queue.clone();
        }

        if routing.input_handler.is_none() {
            let weak = self.downgrade();
            let forward: ChunkHandler<C> = Arc::new(move |chunk: C| {
                if let Some(node) = weak.upgrade() {
                    node.output(chunk);
                }
            });
            routing.input_handler = Some(forward);
        }
        let queue = QueueProcessor::with_threads(
            routing.input_handler.clone(),
            self.core.threads.clone(),
            self.core.id.clone(),
            ThreadRole::InputWorker,
        );
        routing.input_queue = Some(queue.clone());
        queue
    }

    fn prepare_output(&self, routing: &mut Routing<C>) -> Option<QueueProcessor<C>> {
        if let Some(queue) = &routing.output_queue {
            return Some(queue.clone());
        }
        if self.is_principally_client() && routing.output_handler.is_none() {
            return None;
        }

        if routing.output_handler.is_none() {
            let weak = self.downgrade();
            let fan_out: ChunkHandler<C> = Arc::new(move |chunk: C| {
                if let Some(node) = weak.upgrade() {
                    for client in node.clients() {
                        client.input(chunk.clone());
                    }
                }
            });
            routing.output_handler = Some(fan_out);
        }
        let queue = QueueProcessor::with_threads(
            routing.output_handler.clone(),
            self.core.threads.clone(),
            self.core.id.clone(),
            ThreadRole::OutputWorker,
        );
        routing.output_queue = Some(queue.clone());
        Some(queue)
    }

    pub(crate) fn has_input_queue(&self) -> bool {
        self.core.routing.lock().input_queue.is_some()
    }

    pub(crate) fn has_output_queue(&self) -> bool {
        self.core.routing.lock().output_queue.is_some()
    }
}
