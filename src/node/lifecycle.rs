//! Start/stop state machine, stop latch and context watching.

use super::task::{RunningTask, TaskExit};
use super::{Chunk, Node, State, StopSignal};
use crate::config::ThreadRole;
use crate::context::Context;
use crate::events::Lifecycle;
use crossbeam_channel::select;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

impl<C: Chunk> Node<C> {
    /// Brings the node from `Stopped` to `Running`, spawning its task if one
    /// is configured. No-op in any other state.
    pub fn start(&self) {
        if !self.core.state.transition(State::Stopped, State::Starting) {
            return;
        }
        debug!(node = %self.id(), "Node starting");

        let task = self.core.task.lock().clone();
        if let Some(task) = task {
            match RunningTask::spawn(task, &self.core.threads, &self.core.id) {
                Ok(running) => *self.core.running_task.lock() = Some(running),
                Err(e) => {
                    error!(node = %self.id(), "Failed to start node task: {}", e);
                    self.mark_stopped();
                    return;
                }
            }
        }

        self.core.state.store(State::Running);
        if let Some(running) = self.core.running_task.lock().as_mut() {
            running.release();
        }
        debug!(node = %self.id(), "Node running");
        self.core.events.trigger(Lifecycle::Start);
    }

    /// Brings the node from `Running` to `Stopped`. No-op in any other state.
    ///
    /// In order: stops and joins the task, drains this subtree's queues,
    /// detaches (and so stops) every client, and detaches from the parent.
    pub fn stop(&self) {
        if !self.core.state.transition(State::Running, State::Stopping) {
            return;
        }
        debug!(node = %self.id(), "Node stopping");

        let running = self.core.running_task.lock().take();
        if let Some(running) = running {
            match running.stop_and_join() {
                TaskExit::Returned => {}
                TaskExit::Panicked => error!(node = %self.id(), "Node task panicked"),
                TaskExit::Detached => {
                    debug!(node = %self.id(), "Stopped from its own task, not joining")
                }
            }
        }

        self.flush_queues();
        self.remove_all_clients();
        if let Some(parent) = self.parent() {
            parent.remove_client(self);
        }

        self.mark_stopped();
        debug!(node = %self.id(), "Node stopped");
        self.core.events.trigger(Lifecycle::Stop);
    }

    /// Returns at once if the node is stopped, otherwise blocks until it next
    /// reaches `Stopped`.
    pub fn wait(&self) {
        let mut stops = self.core.stops.lock();
        if self.is_stopped() {
            return;
        }
        let seen = *stops;
        while *stops == seen {
            self.core.stopped.wait(&mut stops);
        }
    }

    /// Like [`wait`](Node::wait), giving up after `timeout`.
    /// Returns `true` if the node is (or became) stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stops = self.core.stops.lock();
        if self.is_stopped() {
            return true;
        }
        let seen = *stops;
        while *stops == seen {
            if self.core.stopped.wait_until(&mut stops, deadline).timed_out() {
                return *stops != seen;
            }
        }
        true
    }

    /// Stores `Stopped` and releases every `wait` in progress.
    fn mark_stopped(&self) {
        let mut stops = self.core.stops.lock();
        self.core.state.store(State::Stopped);
        *stops += 1;
        self.core.stopped.notify_all();
    }

    /// Blocks until both queues of this node and of every descendant are
    /// drained, then drops them.
    pub(crate) fn flush_queues(&self) {
        let input = self.core.routing.lock().input_queue.clone();
        if let Some(queue) = input {
            queue.wait();
        }
        self.core.routing.lock().input_queue = None;

        let output = self.core.routing.lock().output_queue.clone();
        if let Some(queue) = output {
            queue.wait();
        }
        self.core.routing.lock().output_queue = None;

        for client in self.clients() {
            client.flush_queues();
        }
    }

    /// Makes `ctx` this node's context and replaces its task with one that
    /// stops the node when `ctx` is cancelled.
    pub fn watch_context(&self, ctx: Context) {
        self.set_context(ctx.clone());

        let weak = self.downgrade();
        let threads = self.core.threads.clone();
        let id = self.core.id.clone();
        self.set_task(move |stop: StopSignal| {
            select! {
                recv(ctx.done()) -> _ => {
                    debug!(node = %id, "Context cancelled");
                    let target = weak.clone();
                    let spawned = threads
                        .builder(&id, ThreadRole::ContextWatcher)
                        .spawn(move || {
                            if let Some(node) = target.upgrade() {
                                node.stop();
                            }
                        });
                    match spawned {
                        Ok(_) => stop.wait(),
                        Err(e) => {
                            warn!(node = %id, "Stopping inline, watcher spawn failed: {}", e);
                            if let Some(node) = weak.upgrade() {
                                node.stop();
                            }
                        }
                    }
                }
                recv(stop.receiver()) -> _ => {}
            }
        });
    }
}
