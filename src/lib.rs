//! # relay-hierarchy: server/client relay trees
//!
//! Nodes form a tree. Each node can run a background task, receives chunks on
//! its input side, and relays them through its output side to every attached
//! client. Attaching a client starts it (and a server-like parent); detaching
//! or stopping a node stops its whole subtree.
//!
//! ## Architecture
//!
//! - **Node**: Lifecycle state machine, client list, chunk routing ([`node`])
//! - **Queue processor**: FIFO hand-off to a handler on an on-demand worker thread ([`queue`])
//! - **Events**: Synchronous `start`/`stop` announcements ([`events`])
//! - **Context**: Cancellation signal propagated down the tree ([`context`])
//! - **Communication**: Crossbeam channels for queues, stop signals and cancellation
//!
//! ## Configuration
//!
//! Thread naming and stack sizes come from [`RelayConfig`], loaded from
//! `relay.toml` (or any `.json`/`.toml` path) in the platform config directory
//! under `relay-hierarchy`.
//!
//! ## Example
//!
//! ```no_run
//! use relay_hierarchy::{Node, StopSignal};
//! use std::time::Duration;
//!
//! let source: Node<u64> = Node::new("source");
//! let sink: Node<u64> = Node::client("sink");
//! sink.set_input_handler(|n| println!("got {n}"));
//!
//! let weak = source.downgrade();
//! source.set_task(move |stop: StopSignal| {
//!     let mut n = 0;
//!     while !stop.wait_timeout(Duration::from_millis(10)) {
//!         if let Some(source) = weak.upgrade() {
//!             source.output(n);
//!         }
//!         n += 1;
//!     }
//! });
//!
//! source.add_client(&sink);
//! std::thread::sleep(Duration::from_millis(100));
//! source.stop();
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod node;
pub mod queue;

// Re-export commonly used types
pub use config::{RelayConfig, ThreadRole, ThreadSettings};
pub use context::Context;
pub use error::{RelayError, Result, ResultExt};
pub use events::{EventBus, Lifecycle, ListenerId};
pub use node::{Chunk, Node, NodeSnapshot, NodeTask, Relay, State, StopSignal, WeakNode};
pub use queue::{ChunkHandler, QueueProcessor};
