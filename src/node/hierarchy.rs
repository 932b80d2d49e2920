//! Attaching and detaching clients.
//!
//! `add_client` and `remove_client` on one node are serialized by that node's
//! attach lock, held through the start or stop they cause, so a server-like
//! node is running exactly while it has clients. Calls down the tree never
//! take another node's attach lock; only a stopping node detaching from its
//! parent does, so attach locks are always acquired child before parent.
//!
//! The client list itself sits under a separate lock that is never held
//! across calls into another node. A bulk detach marks the list
//! [`Phase::Detaching`] so that children stopping in response do not try to
//! remove themselves from a list that is already being emptied.

use super::{Chunk, Node, Relay};
use std::mem;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Detaching,
}

pub(crate) struct Clients<C> {
    phase: Phase,
    list: Vec<Node<C>>,
}

impl<C> Default for Clients<C> {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            list: Vec::new(),
        }
    }
}

impl<C: Chunk> Node<C> {
    /// Attaches `client` below this node.
    ///
    /// The client inherits this node's context and starts; a server-like node
    /// starts itself as well. A client attached elsewhere is moved here.
    /// Attaching a node to itself or to one of its descendants is refused.
    pub fn add_client(&self, client: &dyn Relay<C>) {
        let child = client.node();
        if self.same_node(child) || self.has_ancestor(child) {
            warn!(
                node = %self.id(),
                client = %child.id(),
                "Refusing to attach a node below itself"
            );
            return;
        }

        if let Some(previous) = child.parent() {
            if previous.same_node(self) {
                return;
            }
            debug!(client = %child.id(), from = %previous.id(), to = %self.id(), "Moving client");
            previous.remove_client(child);
        }

        let _attach = self.core.attach.lock();
        {
            let mut clients = self.core.clients.lock();
            if clients.list.iter().any(|c| c.same_node(child)) {
                return;
            }
            clients.list.push(child.clone());
        }
        debug!(node = %self.id(), client = %child.id(), "Client attached");

        if let Some(ctx) = self.context() {
            child.set_context(ctx);
        }
        child.set_parent(Some(self));
        if !self.has_client(child) {
            // A concurrent bulk detach took the child before it started.
            child.set_parent(None);
            return;
        }
        if !self.is_principally_client() {
            self.start();
        }
    }

    /// Detaches `client`, stopping its subtree. A server-like node left
    /// without clients stops. Unknown clients are ignored.
    pub fn remove_client(&self, client: &dyn Relay<C>) {
        let child = client.node();
        let _attach = self.core.attach.lock();
        let (removed, now_empty) = {
            let mut clients = self.core.clients.lock();
            if clients.phase == Phase::Detaching {
                return;
            }
            let Some(index) = clients.list.iter().position(|c| c.same_node(child)) else {
                return;
            };
            let removed = clients.list.remove(index);
            (removed, clients.list.is_empty())
        };
        debug!(node = %self.id(), client = %removed.id(), "Client detached");

        removed.set_parent(None);
        if now_empty && !self.is_principally_client() {
            self.stop();
        }
    }

    /// Detaches every client. A server-like node then stops.
    pub(crate) fn remove_all_clients(&self) {
        let children = {
            let mut clients = self.core.clients.lock();
            if clients.phase == Phase::Detaching || clients.list.is_empty() {
                return;
            }
            clients.phase = Phase::Detaching;
            mem::take(&mut clients.list)
        };
        debug!(node = %self.id(), count = children.len(), "Detaching all clients");

        for child in &children {
            child.set_parent(None);
        }
        if !self.is_principally_client() {
            self.stop();
        }

        self.core.clients.lock().phase = Phase::Idle;
    }

    /// Records the parent side of an attachment. `None` detaches this node's
    /// own clients and stops it; `Some` starts it.
    ///
    /// The parent link is cleared before the teardown, so the resulting stop
    /// never calls back into the parent that is detaching this node.
    pub(crate) fn set_parent(&self, parent: Option<&Node<C>>) {
        *self.core.parent.lock() = parent.map(|p| Arc::downgrade(&p.core));
        match parent {
            Some(_) => self.start(),
            None => {
                self.remove_all_clients();
                self.stop();
            }
        }
    }

    /// The attached clients, in attach order.
    pub fn clients(&self) -> Vec<Node<C>> {
        self.core.clients.lock().list.clone()
    }

    pub fn has_client(&self, client: &Node<C>) -> bool {
        self.core.clients.lock().list.iter().any(|c| c.same_node(client))
    }

    pub fn client_count(&self) -> usize {
        self.core.clients.lock().list.len()
    }

    pub fn parent(&self) -> Option<Node<C>> {
        self.core
            .parent
            .lock()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|core| Node { core })
    }

    pub fn has_parent(&self) -> bool {
        self.parent().is_some()
    }

    fn has_ancestor(&self, other: &Node<C>) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if node.same_node(other) {
                return true;
            }
            current = node.parent();
        }
        false
    }
}
