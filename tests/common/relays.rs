//! Types that embed a node and take part in the hierarchy through `Relay`

use super::Recorder;
use relay_hierarchy::{Node, Relay};

/// Client that records every chunk reaching its input
pub struct RecordingSink {
    node: Node<String>,
    pub received: Recorder<String>,
}

impl RecordingSink {
    pub fn new(id: &str) -> Self {
        let node = Node::client(id);
        let received = Recorder::new();
        node.set_input_handler(received.handler());
        Self { node, received }
    }
}

impl Relay<String> for RecordingSink {
    fn node(&self) -> &Node<String> {
        &self.node
    }
}

/// Server that upper-cases everything passing through it
pub struct Shouter {
    node: Node<String>,
}

impl Shouter {
    pub fn new(id: &str) -> Self {
        let node: Node<String> = Node::new(id);
        let weak = node.downgrade();
        node.set_input_handler(move |chunk: String| {
            if let Some(node) = weak.upgrade() {
                node.output(chunk.to_uppercase());
            }
        });
        Self { node }
    }
}

impl Relay<String> for Shouter {
    fn node(&self) -> &Node<String> {
        &self.node
    }
}
