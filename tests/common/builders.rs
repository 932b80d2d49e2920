//! Test data builders for creating test nodes

use relay_hierarchy::{Chunk, Context, Node, RelayConfig, StopSignal};
use std::time::Duration;

/// Builder for creating test Nodes
pub struct NodeBuilder<C: Chunk> {
    id: String,
    principally_client: bool,
    config: Option<RelayConfig>,
    input_handler: Option<Box<dyn Fn(C) + Send + Sync>>,
    output_handler: Option<Box<dyn Fn(C) + Send + Sync>>,
    context: Option<Context>,
}

impl<C: Chunk> NodeBuilder<C> {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            principally_client: false,
            config: None,
            input_handler: None,
            output_handler: None,
            context: None,
        }
    }

    pub fn client(mut self) -> Self {
        self.principally_client = true;
        self
    }

    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn input_handler(mut self, handler: impl Fn(C) + Send + Sync + 'static) -> Self {
        self.input_handler = Some(Box::new(handler));
        self
    }

    pub fn output_handler(mut self, handler: impl Fn(C) + Send + Sync + 'static) -> Self {
        self.output_handler = Some(Box::new(handler));
        self
    }

    pub fn context(mut self, ctx: Context) -> Self {
        self.context = Some(ctx);
        self
    }

    pub fn build(self) -> Node<C> {
        let node = match &self.config {
            Some(config) => Node::with_config(self.id, config),
            None => Node::new(self.id),
        };
        node.set_principally_client(self.principally_client);
        if let Some(handler) = self.input_handler {
            node.set_input_handler(handler);
        }
        if let Some(handler) = self.output_handler {
            node.set_output_handler(handler);
        }
        if let Some(ctx) = self.context {
            node.set_context(ctx);
        }
        node
    }
}

/// Installs a task that outputs `start`, `start + 1`, ... every `interval`
pub fn feed_counter(node: &Node<i64>, start: i64, interval: Duration) {
    let weak = node.downgrade();
    node.set_task(move |stop: StopSignal| {
        let mut value = start;
        loop {
            if let Some(node) = weak.upgrade() {
                node.output(value);
            }
            value += 1;
            if stop.wait_timeout(interval) {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_builder() {
        let node: Node<u32> = NodeBuilder::new("test").client().build();

        assert_eq!(node.id(), "test");
        assert!(node.is_principally_client());
        assert!(node.is_stopped());
    }
}
