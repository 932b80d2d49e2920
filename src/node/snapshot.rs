use super::{Chunk, Node, State};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Serializable view of a node and its subtree at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: String,
    pub state: State,
    pub principally_client: bool,
    pub has_input_queue: bool,
    pub has_output_queue: bool,
    pub clients: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// Pretty-printed JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of nodes in this subtree, including the root.
    pub fn node_count(&self) -> usize {
        1 + self.clients.iter().map(NodeSnapshot::node_count).sum::<usize>()
    }

    /// Depth-first search for a node by id.
    pub fn find(&self, id: &str) -> Option<&NodeSnapshot> {
        if self.id == id {
            return Some(self);
        }
        self.clients.iter().find_map(|client| client.find(id))
    }
}

impl<C: Chunk> Node<C> {
    /// Captures this node and, recursively, its clients.
    ///
    /// Each node is read under its own locks in turn, so a tree that is
    /// changing concurrently may be captured partly before and partly after
    /// the change.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id().to_string(),
            state: self.state(),
            principally_client: self.is_principally_client(),
            has_input_queue: self.has_input_queue(),
            has_output_queue: self.has_output_queue(),
            clients: self.clients().iter().map(Node::snapshot).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_of_tree() {
        let root: Node<u32> = Node::new("root");
        let relay: Node<u32> = Node::new("relay");
        let leaf: Node<u32> = Node::client("leaf");
        relay.add_client(&leaf);
        root.add_client(&relay);

        let snap = root.snapshot();
        assert_eq!(snap.node_count(), 3);
        assert_eq!(snap.state, State::Running);
        let leaf_snap = snap.find("leaf").unwrap();
        assert!(leaf_snap.principally_client);
        assert!(leaf_snap.clients.is_empty());
        assert!(snap.find("missing").is_none());

        root.stop();
        let snap = root.snapshot();
        assert_eq!(snap.state, State::Stopped);
        assert_eq!(snap.node_count(), 1);
        assert!(!snap.has_input_queue);
        assert!(!snap.has_output_queue);
    }

    #[test]
    fn test_snapshot_json() {
        let node: Node<u32> = Node::new("solo");
        let json = node.snapshot().to_json().unwrap();
        assert!(json.contains("\"id\": \"solo\""));
        assert!(json.contains("\"state\": \"stopped\""));

        let parsed: NodeSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, node.snapshot());
    }
}
