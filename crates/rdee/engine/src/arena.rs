//! Node arena for one branch.
//!
//! Holds the chain of surviving ancestors of the node being explored. Nodes
//! are addressed by [`NodeId`] (their stack index), so parent links never
//! own anything, and a finished subtree is released by popping.

use rdee_types::{ExistenceNode, NodeId};

#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<ExistenceNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: ExistenceNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn pop(&mut self) -> Option<ExistenceNode> {
        self.nodes.pop()
    }

    pub fn get(&self, id: NodeId) -> Option<&ExistenceNode> {
        self.nodes.get(id.index())
    }

    /// Id of the innermost ancestor, i.e. the parent of the next node.
    pub fn last_id(&self) -> Option<NodeId> {
        self.nodes.len().checked_sub(1).map(|i| NodeId(i as u32))
    }

    pub fn last(&self) -> Option<&ExistenceNode> {
        self.nodes.last()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
