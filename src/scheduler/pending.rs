use std::collections::HashSet;

use crate::dom::NodeId;

/// Insertion-ordered, deduplicated set of scan roots awaiting a flush.
#[derive(Debug, Default, Clone)]
pub struct PendingScanSet {
    order: Vec<NodeId>,
    members: HashSet<NodeId>,
}

impl PendingScanSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `root`. Returns `false` if it was already queued.
    pub fn insert(&mut self, root: NodeId) -> bool {
        if !self.members.insert(root) {
            return false;
        }
        self.order.push(root);
        true
    }

    pub fn contains(&self, root: NodeId) -> bool {
        self.members.contains(&root)
    }

    /// Take every queued root in insertion order, leaving the set empty.
    pub fn drain(&mut self) -> Vec<NodeId> {
        self.members.clear();
        std::mem::take(&mut self.order)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
