//! Per-node render state side table.
//!
//! Renderers never annotate host nodes with their own bookkeeping; they key
//! it by [`NodeId`] here instead. Entries for nodes that have left the tree
//! are evicted at the end of every flush.

use std::collections::HashMap;

use crate::dom::{ContentTree, NodeId};

/// Lifecycle of one math root or diagram node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Unrendered,
    Rendering,
    Rendered,
    Errored,
}

#[derive(Debug, Clone, Default)]
struct Entry {
    state: RenderState,
    last_source: Option<String>,
    last_errored_source: Option<String>,
}

/// Render state for a set of nodes.
#[derive(Debug, Default)]
pub struct RenderStates {
    entries: HashMap<NodeId, Entry>,
}

impl RenderStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `id` given its current source.
    ///
    /// A Rendered node whose source no longer matches the one it was
    /// rendered from drops back to Unrendered.
    pub fn status(&mut self, id: NodeId, source: &str) -> RenderState {
        let Some(entry) = self.entries.get_mut(&id) else {
            return RenderState::Unrendered;
        };
        if entry.state == RenderState::Rendered && entry.last_source.as_deref() != Some(source) {
            entry.state = RenderState::Unrendered;
        }
        entry.state
    }

    /// State without the source check.
    pub fn state(&self, id: NodeId) -> RenderState {
        self.entries
            .get(&id)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    /// The source a render last failed on, if any.
    pub fn last_errored_source(&self, id: NodeId) -> Option<&str> {
        self.entries
            .get(&id)
            .and_then(|entry| entry.last_errored_source.as_deref())
    }

    /// The source of the last successful render, if any.
    pub fn last_source(&self, id: NodeId) -> Option<&str> {
        self.entries
            .get(&id)
            .and_then(|entry| entry.last_source.as_deref())
    }

    /// Claim `id` for a render. Returns `false` when a render is already in
    /// progress.
    pub fn begin(&mut self, id: NodeId) -> bool {
        let entry = self.entries.entry(id).or_default();
        if entry.state == RenderState::Rendering {
            return false;
        }
        entry.state = RenderState::Rendering;
        true
    }

    pub fn finish_rendered(&mut self, id: NodeId, source: impl Into<String>) {
        let entry = self.entries.entry(id).or_default();
        entry.state = RenderState::Rendered;
        entry.last_source = Some(source.into());
        entry.last_errored_source = None;
    }

    pub fn finish_errored(&mut self, id: NodeId, source: impl Into<String>) {
        let entry = self.entries.entry(id).or_default();
        entry.state = RenderState::Errored;
        entry.last_errored_source = Some(source.into());
    }

    /// Release a claim without recording an outcome.
    pub fn reset(&mut self, id: NodeId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.state = RenderState::Unrendered;
        }
    }

    /// Drop entries whose node is no longer in the document. Nodes that are
    /// mid-render are kept; their renderer discards the result itself.
    pub fn evict_detached(&mut self, tree: &ContentTree) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|&id, entry| entry.state == RenderState::Rendering || tree.is_attached(id));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
