//! Mutation records and observer bookkeeping for [`ContentTree`].
//!
//! Mirrors the shape of a browser `MutationObserver` subscribed with
//! `{ childList: true, characterData: true, subtree: true }`: every observer
//! watches one subtree and accumulates records until they are taken.
//!
//! [`ContentTree`]: super::ContentTree

use super::arena::NodeId;

/// Handle for a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u32);

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were added to or removed from the target.
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// The target text node's payload changed.
    CharacterData,
}

/// A single observed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Node the change happened on (the parent for child-list changes).
    pub target: NodeId,
    pub kind: MutationKind,
}

impl MutationRecord {
    pub fn added(target: NodeId, node: NodeId) -> Self {
        Self {
            target,
            kind: MutationKind::ChildList {
                added: vec![node],
                removed: Vec::new(),
            },
        }
    }

    pub fn removed(target: NodeId, node: NodeId) -> Self {
        Self {
            target,
            kind: MutationKind::ChildList {
                added: Vec::new(),
                removed: vec![node],
            },
        }
    }

    pub fn character_data(target: NodeId) -> Self {
        Self {
            target,
            kind: MutationKind::CharacterData,
        }
    }

    /// Nodes this record added, if any.
    pub fn added_nodes(&self) -> &[NodeId] {
        match &self.kind {
            MutationKind::ChildList { added, .. } => added,
            MutationKind::CharacterData => &[],
        }
    }
}

#[derive(Debug)]
struct Slot {
    id: ObserverId,
    root: NodeId,
    records: Vec<MutationRecord>,
}

/// Registered observers and their pending records.
#[derive(Debug, Default)]
pub(crate) struct Observers {
    next_id: u32,
    slots: Vec<Slot>,
}

impl Observers {
    pub(crate) fn register(&mut self, root: NodeId) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.slots.push(Slot {
            id,
            root,
            records: Vec::new(),
        });
        id
    }

    pub(crate) fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.id != id);
        self.slots.len() != before
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Observed roots, in registration order.
    pub(crate) fn roots(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.slots.iter().enumerate().map(|(i, s)| (i, s.root))
    }

    pub(crate) fn push(&mut self, slot: usize, record: MutationRecord) {
        if let Some(slot) = self.slots.get_mut(slot) {
            slot.records.push(record);
        }
    }

    pub(crate) fn take(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.slots
            .iter_mut()
            .find(|slot| slot.id == id)
            .map(|slot| std::mem::take(&mut slot.records))
            .unwrap_or_default()
    }

    pub(crate) fn is_registered(&self, id: ObserverId) -> bool {
        self.slots.iter().any(|slot| slot.id == id)
    }
}
