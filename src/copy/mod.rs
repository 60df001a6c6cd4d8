//! Copy buttons.
//!
//! Buttons are injected into content blocks (and rendered diagrams) once,
//! tagged so later scans and the serializer skip them. What a button copies
//! lives in a side table keyed by the button's [`NodeId`], never on the
//! button itself.

mod clipboard;

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, trace};
use web_time::Instant;

pub use clipboard::{Clipboard, MemoryClipboard};
#[cfg(feature = "clipboard")]
pub use clipboard::SystemClipboard;

use crate::classify::visible_text;
use crate::config::{Config, CopyButtonPlacement};
use crate::dom::{ContentTree, NodeId};
use crate::error::{Error, Result};
use crate::markdown::{fenced_block, serialize};
use crate::markers::{BOUND_ATTR, COPIED_CLASS, COPY_BUTTON_CLASS, DIAGRAM_LANGUAGE};
use crate::scheduler::is_scan_boundary;

/// How long success feedback stays on a button.
pub const FEEDBACK_DURATION: Duration = Duration::from_secs(2);

const FLOAT_CLASS: &str = "livemark-copy-float";
const BOTTOM_CLASS: &str = "livemark-copy-bottom";
const SMART_HOVER_CLASS: &str = "livemark-smart-hover";

/// What a copy button copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyTarget {
    /// A content block, serialized to Markdown at click time.
    Block(NodeId),
    /// Diagram source, copied as a fenced block.
    Source(String),
}

/// Button side table and feedback timers.
#[derive(Debug, Default)]
pub struct CopyButtons {
    targets: HashMap<NodeId, CopyTarget>,
    feedback: HashMap<NodeId, Instant>,
}

impl CopyButtons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add buttons to every qualifying block under `root` (inclusive).
    ///
    /// A block qualifies when it is an innermost content boundary with
    /// visible text and no button yet. A block that kept its button from an
    /// earlier binding gets that button wired up again instead. Returns the
    /// number added.
    pub fn inject(&mut self, tree: &mut ContentTree, root: NodeId, config: &Config) -> usize {
        if !config.copy_button || !tree.is_attached(root) {
            return 0;
        }

        let blocks: Vec<NodeId> = std::iter::once(root)
            .chain(tree.descendants(root))
            .filter(|&id| is_scan_boundary(tree, id, config))
            .filter(|&id| {
                !tree
                    .descendants(id)
                    .any(|inner| is_scan_boundary(tree, inner, config))
            })
            .filter(|&id| !visible_text(tree, id).trim().is_empty())
            .collect();

        let mut added = 0;
        for block in blocks {
            if let Some(button) = button_of(tree, block) {
                self.adopt(tree, button, block);
                continue;
            }
            if self
                .attach(tree, block, CopyTarget::Block(block), config)
                .is_some()
            {
                added += 1;
            }
        }
        if added > 0 {
            debug!(root = root.0, added, "copy buttons injected");
        }
        added
    }

    /// Re-register a button left in the tree by an earlier binding whose
    /// side-table entry is gone.
    fn adopt(&mut self, tree: &mut ContentTree, button: NodeId, block: NodeId) {
        if self.targets.contains_key(&button) {
            return;
        }
        tree.remove_class(button, COPIED_CLASS);
        self.targets.insert(button, CopyTarget::Block(block));
        trace!(block = block.0, button = button.0, "copy button adopted");
    }

    /// Add one button to `container`. Returns `None` when buttons are
    /// disabled or the container already has one.
    pub fn attach(
        &mut self,
        tree: &mut ContentTree,
        container: NodeId,
        target: CopyTarget,
        config: &Config,
    ) -> Option<NodeId> {
        if !config.copy_button || button_of(tree, container).is_some() {
            return None;
        }

        let placement = match config.copy_button_placement {
            CopyButtonPlacement::Float => FLOAT_CLASS,
            CopyButtonPlacement::Bottom => BOTTOM_CLASS,
        };
        let mut class = format!("{COPY_BUTTON_CLASS} {placement}");
        if config.copy_button_smart_hover {
            class.push(' ');
            class.push_str(SMART_HOVER_CLASS);
        }

        let button = tree.element(
            "button",
            &[
                ("class", class.as_str()),
                ("type", "button"),
                (BOUND_ATTR, ""),
                ("title", "Copy as Markdown"),
            ],
        );
        tree.append_text(button, config.copy_button_label());

        match config.copy_button_placement {
            CopyButtonPlacement::Float => tree.prepend(container, button),
            CopyButtonPlacement::Bottom => tree.append(container, button),
        }

        trace!(container = container.0, button = button.0, "copy button attached");
        self.targets.insert(button, target);
        Some(button)
    }

    /// Copy what `button` points at and show success feedback.
    ///
    /// Returns whether feedback was newly shown; a click while feedback is
    /// still visible copies again but does not stack it.
    pub fn click(
        &mut self,
        tree: &mut ContentTree,
        button: NodeId,
        clipboard: &mut dyn Clipboard,
        now: Instant,
    ) -> Result<bool> {
        let text = match self.targets.get(&button) {
            Some(CopyTarget::Block(block)) => {
                if !tree.is_attached(*block) {
                    return Err(Error::StaleContentRace { node: block.0 });
                }
                serialize(tree, *block)
            }
            Some(CopyTarget::Source(source)) => fenced_block(Some(DIAGRAM_LANGUAGE), source),
            None => {
                return Err(Error::Clipboard(format!(
                    "node {} is not a copy button",
                    button.0
                )));
            }
        };

        clipboard.write_text(&text)?;
        debug!(button = button.0, bytes = text.len(), "copied");

        if self.feedback.contains_key(&button) {
            return Ok(false);
        }
        tree.add_class(button, COPIED_CLASS);
        self.feedback.insert(button, now);
        Ok(true)
    }

    /// Clear feedback shown for at least [`FEEDBACK_DURATION`]. Returns the
    /// number cleared.
    pub fn expire(&mut self, tree: &mut ContentTree, now: Instant) -> usize {
        let due: Vec<NodeId> = self
            .feedback
            .iter()
            .filter(|&(_, &shown)| now.duration_since(shown) >= FEEDBACK_DURATION)
            .map(|(&button, _)| button)
            .collect();

        for button in &due {
            self.feedback.remove(button);
            tree.remove_class(*button, COPIED_CLASS);
        }
        due.len()
    }

    pub fn is_showing_feedback(&self, button: NodeId) -> bool {
        self.feedback.contains_key(&button)
    }

    pub fn target(&self, button: NodeId) -> Option<&CopyTarget> {
        self.targets.get(&button)
    }

    /// Drop buttons that are no longer in the document.
    pub fn evict_detached(&mut self, tree: &ContentTree) -> usize {
        let before = self.targets.len();
        self.targets.retain(|&button, _| tree.is_attached(button));
        self.feedback.retain(|&button, _| tree.is_attached(button));
        before - self.targets.len()
    }

    pub fn clear(&mut self) {
        self.targets.clear();
        self.feedback.clear();
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// The copy button directly inside `container`, if any.
pub fn button_of(tree: &ContentTree, container: NodeId) -> Option<NodeId> {
    tree.children(container)
        .find(|&child| tree.has_attr(child, BOUND_ATTR) && tree.has_class(child, COPY_BUTTON_CLASS))
}
