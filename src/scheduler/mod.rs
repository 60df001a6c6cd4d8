//! Change scheduler.
//!
//! The scheduler subscribes to mutations under one bound root and turns the
//! stream into coalesced render passes:
//!
//! 1. [`Scheduler::collect`] drains mutation records, resolves each changed
//!    node to its nearest scan boundary and queues that boundary once,
//!    requesting a single frame however many records arrived.
//! 2. [`Scheduler::on_frame`] (or [`Scheduler::take_frame`] plus
//!    [`Flush::run`]) flushes the queue: for every queued root still in the
//!    document it runs the math pass, the diagram pass and copy-button
//!    injection, then evicts side-table entries for detached nodes.
//! 3. [`Scheduler::sweep`] is the low-frequency safety net: a whole-root
//!    copy-button pass plus feedback expiry.
//!
//! Renderer errors never leave a flush; they are logged and counted.

mod boundary;
mod pending;

use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, trace, warn};
use web_time::Instant;

pub use boundary::{is_scan_boundary, resolve_scan_root};
pub use pending::PendingScanSet;

use crate::copy::Clipboard;
use crate::diagram::render_diagrams;
use crate::dom::{MutationKind, NodeId, ObserverId, SharedTree};
use crate::error::{Error, Result};
use crate::math::render_math;
use crate::services::Services;

/// What one flush did.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Queued roots that were still attached and got processed.
    pub roots: usize,
    pub math_spans: usize,
    pub diagrams: usize,
    pub copy_buttons: usize,
    pub errors: usize,
    /// Side-table entries dropped for detached nodes.
    pub evicted: usize,
}

/// What one sweep did.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub copy_buttons: usize,
    pub feedback_cleared: usize,
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    root: NodeId,
    observer: ObserverId,
}

/// Coalescing mutation scheduler for one bound root.
pub struct Scheduler {
    tree: SharedTree,
    services: Rc<Services>,
    binding: Option<Binding>,
    pending: PendingScanSet,
    frame_requested: bool,
    flushes: usize,
}

impl Scheduler {
    pub fn new(tree: SharedTree, services: Rc<Services>) -> Self {
        Self {
            tree,
            services,
            binding: None,
            pending: PendingScanSet::new(),
            frame_requested: false,
            flushes: 0,
        }
    }

    /// Start observing `root`, tearing down any previous binding first. The
    /// root itself is queued for an initial pass.
    pub fn bind(&mut self, root: NodeId) {
        self.unbind();

        let observer = self.tree.borrow_mut().observe(root);
        self.binding = Some(Binding { root, observer });
        self.pending.insert(root);
        self.frame_requested = true;
        debug!(root = root.0, "scheduler bound");
    }

    /// Stop observing and forget all queued work and per-node state.
    pub fn unbind(&mut self) {
        if let Some(binding) = self.binding.take() {
            self.tree.borrow_mut().disconnect(binding.observer);
            debug!(root = binding.root.0, "scheduler unbound");
        }
        self.pending.clear();
        self.frame_requested = false;
        self.services.reset_side_tables();
    }

    pub fn bound_root(&self) -> Option<NodeId> {
        self.binding.map(|binding| binding.root)
    }

    /// Drain mutation records into the pending set. Returns the number of
    /// roots newly queued.
    pub fn collect(&mut self) -> usize {
        let Some(Binding { root, observer }) = self.binding else {
            return 0;
        };

        let records = self.tree.borrow_mut().take_records(observer);
        if records.is_empty() {
            return 0;
        }

        let tree = self.tree.borrow();
        let mut queued = 0;
        for record in &records {
            let changed: &[NodeId] = match &record.kind {
                MutationKind::ChildList { added, .. } if !added.is_empty() => added,
                _ => std::slice::from_ref(&record.target),
            };
            for &node in changed {
                if !tree.is_attached(node) {
                    continue;
                }
                if let Some(scan_root) = resolve_scan_root(&tree, node, root, &self.services.config)
                    && self.pending.insert(scan_root)
                {
                    queued += 1;
                }
            }
        }
        drop(tree);

        if !self.pending.is_empty() {
            self.frame_requested = true;
        }
        trace!(records = records.len(), queued, "mutations collected");
        queued
    }

    /// Whether a flush is waiting for the next frame.
    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// Take the queued work for this frame, if a frame was requested.
    pub fn take_frame(&mut self) -> Option<Flush> {
        if !self.frame_requested {
            return None;
        }
        self.frame_requested = false;
        self.flushes += 1;

        Some(Flush {
            tree: self.tree.clone(),
            services: self.services.clone(),
            roots: self.pending.drain(),
        })
    }

    /// Flush once if a frame was requested.
    pub async fn on_frame(&mut self) -> Option<FlushReport> {
        let flush = self.take_frame()?;
        Some(flush.run().await)
    }

    /// Whole-root copy-button pass plus feedback expiry.
    pub fn sweep(&mut self, now: Instant) -> SweepReport {
        let mut tree = self.tree.borrow_mut();
        let mut buttons = self.services.copy_buttons.borrow_mut();

        let copy_buttons = match self.binding {
            Some(binding) => buttons.inject(&mut tree, binding.root, &self.services.config),
            None => 0,
        };
        SweepReport {
            copy_buttons,
            feedback_cleared: buttons.expire(&mut tree, now),
        }
    }

    /// Handle a click on a copy button.
    pub fn click(&self, button: NodeId, clipboard: &mut dyn Clipboard, now: Instant) -> Result<bool> {
        self.services
            .copy_buttons
            .borrow_mut()
            .click(&mut self.tree.borrow_mut(), button, clipboard, now)
    }

    /// Number of frames flushed so far.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn pending(&self) -> &PendingScanSet {
        &self.pending
    }

    pub fn services(&self) -> &Rc<Services> {
        &self.services
    }

    pub fn tree(&self) -> &SharedTree {
        &self.tree
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(binding) = self.binding.take()
            && let Ok(mut tree) = self.tree.try_borrow_mut()
        {
            tree.disconnect(binding.observer);
        }
    }
}

/// One frame's worth of queued roots, detached from the scheduler so the
/// scheduler stays usable while the flush awaits engines.
#[derive(Debug)]
pub struct Flush {
    tree: SharedTree,
    services: Rc<Services>,
    roots: Vec<NodeId>,
}

impl Flush {
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub async fn run(self) -> FlushReport {
        let mut report = FlushReport::default();

        for &root in &self.roots {
            if !self.tree.borrow().is_attached(root) {
                continue;
            }
            report.roots += 1;

            match render_math(&self.tree, &self.services, root).await {
                Ok(spans) => report.math_spans += spans,
                Err(err) => note_error(&mut report, root, "math", &err),
            }
            match render_diagrams(&self.tree, &self.services, root).await {
                Ok(diagrams) => report.diagrams += diagrams,
                Err(err) => note_error(&mut report, root, "diagram", &err),
            }

            let mut tree = self.tree.borrow_mut();
            report.copy_buttons += self.services.copy_buttons.borrow_mut().inject(
                &mut tree,
                root,
                &self.services.config,
            );
        }

        report.evicted = self.services.evict_detached(&self.tree.borrow());
        debug!(?report, "flush complete");
        report
    }
}

fn note_error(report: &mut FlushReport, root: NodeId, pass: &str, err: &Error) {
    report.errors += 1;
    match err {
        Error::StaleContentRace { .. } => debug!(root = root.0, pass, "{err}"),
        _ => warn!(root = root.0, pass, "{err}"),
    }
}
