//! The host content tree.
//!
//! The host owns the live document; this module gives the rest of the crate a
//! concrete, observable model of it:
//!
//! - [`ContentTree`]: arena-allocated nodes with stable [`NodeId`]s
//! - [`ContentSink`]: html5ever `TreeSink` so host markup can be parsed in
//! - [`MutationRecord`]: the change stream the scheduler subscribes to

mod arena;
mod mutation;
mod tree_sink;

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

pub use arena::{
    AncestorsIter, Attribute, ChildrenIter, ContentTree, DescendantsIter, Node, NodeData, NodeId,
};
pub use mutation::{MutationKind, MutationRecord, ObserverId};
pub use tree_sink::{ContentSink, NodeHandle};

/// The tree as shared between the host, the scheduler and in-flight renders.
///
/// Borrows must never be held across an `.await`.
pub type SharedTree = Rc<RefCell<ContentTree>>;

/// Parse an HTML document (or fragment) into a fresh tree.
///
/// Fragments are wrapped in `html`/`body` the way a browser would; use
/// [`ContentTree::body`] to reach the content.
pub fn parse_html(html: &str) -> ContentTree {
    let sink = ContentSink::new();
    parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_tree()
}

impl ContentTree {
    /// Parse `html` and append the resulting nodes under `parent`.
    ///
    /// Returns the top-level nodes that were inserted, in order.
    pub fn import_fragment(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let fragment = parse_html(html);
        let body = fragment.body();
        let tops: Vec<NodeId> = fragment.children(body).collect();

        let mut inserted = Vec::with_capacity(tops.len());
        for top in tops {
            if let Some(copy) = self.copy_from(&fragment, top) {
                self.append(parent, copy);
                inserted.push(copy);
            }
        }
        inserted
    }

    /// Deep-copy a node from another tree, returning the detached copy.
    fn copy_from(&mut self, source: &ContentTree, node: NodeId) -> Option<NodeId> {
        let copy = match &source.get(node)?.data {
            NodeData::Element { name, attrs, .. } => {
                self.create_element(name.clone(), attrs.clone())
            }
            NodeData::Text(text) => self.create_text(text.clone()),
            NodeData::Comment(_) | NodeData::Doctype { .. } | NodeData::Document => return None,
        };

        let children: Vec<NodeId> = source.children(node).collect();
        for child in children {
            if let Some(child_copy) = self.copy_from(source, child) {
                self.append(copy, child_copy);
            }
        }
        Some(copy)
    }
}
