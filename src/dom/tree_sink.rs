//! html5ever TreeSink implementation for ContentTree.

use std::cell::RefCell;

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as Html5Attribute, QualName};

use super::arena::{Attribute, ContentTree, NodeData, NodeId};

/// Handle used by TreeSink to reference nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(pub NodeId);

impl Default for NodeHandle {
    fn default() -> Self {
        NodeHandle(NodeId::NONE)
    }
}

fn convert_attrs(attrs: Vec<Html5Attribute>) -> Vec<Attribute> {
    attrs
        .into_iter()
        .map(|a| Attribute {
            name: a.name,
            value: a.value.to_string(),
        })
        .collect()
}

/// Builds a [`ContentTree`] from html5ever's tree-construction callbacks.
///
/// html5ever drives the sink through `&self`, so the tree sits in a
/// `RefCell`. Nothing is observed while parsing; observers are registered
/// on the finished tree.
pub struct ContentSink {
    tree: RefCell<ContentTree>,
}

impl Default for ContentSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentSink {
    pub fn new() -> Self {
        Self {
            tree: RefCell::new(ContentTree::new()),
        }
    }

    /// Consume the sink and return the tree.
    pub fn into_tree(self) -> ContentTree {
        self.tree.into_inner()
    }
}

impl TreeSink for ContentSink {
    type Handle = NodeHandle;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, _msg: std::borrow::Cow<'static, str>) {
        // Host markup is whatever the page produced; stay lenient like browsers
    }

    fn get_document(&self) -> Self::Handle {
        NodeHandle(self.tree.borrow().document())
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        static EMPTY: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };

        let tree = self.tree.borrow();
        match tree.get(target.0).map(|n| &n.data) {
            Some(NodeData::Element { name, .. }) => {
                // SAFETY: nodes are never freed or moved out of the arena
                // while the sink is alive, and the QualName is not mutated
                // after creation. The RefCell guard hides that from the
                // borrow checker, so the lifetime is extended manually.
                unsafe { std::mem::transmute::<&QualName, &'a QualName>(name) }
            }
            _ => &EMPTY,
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Html5Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let id = self
            .tree
            .borrow_mut()
            .create_element(name, convert_attrs(attrs));
        NodeHandle(id)
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        NodeHandle(self.tree.borrow_mut().create_comment(text.to_string()))
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        NodeHandle(self.tree.borrow_mut().create_comment(String::new()))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut tree = self.tree.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => tree.append(parent.0, node.0),
            NodeOrText::AppendText(text) => tree.append_text(parent.0, &text),
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let parent = self.tree.borrow().parent(element.0);
        match parent {
            Some(parent) => self.append(&NodeHandle(parent), child),
            None => self.append(prev_element, child),
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        let mut tree = self.tree.borrow_mut();
        let doc = tree.document();
        let doctype = tree.create_doctype(name.to_string());
        tree.append(doc, doctype);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // Templates are skipped by the classifier, so their contents can
        // live directly under the element
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x.0 == y.0
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut tree = self.tree.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => tree.insert_before(sibling.0, node.0),
            NodeOrText::AppendText(text) => {
                let text_node = tree.create_text(text.to_string());
                tree.insert_before(sibling.0, text_node);
            }
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Html5Attribute>) {
        self.tree
            .borrow_mut()
            .add_attrs_if_missing(target.0, convert_attrs(attrs));
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.tree.borrow_mut().remove(target.0);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut tree = self.tree.borrow_mut();
        let children: Vec<_> = tree.children(node.0).collect();
        for child in children {
            tree.append(new_parent.0, child);
        }
    }
}
