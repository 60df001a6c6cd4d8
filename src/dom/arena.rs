//! Arena-based content tree.
//!
//! This is the crate's view of the host's live document. All nodes are stored
//! in a contiguous vector and linked by index. Nodes are never freed, so a
//! [`NodeId`] stays a stable identity even after the node has been detached;
//! callers use [`ContentTree::is_attached`] before acting on a node they
//! observed earlier.

use std::collections::HashMap;

use html5ever::{LocalName, Namespace, QualName, ns};

use super::mutation::{MutationRecord, ObserverId, Observers};

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this is a valid node ID.
    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    /// Check if this is the sentinel value.
    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }

    fn option(self) -> Option<NodeId> {
        self.is_some().then_some(self)
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with name and attributes.
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        /// Pre-extracted classes for fast matching.
        classes: Vec<String>,
    },
    /// Text content.
    Text(String),
    /// Comment (ignored but needed for TreeSink).
    Comment(String),
    /// Document type declaration.
    Doctype { name: String },
}

/// HTML attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    /// Attribute in the null namespace.
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.into(),
        }
    }
}

/// A node in the arena.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

fn split_classes(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Arena-backed content tree with mutation observers.
#[derive(Debug)]
pub struct ContentTree {
    nodes: Vec<Node>,
    document: NodeId,
    /// Map from id attribute to node ID for fast lookup.
    id_map: HashMap<String, NodeId>,
    observers: Observers,
}

impl ContentTree {
    /// Create a new empty tree with a document root.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
            id_map: HashMap::new(),
            observers: Observers::default(),
        };
        tree.document = tree.alloc(Node::new(NodeData::Document));
        tree
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the document root ID.
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Get the number of nodes ever allocated.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree only has its document root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a new element node.
    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        let mut id = None;
        let mut classes = Vec::new();

        for attr in &attrs {
            match attr.name.local.as_ref() {
                "id" => id = Some(attr.value.clone()),
                "class" => classes = split_classes(&attr.value),
                _ => {}
            }
        }

        let node_id = self.alloc(Node::new(NodeData::Element {
            name,
            attrs,
            classes,
        }));

        if let Some(id_str) = id {
            self.id_map.insert(id_str, node_id);
        }

        node_id
    }

    /// Create an HTML element from a tag name and `(name, value)` attributes.
    pub fn element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let name = QualName::new(None, ns!(html), LocalName::from(tag));
        let attrs = attrs
            .iter()
            .map(|(name, value)| Attribute::new(name, *value))
            .collect();
        self.create_element(name, attrs)
    }

    /// Create a new text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text.into())))
    }

    /// Create a new comment node.
    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text)))
    }

    /// Create a doctype node.
    pub fn create_doctype(&mut self, name: String) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype { name }))
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Append a child to a parent node, detaching it from any previous parent.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if self.get(child).is_some_and(|n| n.parent.is_some()) {
            self.remove(child);
        }

        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = NodeId::NONE;
        }

        if let Some(last_node) = self.get_mut(last_child) {
            last_node.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }

        self.record(MutationRecord::added(parent, child));
    }

    /// Insert a node before a sibling.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        if self.get(new_node).is_some_and(|n| n.parent.is_some()) {
            self.remove(new_node);
        }

        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }

        self.record(MutationRecord::added(parent, new_node));
    }

    /// Insert a node directly after `node`.
    pub fn insert_after(&mut self, node: NodeId, new_node: NodeId) {
        let Some(current) = self.get(node) else {
            return;
        };
        let (parent, next) = (current.parent, current.next_sibling);
        if next.is_some() {
            self.insert_before(next, new_node);
        } else if parent.is_some() {
            self.append(parent, new_node);
        }
    }

    /// Prepend a child to a parent node.
    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        match self.get(parent).map(|n| n.first_child) {
            Some(first) if first.is_some() => self.insert_before(first, child),
            Some(_) => self.append(parent, child),
            None => {}
        }
    }

    /// Detach a node from its parent. The node keeps its own subtree.
    pub fn remove(&mut self, target: NodeId) {
        let (parent, prev, next) = match self.get(target) {
            Some(n) if n.parent.is_some() => (n.parent, n.prev_sibling, n.next_sibling),
            _ => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(target) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }

        self.record(MutationRecord::removed(parent, target));
    }

    /// Append text to an existing trailing text node, or create a new one.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(ref mut existing) = last.data
        {
            existing.push_str(text);
            self.record(MutationRecord::character_data(last_child));
            return;
        }

        let text_node = self.create_text(text);
        self.append(parent, text_node);
    }

    /// Replace the payload of a text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Text(ref mut existing) = node.data
        {
            *existing = text.into();
            self.record(MutationRecord::character_data(id));
        }
    }

    /// Set (or replace) an attribute. Attribute changes are not observed.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let Some(node) = self.get_mut(id) else {
            return;
        };
        let NodeData::Element { attrs, classes, .. } = &mut node.data else {
            return;
        };

        if name == "class" {
            *classes = split_classes(&value);
        }
        match attrs.iter_mut().find(|a| a.name.local.as_ref() == name) {
            Some(attr) => attr.value = value.clone(),
            None => attrs.push(Attribute::new(name, value.clone())),
        }

        if name == "id" {
            self.id_map.insert(value, id);
        }
    }

    /// Remove an attribute if present.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Element { attrs, classes, .. } = &mut node.data
        {
            attrs.retain(|a| a.name.local.as_ref() != name);
            if name == "class" {
                classes.clear();
            }
        }
    }

    /// Add attributes that are not already present (used by the parser).
    pub fn add_attrs_if_missing(&mut self, id: NodeId, new_attrs: Vec<Attribute>) {
        let missing: Vec<Attribute> = match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element { attrs, .. }) => new_attrs
                .into_iter()
                .filter(|attr| !attrs.iter().any(|a| a.name == attr.name))
                .collect(),
            _ => return,
        };
        for attr in missing {
            self.set_attr(id, &attr.name.local, attr.value);
        }
    }

    /// Add a class to an element's class list.
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let mut list = self.element_classes(id).to_vec();
        list.push(class.to_string());
        self.set_attr(id, "class", list.join(" "));
    }

    /// Remove a class from an element's class list.
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let list: Vec<&str> = self
            .element_classes(id)
            .iter()
            .map(String::as_str)
            .filter(|c| *c != class)
            .collect();
        let joined = list.join(" ");
        self.set_attr(id, "class", joined);
    }

    /// Remove every child of a node.
    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<_> = self.children(id).collect();
        for child in children {
            self.remove(child);
        }
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Start observing child-list and character-data changes under `root`.
    pub fn observe(&mut self, root: NodeId) -> ObserverId {
        self.observers.register(root)
    }

    /// Stop observing. Returns false if the observer was already gone.
    pub fn disconnect(&mut self, observer: ObserverId) -> bool {
        self.observers.unregister(observer)
    }

    /// Whether an observer is still registered.
    pub fn is_observing(&self, observer: ObserverId) -> bool {
        self.observers.is_registered(observer)
    }

    /// Drain the records accumulated for an observer.
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers.take(observer)
    }

    fn record(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let matching: Vec<usize> = self
            .observers
            .roots()
            .filter(|(_, root)| self.contains(*root, record.target))
            .map(|(slot, _)| slot)
            .collect();
        for slot in matching {
            self.observers.push(slot, record.clone());
        }
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Parent of a node, if attached to one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.option())
    }

    /// Next sibling of a node.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.option())
    }

    /// Previous sibling of a node.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.option())
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        let first = self
            .get(parent)
            .map(|n| n.first_child)
            .unwrap_or(NodeId::NONE);
        ChildrenIter {
            tree: self,
            current: first,
        }
    }

    /// Iterate over the strict ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> AncestorsIter<'_> {
        AncestorsIter {
            tree: self,
            current: self.get(id).map(|n| n.parent).unwrap_or(NodeId::NONE),
        }
    }

    /// Depth-first, pre-order iteration over the strict descendants of `root`.
    pub fn descendants(&self, root: NodeId) -> DescendantsIter<'_> {
        let mut stack: Vec<NodeId> = self.children(root).collect();
        stack.reverse();
        DescendantsIter { tree: self, stack }
    }

    /// Whether `node` is `ancestor` or lies inside its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether a node is still connected to the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.document || self.ancestors(id).any(|a| a == self.document)
    }

    /// Find the first node matching a predicate (DFS from the document).
    pub fn find<F>(&self, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        self.descendants(self.document)
            .find(|id| self.get(*id).is_some_and(&predicate))
    }

    /// Find element by tag name (first match).
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find(|node| {
            matches!(&node.data, NodeData::Element { name, .. } if name.local.as_ref() == tag)
        })
    }

    /// Find the first element carrying a class.
    pub fn find_by_class(&self, class: &str) -> Option<NodeId> {
        self.find(|node| {
            matches!(&node.data, NodeData::Element { classes, .. } if classes.iter().any(|c| c == class))
        })
    }

    /// Get node by id attribute.
    pub fn get_by_id(&self, id: &str) -> Option<NodeId> {
        self.id_map.get(id).copied()
    }

    /// The `<body>` element, or the document when there is none.
    pub fn body(&self) -> NodeId {
        self.find_by_tag("body").unwrap_or(self.document)
    }
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over children of a node.
pub struct ChildrenIter<'a> {
    tree: &'a ContentTree,
    current: NodeId,
}

impl<'a> Iterator for ChildrenIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .tree
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Iterator over ancestors of a node.
pub struct AncestorsIter<'a> {
    tree: &'a ContentTree,
    current: NodeId,
}

impl<'a> Iterator for AncestorsIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self.tree.get(id).map(|n| n.parent).unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Pre-order iterator over a subtree.
pub struct DescendantsIter<'a> {
    tree: &'a ContentTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DescendantsIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        // Push children in reverse order so they're visited left-to-right
        let mut children: Vec<NodeId> = self.tree.children(current).collect();
        children.reverse();
        self.stack.extend(children);
        Some(current)
    }
}

/// Convenience methods for element and text nodes.
impl ContentTree {
    /// Get element's local name (tag).
    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    /// Get element's tag as a string slice.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element_name(id).map(|name| name.as_ref())
    }

    /// Get element's namespace.
    pub fn element_namespace(&self, id: NodeId) -> Option<&Namespace> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.ns),
            _ => None,
        })
    }

    /// Get an attribute value.
    pub fn get_attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name.local.as_ref() == attr_name)
                .map(|a| a.value.as_str()),
            _ => None,
        })
    }

    /// Whether an element has an attribute.
    pub fn has_attr(&self, id: NodeId, attr_name: &str) -> bool {
        self.get_attr(id, attr_name).is_some()
    }

    /// Get element's classes.
    pub fn element_classes(&self, id: NodeId) -> &[String] {
        static EMPTY: &[String] = &[];
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { classes, .. } => Some(classes.as_slice()),
                _ => None,
            })
            .unwrap_or(EMPTY)
    }

    /// Whether an element carries a class.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element_classes(id).iter().any(|c| c == class)
    }

    /// Check if node is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    /// Check if node is a text node.
    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| matches!(n.data, NodeData::Text(_)))
    }

    /// Payload of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Concatenated text of every descendant text node (DOM `textContent`).
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }
}
