//! Maps content-tree nodes to semantic kinds.
//!
//! Classification looks only at the node itself (tag, classes, attributes),
//! never at its subtree, and the first matching rule wins:
//!
//! 1. skip-list tags
//! 2. interactive controls and hidden diagram sources
//! 3. rendered math
//! 4. diagram results
//! 5. tables
//! 6. fenced code wrappers
//! 7. structural markup
//! 8. everything else is a generic container

use crate::dom::{ContentTree, NodeData, NodeId};
use crate::markers::{
    BOUND_ATTR, COPY_BUTTON_CLASS, DIAGRAM_CLASS, MATH_CLASS, MATH_DISPLAY_CLASS,
    SOURCE_HIDDEN_ATTR,
};

/// Semantic kind of a content node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Not content: scripts, styles, graphics, controls, comments.
    Ignored,
    /// Leaf text.
    Text,
    /// Typeset math; the original source lives in an annotation.
    MathRendered { display: bool },
    /// Rendered diagram container carrying its cached source.
    DiagramRendered,
    Table,
    /// Fenced code (`<pre>`, `language-*` wrappers, highlighter output).
    CodeBlock,
    /// Heading with level 1-6.
    Heading(u8),
    Emphasis,
    Strong,
    Strike,
    InlineCode,
    Link,
    Image,
    List { ordered: bool },
    ListItem,
    Paragraph,
    LineBreak,
    Quote,
    Divider,
    /// Anything else; its children are processed in order.
    Container,
}

impl NodeKind {
    /// Subtrees whose text must never be touched by the generic text path
    /// or by the math scanner.
    pub fn is_opaque(&self) -> bool {
        matches!(
            self,
            NodeKind::Ignored
                | NodeKind::MathRendered { .. }
                | NodeKind::DiagramRendered
                | NodeKind::CodeBlock
                | NodeKind::InlineCode
        )
    }

    /// Whether this kind is a list container.
    pub fn is_list(&self) -> bool {
        matches!(self, NodeKind::List { .. })
    }
}

const SKIP_TAGS: &[&str] = &[
    "style", "script", "noscript", "template", "svg", "canvas", "head", "meta", "link", "title",
];

const CONTROL_TAGS: &[&str] = &["button", "input", "textarea", "select"];

const HIGHLIGHT_MARKERS: &[&str] = &["code-block", "highlight", "hljs"];

/// Classify a node.
pub fn classify(tree: &ContentTree, id: NodeId) -> NodeKind {
    let Some(node) = tree.get(id) else {
        return NodeKind::Ignored;
    };
    let (tag, classes) = match &node.data {
        NodeData::Text(_) => return NodeKind::Text,
        NodeData::Document => return NodeKind::Container,
        NodeData::Comment(_) | NodeData::Doctype { .. } => return NodeKind::Ignored,
        NodeData::Element { name, classes, .. } => (name.local.as_ref(), classes.as_slice()),
    };
    let has_class = |class: &str| classes.iter().any(|c| c == class);

    // 1. Skip-list
    if SKIP_TAGS.contains(&tag) {
        return NodeKind::Ignored;
    }

    // 2. Controls, including our own copy buttons and hidden diagram sources
    if CONTROL_TAGS.contains(&tag)
        || has_class(COPY_BUTTON_CLASS)
        || tree.has_attr(id, BOUND_ATTR)
        || tree.has_attr(id, SOURCE_HIDDEN_ATTR)
        || tree.get_attr(id, "role") == Some("button")
    {
        return NodeKind::Ignored;
    }

    // 3. Rendered math
    if let Some(display) = math_wrapper(tree, id, tag, &has_class) {
        return NodeKind::MathRendered { display };
    }

    // 4. Diagram results
    if has_class(DIAGRAM_CLASS) {
        return NodeKind::DiagramRendered;
    }

    // 5. Tables
    if tag == "table" {
        return NodeKind::Table;
    }

    // 6. Fenced code
    if tag == "pre"
        || (tag != "code"
            && (classes.iter().any(|c| language_from_class(c).is_some())
                || HIGHLIGHT_MARKERS.iter().any(|m| has_class(*m))))
    {
        return NodeKind::CodeBlock;
    }

    // 7. Structure
    match tag {
        "h1" => NodeKind::Heading(1),
        "h2" => NodeKind::Heading(2),
        "h3" => NodeKind::Heading(3),
        "h4" => NodeKind::Heading(4),
        "h5" => NodeKind::Heading(5),
        "h6" => NodeKind::Heading(6),
        "em" | "i" => NodeKind::Emphasis,
        "strong" | "b" => NodeKind::Strong,
        "s" | "strike" | "del" => NodeKind::Strike,
        "code" | "kbd" | "samp" | "tt" => NodeKind::InlineCode,
        "a" => NodeKind::Link,
        "img" => NodeKind::Image,
        "ul" => NodeKind::List { ordered: false },
        "ol" => NodeKind::List { ordered: true },
        "li" => NodeKind::ListItem,
        "p" => NodeKind::Paragraph,
        "br" => NodeKind::LineBreak,
        "blockquote" => NodeKind::Quote,
        "hr" => NodeKind::Divider,
        // 8. Fallback
        _ => NodeKind::Container,
    }
}

/// Returns `Some(display)` when the element is a typeset-math wrapper.
fn math_wrapper(
    tree: &ContentTree,
    id: NodeId,
    tag: &str,
    has_class: &impl Fn(&str) -> bool,
) -> Option<bool> {
    if has_class("katex-display") {
        return Some(true);
    }
    if has_class(MATH_CLASS) {
        return Some(has_class(MATH_DISPLAY_CLASS));
    }
    if has_class("katex") {
        return Some(false);
    }
    match tag {
        "mjx-container" => Some(matches!(
            tree.get_attr(id, "display"),
            Some("true") | Some("block")
        )),
        "math" => Some(tree.get_attr(id, "display") == Some("block")),
        _ => None,
    }
}

/// Extract the language id from a `language-<id>` or `lang-<id>` class.
pub fn language_from_class(class: &str) -> Option<&str> {
    class
        .strip_prefix("language-")
        .or_else(|| class.strip_prefix("lang-"))
        .filter(|lang| !lang.is_empty())
}

/// The language a node declares for itself, via class or attribute.
pub fn own_language(tree: &ContentTree, id: NodeId) -> Option<&str> {
    tree.element_classes(id)
        .iter()
        .find_map(|c| language_from_class(c))
        .or_else(|| tree.get_attr(id, "data-language"))
        .or_else(|| tree.get_attr(id, "data-lang"))
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
}

/// Text content, skipping controls and other ignored subtrees.
pub fn visible_text(tree: &ContentTree, id: NodeId) -> String {
    fn walk(tree: &ContentTree, id: NodeId, out: &mut String) {
        match classify(tree, id) {
            NodeKind::Ignored => {}
            NodeKind::Text => {
                if let Some(text) = tree.text(id) {
                    out.push_str(text);
                }
            }
            _ => {
                for child in tree.children(id) {
                    walk(tree, child, out);
                }
            }
        }
    }

    let mut out = String::new();
    walk(tree, id, &mut out);
    out
}
