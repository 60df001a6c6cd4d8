//! Code-block source extraction.
//!
//! Shared by the serializer and the diagram renderer so both agree on what a
//! code block's source text is.

use crate::classify::{own_language, visible_text};
use crate::dom::{ContentTree, NodeId};
use crate::markers::SOURCE_HIDDEN_ATTR;

use super::escape::calculate_fence_length;

/// Classes highlighters put on per-line wrappers.
const LINE_CLASSES: &[&str] = &["line", "view-line", "code-line"];

/// Language of a code block: its own, else the first descendant's, else its
/// parent's.
pub fn code_language(tree: &ContentTree, block: NodeId) -> Option<String> {
    if let Some(lang) = own_language(tree, block) {
        return Some(lang.to_string());
    }
    if let Some(lang) = tree
        .descendants(block)
        .find_map(|id| own_language(tree, id))
    {
        return Some(lang.to_string());
    }
    tree.parent(block)
        .and_then(|parent| own_language(tree, parent))
        .map(str::to_string)
}

/// Source text of a code block.
///
/// When the body is split into per-line nodes their texts are joined with
/// `\n`; otherwise the body's plain text is used. One trailing newline is
/// stripped either way.
pub fn code_text(tree: &ContentTree, block: NodeId) -> String {
    let body = code_body(tree, block);

    let lines: Vec<NodeId> = tree
        .children(body)
        .filter(|&child| is_line_node(tree, child))
        .collect();

    let mut text = if lines.is_empty() {
        body_text(tree, body)
    } else {
        lines
            .iter()
            .map(|&line| visible_text(tree, line))
            .collect::<Vec<_>>()
            .join("\n")
    };

    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

/// The element holding the actual code: the `code` inside a `pre`, the
/// `pre` inside a highlighter wrapper, or the block itself.
fn code_body(tree: &ContentTree, block: NodeId) -> NodeId {
    let inner_pre = if tree.tag(block) == Some("pre") {
        Some(block)
    } else {
        tree.descendants(block)
            .find(|&id| tree.tag(id) == Some("pre"))
    };

    let scope = inner_pre.unwrap_or(block);
    tree.descendants(scope)
        .find(|&id| tree.tag(id) == Some("code"))
        .unwrap_or(scope)
}

/// Visible text of a code body. A body hidden behind its rendered diagram
/// still has a source.
fn body_text(tree: &ContentTree, body: NodeId) -> String {
    if tree.has_attr(body, SOURCE_HIDDEN_ATTR) {
        tree.children(body).map(|child| visible_text(tree, child)).collect()
    } else {
        visible_text(tree, body)
    }
}

fn is_line_node(tree: &ContentTree, id: NodeId) -> bool {
    if !tree.is_element(id) {
        return false;
    }
    tree.tag(id) == Some("div") || LINE_CLASSES.iter().any(|class| tree.has_class(id, class))
}

/// A fenced block with a fence longer than any backtick run in `body`.
pub fn fenced_block(lang: Option<&str>, body: &str) -> String {
    let fence = "`".repeat(calculate_fence_length(body, '`'));
    format!("{fence}{}\n{body}\n{fence}", lang.unwrap_or_default())
}
