//! Underscore restoration.
//!
//! Markdown renderers read `_` inside unprocessed math as emphasis, so
//! `$a_b$ and $c_d$` arrives as text `$a`, emphasis `b$ and $c`, text `d$`.
//! Before scanning, runs of sibling text and emphasis/strong nodes are
//! merged into one logical string (emphasis contributes `_` on each side of
//! its text, strong `__`). Every emphasis/strong node with a marker inside a
//! math span is replaced by literal text with its markers restored.
//!
//! A closing marker that would land directly before the span's closing
//! delimiter is dropped, since a trailing `_` there is never valid TeX:
//! `$a` + em(`b`) + `$` becomes `$a_b$`.

use tracing::trace;

use super::scan::{MathSpan, find_math_spans};
use crate::classify::{NodeKind, classify};
use crate::dom::{ContentTree, NodeId};

struct Piece {
    node: NodeId,
    marker: &'static str,
    start: usize,
    end: usize,
}

/// Restore underscores under every scannable element of `root`. Returns the
/// number of emphasis/strong nodes turned back into text.
pub fn restore_underscores(tree: &mut ContentTree, root: NodeId) -> usize {
    let mut restored = 0;
    for parent in scan_parents(tree, root) {
        restored += restore_in(tree, parent);
        merge_adjacent_text(tree, parent);
    }
    restored
}

/// Elements under `root` (inclusive) whose direct text the math pass may
/// rewrite, in document order. Opaque subtrees are skipped entirely.
pub fn scan_parents(tree: &ContentTree, root: NodeId) -> Vec<NodeId> {
    fn walk(tree: &ContentTree, id: NodeId, out: &mut Vec<NodeId>) {
        if !tree.is_element(id) && id != tree.document() {
            return;
        }
        if classify(tree, id).is_opaque() {
            return;
        }
        out.push(id);
        for child in tree.children(id) {
            walk(tree, child, out);
        }
    }

    let mut out = Vec::new();
    walk(tree, root, &mut out);
    out
}

/// Merge runs of adjacent text children into the first node of each run.
pub fn merge_adjacent_text(tree: &mut ContentTree, parent: NodeId) {
    let mut cursor = tree.children(parent).next();
    while let Some(node) = cursor {
        let next = tree.next_sibling(node);
        if let (Some(head), Some(next)) = (tree.text(node), next)
            && let Some(tail) = tree.text(next)
        {
            let combined = format!("{head}{tail}");
            tree.set_text(node, combined);
            tree.remove(next);
            continue;
        }
        cursor = next;
    }
}

fn restore_in(tree: &mut ContentTree, parent: NodeId) -> usize {
    let children: Vec<NodeId> = tree.children(parent).collect();
    let mut restored = 0;
    let mut run = Vec::new();

    for child in children {
        match classify(tree, child) {
            NodeKind::Text | NodeKind::Emphasis | NodeKind::Strong => run.push(child),
            _ => {
                restored += restore_run(tree, &run);
                run.clear();
            }
        }
    }
    restored + restore_run(tree, &run)
}

fn restore_run(tree: &mut ContentTree, run: &[NodeId]) -> usize {
    if run.len() < 2 {
        return 0;
    }

    let mut merged = String::new();
    let mut pieces = Vec::with_capacity(run.len());
    for &node in run {
        let marker = match classify(tree, node) {
            NodeKind::Emphasis => "_",
            NodeKind::Strong => "__",
            _ => "",
        };
        let start = merged.len();
        merged.push_str(marker);
        merged.push_str(&tree.text_content(node));
        merged.push_str(marker);
        pieces.push(Piece {
            node,
            marker,
            start,
            end: merged.len(),
        });
    }

    let spans = find_math_spans(&merged);
    if spans.is_empty() {
        return 0;
    }

    let replacements: Vec<(NodeId, String)> = pieces
        .iter()
        .filter(|piece| !piece.marker.is_empty())
        .filter_map(|piece| {
            let span = enclosing_span(&spans, piece)?;
            let marker_len = piece.marker.len();
            let inner = &merged[piece.start + marker_len..piece.end - marker_len];
            let close = if piece.end == span.inner.end { "" } else { piece.marker };
            Some((piece.node, format!("{}{inner}{close}", piece.marker)))
        })
        .collect();

    for (node, text) in &replacements {
        trace!(node = node.0, text = %text, "restoring underscores");
        let literal = tree.create_text(text.as_str());
        tree.insert_before(*node, literal);
        tree.remove(*node);
    }
    replacements.len()
}

/// The span one of the piece's markers falls inside, if any.
fn enclosing_span<'s>(spans: &'s [MathSpan], piece: &Piece) -> Option<&'s MathSpan> {
    let open = piece.start;
    let close = piece.end - piece.marker.len();
    spans
        .iter()
        .find(|span| span.inner.contains(&open) || span.inner.contains(&close))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn restored(html: &str) -> (usize, String) {
        let mut tree = parse_html(html);
        let p = tree.find_by_tag("p").unwrap();
        let count = restore_underscores(&mut tree, p);
        let children: Vec<NodeId> = tree.children(p).collect();
        assert!(children.iter().all(|&c| tree.is_text(c)) || count == 0);
        (count, tree.text_content(p))
    }

    #[test]
    fn test_split_subscript_restored() {
        assert_eq!(restored("<p>$a<em>b</em>$</p>"), (1, "$a_b$".to_string()));
    }

    #[test]
    fn test_emphasis_spanning_two_formulas() {
        assert_eq!(
            restored("<p>$a<em>b$ and $c</em>d$</p>"),
            (1, "$a_b$ and $c_d$".to_string())
        );
    }

    #[test]
    fn test_strong_uses_double_marker() {
        assert_eq!(
            restored("<p>$x<strong>i</strong>y$</p>"),
            (1, "$x__i__y$".to_string())
        );
    }

    #[test]
    fn test_real_emphasis_untouched() {
        let mut tree = parse_html("<p><em>note</em> that $x$ holds</p>");
        let p = tree.find_by_tag("p").unwrap();
        assert_eq!(restore_underscores(&mut tree, p), 0);
        assert!(tree.find_by_tag("em").is_some());

        let mut tree = parse_html("<p><em>see $x$ here</em></p>");
        let p = tree.find_by_tag("p").unwrap();
        assert_eq!(restore_underscores(&mut tree, p), 0);
        assert!(tree.find_by_tag("em").is_some());
    }

    #[test]
    fn test_merge_adjacent_text() {
        let mut tree = ContentTree::new();
        let doc = tree.document();
        let p = tree.element("p", &[]);
        tree.append(doc, p);
        for part in ["$a", "+b", "$"] {
            let text = tree.create_text(part);
            tree.append(p, text);
        }
        merge_adjacent_text(&mut tree, p);
        let children: Vec<NodeId> = tree.children(p).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(tree.text(children[0]), Some("$a+b$"));
    }

    #[test]
    fn test_scan_parents_skip_code() {
        let tree = parse_html("<div><p>a</p><pre><code>$x$</code></pre></div>");
        let div = tree.find_by_tag("div").unwrap();
        let parents = scan_parents(&tree, div);
        assert!(parents.iter().all(|&id| tree.tag(id) != Some("pre")));
        assert!(parents.iter().all(|&id| tree.tag(id) != Some("code")));
        assert_eq!(parents.len(), 2);
    }
}
