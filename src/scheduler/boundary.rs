//! Scan boundary resolution.

use crate::config::Config;
use crate::dom::{ContentTree, NodeId};

const BOUNDARY_TAGS: &[&str] = &["article", "section"];

/// Whether `id` is a self-contained content block: an `article`/`section`
/// or an element carrying one of the configured content classes.
pub fn is_scan_boundary(tree: &ContentTree, id: NodeId, config: &Config) -> bool {
    let Some(tag) = tree.tag(id) else {
        return false;
    };
    BOUNDARY_TAGS.contains(&tag)
        || config
            .content_classes
            .iter()
            .any(|class| tree.has_class(id, class))
}

/// The nearest scan boundary enclosing `node` (inclusive), stopping at
/// `bound_root`. `None` when `node` lies outside the bound root.
pub fn resolve_scan_root(
    tree: &ContentTree,
    node: NodeId,
    bound_root: NodeId,
    config: &Config,
) -> Option<NodeId> {
    if !tree.contains(bound_root, node) {
        return None;
    }
    let boundary = std::iter::once(node)
        .chain(tree.ancestors(node))
        .take_while(|&id| id != bound_root)
        .find(|&id| is_scan_boundary(tree, id, config));
    Some(boundary.unwrap_or(bound_root))
}
