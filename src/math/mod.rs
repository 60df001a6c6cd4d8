//! Math rendering over live content.
//!
//! - [`scan`]: delimiter scanning and tokenization
//! - [`restore`]: underscore restoration and text normalization
//! - [`engine`]: the [`MathEngine`] seam and the built-in engine
//!
//! A pass over one content root runs when the root's scan text differs from
//! the snapshot recorded after its last successful pass. Rendered math
//! containers are opaque to the scan text, so a fully rendered root is
//! stable and rescans of it are no-ops.

pub mod engine;
pub mod restore;
pub mod scan;

use tracing::{debug, warn};

pub use engine::{MathEngine, default_loader};
#[cfg(feature = "latex")]
pub use engine::LatexEngine;
pub use restore::{merge_adjacent_text, restore_underscores, scan_parents};
pub use scan::{MathSpan, Token, find_math_spans, may_contain_math, tokenize};

use crate::classify::{NodeKind, classify};
use crate::dom::{ContentTree, NodeId, SharedTree};
use crate::error::{Error, Result};
use crate::markers::{MATH_CLASS, MATH_DISPLAY_CLASS, MATH_ERROR_CLASS, MATH_INLINE_CLASS, TEX_ENCODING};
use crate::services::Services;
use crate::state::RenderState;

/// Text of `root` as the math pass sees it: every text node outside opaque
/// subtrees, in document order.
pub fn scan_text(tree: &ContentTree, root: NodeId) -> String {
    fn walk(tree: &ContentTree, id: NodeId, out: &mut String) {
        match classify(tree, id) {
            NodeKind::Text => {
                if let Some(text) = tree.text(id) {
                    out.push_str(text);
                }
            }
            kind if kind.is_opaque() => {}
            _ => {
                for child in tree.children(id) {
                    walk(tree, child, out);
                }
            }
        }
    }

    let mut out = String::new();
    walk(tree, root, &mut out);
    out
}

/// Render the math under one content root.
///
/// Returns the number of math spans typeset. Skips (returning `Ok(0)`) when
/// math is disabled, the root is unchanged since its last pass, or another
/// pass over it is in flight. An engine load failure or a root that left
/// the tree while the engine loaded leaves the root unmarked so the next
/// scan retries.
pub async fn render_math(tree: &SharedTree, services: &Services, root: NodeId) -> Result<usize> {
    if !services.config.math {
        return Ok(0);
    }

    let snapshot = {
        let tree = tree.borrow();
        if !tree.is_attached(root) {
            return Err(Error::StaleContentRace { node: root.0 });
        }
        scan_text(&tree, root)
    };

    {
        let mut states = services.math_states.borrow_mut();
        match states.status(root, &snapshot) {
            RenderState::Rendered | RenderState::Rendering => return Ok(0),
            RenderState::Unrendered | RenderState::Errored => {}
        }
        if !may_contain_math(&snapshot) {
            states.finish_rendered(root, snapshot);
            return Ok(0);
        }
        states.begin(root);
    }

    let engine = match services.math_engine.get().await {
        Ok(engine) => engine,
        Err(err) => {
            services.math_states.borrow_mut().reset(root);
            return Err(err);
        }
    };

    let mut tree = tree.borrow_mut();
    if !tree.is_attached(root) {
        services.math_states.borrow_mut().reset(root);
        return Err(Error::StaleContentRace { node: root.0 });
    }

    let restored = restore_underscores(&mut tree, root);
    let rendered = typeset_root(&mut tree, root, engine.as_ref());
    let after = scan_text(&tree, root);
    services.math_states.borrow_mut().finish_rendered(root, after);

    debug!(root = root.0, restored, rendered, "math pass complete");
    Ok(rendered)
}

/// Replace every math span in the text under `root` with a container.
fn typeset_root(tree: &mut ContentTree, root: NodeId, engine: &dyn MathEngine) -> usize {
    let mut rendered = 0;

    for parent in scan_parents(tree, root) {
        merge_adjacent_text(tree, parent);

        let texts: Vec<NodeId> = tree.children(parent).filter(|&c| tree.is_text(c)).collect();
        for text_node in texts {
            let Some(text) = tree.text(text_node).map(str::to_string) else {
                continue;
            };
            let tokens = tokenize(&text);
            if !tokens.iter().any(|t| matches!(t, Token::Math { .. })) {
                continue;
            }

            for token in tokens {
                let node = match token {
                    Token::Text(text) => tree.create_text(text),
                    Token::Math {
                        source,
                        raw,
                        display,
                    } => {
                        rendered += 1;
                        math_container(tree, engine, source, raw, display)
                    }
                };
                tree.insert_before(text_node, node);
            }
            tree.remove(text_node);
        }
    }

    rendered
}

/// Build a detached container for one math span.
///
/// On success it holds the engine's markup; on failure the literal span as
/// written plus the error class. Either way it carries the source as a TeX
/// annotation so the serializer can recover it.
fn math_container(
    tree: &mut ContentTree,
    engine: &dyn MathEngine,
    source: &str,
    raw: &str,
    display: bool,
) -> NodeId {
    let (tag, mode) = if display {
        ("div", MATH_DISPLAY_CLASS)
    } else {
        ("span", MATH_INLINE_CLASS)
    };
    let class = format!("{MATH_CLASS} {mode}");
    let container = tree.element(tag, &[("class", class.as_str())]);

    match engine.typeset(source, display) {
        Ok(markup) => {
            tree.import_fragment(container, &markup);
        }
        Err(err) => {
            warn!("math render failed for {raw:?}: {err}");
            tree.add_class(container, MATH_ERROR_CLASS);
            tree.append_text(container, raw);
        }
    }

    let annotation = tree.element("annotation", &[("encoding", TEX_ENCODING)]);
    tree.append_text(annotation, source);
    tree.append(container, annotation);
    container
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn test_scan_text_skips_rendered_and_code() {
        let tree = parse_html(
            r#"<div>a<span class="livemark-math">x</span><code>$y$</code><button>Copy</button>b</div>"#,
        );
        let div = tree.find_by_tag("div").unwrap();
        assert_eq!(scan_text(&tree, div), "ab");
    }
}
