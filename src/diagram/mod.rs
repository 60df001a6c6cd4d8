//! Diagram rendering over live content.
//!
//! Each code block whose language is `mermaid` is a diagram source. A
//! successful render inserts a diagram container right after the source,
//! hides the source, and gives the container a copy button wired to the
//! source text. The container also carries the source as an attribute so
//! the serializer can emit it again.
//!
//! Per-node [`RenderState`] keeps this idempotent: a node is rendered at
//! most once per distinct source, never twice at a time, and a source that
//! failed is not retried until it changes.

pub mod engine;

use tracing::{debug, warn};

pub use engine::{DiagramEngine, default_loader};
#[cfg(feature = "mermaid")]
pub use engine::MermaidEngine;

use crate::classify::{NodeKind, classify};
use crate::copy::CopyTarget;
use crate::dom::{ContentTree, NodeId, SharedTree};
use crate::error::{Error, Result};
use crate::markdown::{code_language, code_text};
use crate::markers::{DIAGRAM_CLASS, DIAGRAM_LANGUAGE, DIAGRAM_SOURCE_ATTR, SOURCE_HIDDEN_ATTR};
use crate::services::Services;
use crate::state::RenderState;

/// What one diagram node's render attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramOutcome {
    Rendered,
    Failed,
    /// Already rendered, in flight, known bad, or empty.
    Skipped,
}

/// Diagram source blocks under `root`, outermost only.
pub fn find_diagram_sources(tree: &ContentTree, root: NodeId) -> Vec<NodeId> {
    let mut found: Vec<NodeId> = Vec::new();
    for id in std::iter::once(root).chain(tree.descendants(root)) {
        if found.iter().any(|&outer| tree.contains(outer, id)) {
            continue;
        }
        if is_diagram_source(tree, id) {
            found.push(id);
        }
    }
    found
}

/// A mermaid code block, including one already hidden behind its render.
pub fn is_diagram_source(tree: &ContentTree, id: NodeId) -> bool {
    if !tree.is_element(id) {
        return false;
    }
    let is_code = tree.has_attr(id, SOURCE_HIDDEN_ATTR) || classify(tree, id) == NodeKind::CodeBlock;
    is_code
        && code_language(tree, id)
            .is_some_and(|lang| lang.eq_ignore_ascii_case(DIAGRAM_LANGUAGE))
}

/// Render every diagram source under `root`. Returns how many rendered.
pub async fn render_diagrams(tree: &SharedTree, services: &Services, root: NodeId) -> Result<usize> {
    if !services.config.diagram {
        return Ok(0);
    }

    let sources = {
        let tree = tree.borrow();
        if !tree.is_attached(root) {
            return Err(Error::StaleContentRace { node: root.0 });
        }
        find_diagram_sources(&tree, root)
    };

    let mut rendered = 0;
    for node in sources {
        match render_diagram(tree, services, node).await {
            Ok(DiagramOutcome::Rendered) => rendered += 1,
            Ok(_) => {}
            Err(err @ Error::LoadFailure(_)) => return Err(err),
            Err(err) => debug!(node = node.0, "diagram skipped: {err}"),
        }
    }
    Ok(rendered)
}

/// Render one diagram source block.
pub async fn render_diagram(
    tree: &SharedTree,
    services: &Services,
    node: NodeId,
) -> Result<DiagramOutcome> {
    let source = {
        let tree = tree.borrow();
        if !tree.is_attached(node) {
            return Err(Error::StaleContentRace { node: node.0 });
        }
        code_text(&tree, node).trim().to_string()
    };
    if source.is_empty() {
        return Ok(DiagramOutcome::Skipped);
    }

    {
        let mut states = services.diagram_states.borrow_mut();
        match states.status(node, &source) {
            RenderState::Rendering | RenderState::Rendered => return Ok(DiagramOutcome::Skipped),
            RenderState::Unrendered | RenderState::Errored => {}
        }
        if states.last_errored_source(node) == Some(source.as_str()) {
            return Ok(DiagramOutcome::Skipped);
        }
        states.begin(node);
    }

    let engine = match services.diagram_engine.get().await {
        Ok(engine) => engine,
        Err(err) => {
            services.diagram_states.borrow_mut().reset(node);
            return Err(err);
        }
    };

    let result = engine.render(&source);

    let mut tree = tree.borrow_mut();
    let current = tree
        .is_attached(node)
        .then(|| code_text(&tree, node).trim().to_string());
    if current.as_deref() != Some(source.as_str()) {
        services.diagram_states.borrow_mut().reset(node);
        return Err(Error::StaleContentRace { node: node.0 });
    }

    match result {
        Ok(svg) => {
            let container = place_container(&mut tree, node, &source, &svg);
            tree.set_attr(node, SOURCE_HIDDEN_ATTR, "");
            services.copy_buttons.borrow_mut().attach(
                &mut tree,
                container,
                CopyTarget::Source(source.clone()),
                &services.config,
            );
            services
                .diagram_states
                .borrow_mut()
                .finish_rendered(node, source);
            debug!(node = node.0, "diagram rendered");
            Ok(DiagramOutcome::Rendered)
        }
        Err(err) => {
            warn!(node = node.0, "diagram render failed: {err}");
            if let Some(previous) = existing_container(&tree, node) {
                tree.remove(previous);
            }
            tree.remove_attr(node, SOURCE_HIDDEN_ATTR);
            services
                .diagram_states
                .borrow_mut()
                .finish_errored(node, source);
            Ok(DiagramOutcome::Failed)
        }
    }
}

/// Insert a fresh container after `node`, replacing any earlier one.
fn place_container(tree: &mut ContentTree, node: NodeId, source: &str, svg: &str) -> NodeId {
    let container = tree.element(
        "div",
        &[("class", DIAGRAM_CLASS), (DIAGRAM_SOURCE_ATTR, source)],
    );
    tree.import_fragment(container, svg);

    match existing_container(tree, node) {
        Some(previous) => {
            tree.insert_before(previous, container);
            tree.remove(previous);
        }
        None => tree.insert_after(node, container),
    }
    container
}

/// The diagram container following `node`, skipping whitespace text.
fn existing_container(tree: &ContentTree, node: NodeId) -> Option<NodeId> {
    let mut next = tree.next_sibling(node);
    while let Some(id) = next {
        match tree.text(id) {
            Some(text) if text.trim().is_empty() => next = tree.next_sibling(id),
            Some(_) => return None,
            None => return tree.has_class(id, DIAGRAM_CLASS).then_some(id),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn test_find_sources_outermost_only() {
        let tree = parse_html(
            r#"<div class="language-mermaid"><pre><code class="language-mermaid">graph TD</code></pre></div><pre><code class="language-rust">fn x</code></pre>"#,
        );
        let sources = find_diagram_sources(&tree, tree.body());
        assert_eq!(sources.len(), 1);
        assert_eq!(tree.tag(sources[0]), Some("div"));
    }

    #[test]
    fn test_hidden_source_still_found() {
        let tree = parse_html(
            r#"<pre data-livemark-source-hidden=""><code class="language-mermaid">graph TD</code></pre>"#,
        );
        let pre = tree.find_by_tag("pre").unwrap();
        assert!(is_diagram_source(&tree, pre));
    }

    #[test]
    fn test_existing_container_skips_whitespace() {
        let tree = parse_html(
            "<pre><code class=\"language-mermaid\">a</code></pre>\n<div class=\"livemark-diagram\"></div>",
        );
        let pre = tree.find_by_tag("pre").unwrap();
        let found = existing_container(&tree, pre).unwrap();
        assert!(tree.has_class(found, DIAGRAM_CLASS));
    }
}
