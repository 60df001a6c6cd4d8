//! Diagram pass tests with scripted engines.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::block_on;
use web_time::Instant;

use livemark::copy::button_of;
use livemark::diagram::{DiagramOutcome, render_diagram, render_diagrams};
use livemark::{
    Config, DiagramEngine, EngineSlot, Error, MathEngine, MemoryClipboard, NodeId, Result,
    Services, SharedTree, parse_html, serialize,
};

#[derive(Default)]
struct FakeDiagrams {
    calls: Cell<usize>,
}

impl DiagramEngine for FakeDiagrams {
    fn render(&self, source: &str) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        if source.contains("error") {
            return Err(Error::ParseFailure(format!("unexpected token in {source}")));
        }
        Ok(format!(r#"<svg class="fake-diagram"><text>{}</text></svg>"#, source.len()))
    }
}

struct NoMath;

impl MathEngine for NoMath {
    fn typeset(&self, _source: &str, _display: bool) -> Result<String> {
        Err(Error::RenderFailure("unused".into()))
    }
}

const ONE_DIAGRAM: &str = r#"<div class="markdown-body"><pre><code class="language-mermaid">graph TD; A-->B</code></pre><p>after</p></div>"#;

fn setup(html: &str) -> (SharedTree, Rc<FakeDiagrams>, Services) {
    let tree = Rc::new(RefCell::new(parse_html(html)));
    let engine = Rc::new(FakeDiagrams::default());
    let services = Services::with_engines(Config::default(), Rc::new(NoMath), engine.clone());
    (tree, engine, services)
}

fn source_block(tree: &SharedTree) -> NodeId {
    tree.borrow().find_by_tag("pre").unwrap()
}

fn containers(tree: &SharedTree) -> Vec<NodeId> {
    let tree = tree.borrow();
    tree.descendants(tree.document())
        .filter(|&id| tree.has_class(id, "livemark-diagram"))
        .collect()
}

fn set_source(tree: &SharedTree, source: &str) {
    let mut tree = tree.borrow_mut();
    let code = tree.find_by_tag("code").unwrap();
    let text = tree.children(code).next().unwrap();
    tree.set_text(text, source);
}

#[test]
fn test_render_places_container_after_source() {
    let (tree, engine, services) = setup(ONE_DIAGRAM);
    let body = tree.borrow().body();

    assert_eq!(block_on(render_diagrams(&tree, &services, body)).unwrap(), 1);
    assert_eq!(engine.calls.get(), 1);

    let pre = source_block(&tree);
    let found = containers(&tree);
    assert_eq!(found.len(), 1);
    {
        let tree = tree.borrow();
        assert_eq!(tree.next_sibling(pre), Some(found[0]));
        assert!(tree.has_attr(pre, "data-livemark-source-hidden"));
        assert_eq!(tree.get_attr(found[0], "data-livemark-source"), Some("graph TD; A-->B"));
        assert!(button_of(&tree, found[0]).is_some());

        let md = serialize(&tree, tree.body());
        assert_eq!(md, "```mermaid\ngraph TD; A-->B\n```\n\nafter");
    }

    // Rendering again is a no-op.
    assert_eq!(block_on(render_diagrams(&tree, &services, body)).unwrap(), 0);
    assert_eq!(engine.calls.get(), 1);
}

#[test]
fn test_failed_source_retried_only_after_edit() {
    let html = r#"<pre><code class="language-mermaid">graph TD; error</code></pre>"#;
    let (tree, engine, services) = setup(html);
    let pre = source_block(&tree);

    assert_eq!(
        block_on(render_diagram(&tree, &services, pre)).unwrap(),
        DiagramOutcome::Failed
    );
    assert!(containers(&tree).is_empty());
    assert!(!tree.borrow().has_attr(pre, "data-livemark-source-hidden"));

    assert_eq!(
        block_on(render_diagram(&tree, &services, pre)).unwrap(),
        DiagramOutcome::Skipped
    );
    assert_eq!(engine.calls.get(), 1);

    set_source(&tree, "graph TD; fixed-->ok");
    assert_eq!(
        block_on(render_diagram(&tree, &services, pre)).unwrap(),
        DiagramOutcome::Rendered
    );
    assert_eq!(engine.calls.get(), 2);
    assert_eq!(containers(&tree).len(), 1);
}

#[test]
fn test_edited_source_replaces_container() {
    let (tree, engine, services) = setup(ONE_DIAGRAM);
    let pre = source_block(&tree);

    block_on(render_diagram(&tree, &services, pre)).unwrap();
    let first = containers(&tree)[0];

    set_source(&tree, "graph LR; A-->C");
    assert_eq!(
        block_on(render_diagram(&tree, &services, pre)).unwrap(),
        DiagramOutcome::Rendered
    );
    assert_eq!(engine.calls.get(), 2);

    let found = containers(&tree);
    assert_eq!(found.len(), 1);
    assert_ne!(found[0], first);
    let tree = tree.borrow();
    assert!(!tree.is_attached(first));
    assert_eq!(tree.get_attr(found[0], "data-livemark-source"), Some("graph LR; A-->C"));
}

#[test]
fn test_failure_after_success_restores_source() {
    let (tree, _engine, services) = setup(ONE_DIAGRAM);
    let pre = source_block(&tree);

    block_on(render_diagram(&tree, &services, pre)).unwrap();
    set_source(&tree, "graph TD; error");
    assert_eq!(
        block_on(render_diagram(&tree, &services, pre)).unwrap(),
        DiagramOutcome::Failed
    );

    assert!(containers(&tree).is_empty());
    let tree = tree.borrow();
    assert!(!tree.has_attr(pre, "data-livemark-source-hidden"));
    assert_eq!(
        serialize(&tree, tree.body()),
        "```mermaid\ngraph TD; error\n```\n\nafter"
    );
}

#[test]
fn test_concurrent_requests_render_once() {
    let tree = Rc::new(RefCell::new(parse_html(ONE_DIAGRAM)));
    let engine = Rc::new(FakeDiagrams::default());
    let (tx, rx) = oneshot::channel::<Rc<dyn DiagramEngine>>();
    let pending = RefCell::new(Some(rx));
    let slot: EngineSlot<dyn DiagramEngine> = EngineSlot::new("diagram", move || {
        let rx = pending.borrow_mut().take();
        async move {
            match rx {
                Some(rx) => rx.await.map_err(|_| Error::LoadFailure("cancelled".into())),
                None => Err(Error::LoadFailure("already consumed".into())),
            }
        }
        .boxed_local()
    });
    let services = Services::new(
        Config::default(),
        EngineSlot::ready("math", Rc::new(NoMath) as Rc<dyn MathEngine>),
        slot,
    );
    let pre = source_block(&tree);

    let release = {
        let engine = engine.clone();
        async move {
            let _ = tx.send(engine);
        }
    };
    let (first, second, ()) = block_on(futures::future::join3(
        render_diagram(&tree, &services, pre),
        render_diagram(&tree, &services, pre),
        release,
    ));

    assert_eq!(first.unwrap(), DiagramOutcome::Rendered);
    assert_eq!(second.unwrap(), DiagramOutcome::Skipped);
    assert_eq!(engine.calls.get(), 1);
    assert_eq!(services.diagram_engine.load_attempts(), 1);
    assert_eq!(containers(&tree).len(), 1);
}

#[test]
fn test_source_edited_during_load_is_discarded() {
    let tree = Rc::new(RefCell::new(parse_html(ONE_DIAGRAM)));
    let engine = Rc::new(FakeDiagrams::default());
    let (tx, rx) = oneshot::channel::<Rc<dyn DiagramEngine>>();
    let pending = RefCell::new(Some(rx));
    let slot: EngineSlot<dyn DiagramEngine> = EngineSlot::new("diagram", move || {
        let rx = pending.borrow_mut().take();
        async move {
            match rx {
                Some(rx) => rx.await.map_err(|_| Error::LoadFailure("cancelled".into())),
                None => Err(Error::LoadFailure("already consumed".into())),
            }
        }
        .boxed_local()
    });
    let services = Services::new(
        Config::default(),
        EngineSlot::ready("math", Rc::new(NoMath) as Rc<dyn MathEngine>),
        slot,
    );
    let pre = source_block(&tree);

    let edit = {
        let engine = engine.clone();
        let tree = tree.clone();
        async move {
            set_source(&tree, "graph TD; A-->B-->C");
            let _ = tx.send(engine);
        }
    };
    let (result, ()) = block_on(futures::future::join(
        render_diagram(&tree, &services, pre),
        edit,
    ));

    assert_eq!(result, Err(Error::StaleContentRace { node: pre.0 }));
    assert!(containers(&tree).is_empty());

    // The next pass picks up the edited source.
    assert_eq!(
        block_on(render_diagram(&tree, &services, pre)).unwrap(),
        DiagramOutcome::Rendered
    );
    assert_eq!(
        tree.borrow().get_attr(containers(&tree)[0], "data-livemark-source"),
        Some("graph TD; A-->B-->C")
    );
}

#[test]
fn test_diagram_copy_button_copies_fenced_source() {
    let (tree, _engine, services) = setup(ONE_DIAGRAM);
    let pre = source_block(&tree);
    block_on(render_diagram(&tree, &services, pre)).unwrap();

    let container = containers(&tree)[0];
    let button = button_of(&tree.borrow(), container).unwrap();
    let mut clipboard = MemoryClipboard::new();
    let shown = services
        .copy_buttons
        .borrow_mut()
        .click(&mut tree.borrow_mut(), button, &mut clipboard, Instant::now())
        .unwrap();

    assert!(shown);
    assert_eq!(clipboard.contents(), Some("```mermaid\ngraph TD; A-->B\n```"));
}

#[test]
fn test_disabled_diagrams_untouched() {
    let tree = Rc::new(RefCell::new(parse_html(ONE_DIAGRAM)));
    let engine = Rc::new(FakeDiagrams::default());
    let config = Config {
        diagram: false,
        ..Config::default()
    };
    let services = Services::with_engines(config, Rc::new(NoMath), engine.clone());
    let body = tree.borrow().body();

    assert_eq!(block_on(render_diagrams(&tree, &services, body)).unwrap(), 0);
    assert_eq!(engine.calls.get(), 0);
    assert!(containers(&tree).is_empty());
}
