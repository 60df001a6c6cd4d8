//! # livemark
//!
//! Markdown export and incremental math/diagram rendering for live,
//! streaming chat content.
//!
//! ## Features
//!
//! - Serialize rendered rich content (tables, code, lists, KaTeX/MathJax
//!   math, rendered diagrams) back into portable Markdown
//! - Render `$…$`/`$$…$$` math and ```` ```mermaid ```` blocks in place as
//!   content streams in, without reprocessing unchanged content
//! - Attach copy-as-Markdown buttons to content blocks
//!
//! ## Quick Start
//!
//! ```
//! use livemark::{parse_html, serialize};
//!
//! let tree = parse_html("<h2>Result</h2><p>It is <strong>done</strong>.</p>");
//! assert_eq!(serialize(&tree, tree.body()), "## Result\n\nIt is **done**.");
//! ```
//!
//! ## Live Rendering
//!
//! A [`Scheduler`] watches one root of a shared [`ContentTree`] and turns
//! its mutations into coalesced render passes:
//!
//! ```no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use livemark::{Config, Scheduler, Services, parse_html};
//!
//! # async fn example() {
//! let tree = Rc::new(RefCell::new(parse_html(
//!     r#"<div class="markdown-body"><p>Euler: $e^{i\pi}+1=0$</p></div>"#,
//! )));
//! let services = Rc::new(Services::with_default_engines(Config::default()));
//! let mut scheduler = Scheduler::new(tree.clone(), services);
//!
//! let body = tree.borrow().body();
//! scheduler.bind(body);
//! scheduler.on_frame().await;
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod copy;
pub mod diagram;
pub mod dom;
pub mod engine;
pub mod error;
pub mod markdown;
pub mod markers;
pub mod math;
pub mod scheduler;
pub mod services;
pub mod state;

#[cfg(feature = "driver")]
pub mod driver;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use classify::{NodeKind, classify};
pub use config::{Config, CopyButtonPlacement, CopyButtonStyle};
pub use copy::{Clipboard, CopyButtons, CopyTarget, MemoryClipboard};
pub use diagram::DiagramEngine;
pub use dom::{ContentTree, NodeId, SharedTree, parse_html};
pub use engine::EngineSlot;
pub use error::{Error, Result};
pub use markdown::serialize;
pub use math::MathEngine;
pub use scheduler::{Flush, FlushReport, PendingScanSet, Scheduler, SweepReport};
pub use services::Services;
pub use state::{RenderState, RenderStates};

/// Convert an HTML snapshot to Markdown.
///
/// ```
/// assert_eq!(livemark::html_to_markdown("<ul><li>a</li><li>b</li></ul>"), "- a\n- b");
/// ```
pub fn html_to_markdown(html: &str) -> String {
    let tree = parse_html(html);
    serialize(&tree, tree.body())
}
