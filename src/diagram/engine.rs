//! Diagram rendering engines.

use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::error::Result;

/// Turns diagram source into SVG markup.
pub trait DiagramEngine {
    /// Render `source`. Invalid source is a [`ParseFailure`]; anything else
    /// that goes wrong is a [`RenderFailure`].
    ///
    /// [`ParseFailure`]: crate::Error::ParseFailure
    /// [`RenderFailure`]: crate::Error::RenderFailure
    fn render(&self, source: &str) -> Result<String>;
}

/// Loader for the built-in engine, or one that always fails when the crate
/// was built without it.
pub fn default_loader() -> LocalBoxFuture<'static, Result<Rc<dyn DiagramEngine>>> {
    async {
        #[cfg(feature = "mermaid")]
        {
            Ok(Rc::new(MermaidEngine::new()) as Rc<dyn DiagramEngine>)
        }
        #[cfg(not(feature = "mermaid"))]
        {
            Err(crate::error::Error::LoadFailure(
                "built without a diagram engine (enable the `mermaid` feature)".into(),
            ))
        }
    }
    .boxed_local()
}

#[cfg(feature = "mermaid")]
pub use mermaid::MermaidEngine;

#[cfg(feature = "mermaid")]
mod mermaid {
    use mermaid_rs_renderer::{LayoutConfig, RenderOptions, Theme};

    use super::DiagramEngine;
    use crate::error::{Error, Result};

    /// SVG output via `mermaid-rs-renderer`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct MermaidEngine;

    impl MermaidEngine {
        pub fn new() -> Self {
            Self
        }
    }

    impl DiagramEngine for MermaidEngine {
        fn render(&self, source: &str) -> Result<String> {
            let options = RenderOptions {
                theme: Theme::modern(),
                layout: LayoutConfig::default(),
            };
            mermaid_rs_renderer::render_with_options(source, options)
                .map_err(|e| Error::ParseFailure(e.to_string()))
        }
    }

}
