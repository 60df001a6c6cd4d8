//! Math typesetting engines.

use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::error::Result;

/// Turns TeX source into markup the host can display.
pub trait MathEngine {
    /// Typeset `source` (without delimiters). The returned markup is parsed
    /// into the tree as HTML.
    fn typeset(&self, source: &str, display: bool) -> Result<String>;
}

/// Loader for the built-in engine, or one that always fails when the crate
/// was built without it.
pub fn default_loader() -> LocalBoxFuture<'static, Result<Rc<dyn MathEngine>>> {
    async {
        #[cfg(feature = "latex")]
        {
            Ok(Rc::new(LatexEngine::new()) as Rc<dyn MathEngine>)
        }
        #[cfg(not(feature = "latex"))]
        {
            Err(crate::error::Error::LoadFailure(
                "built without a math engine (enable the `latex` feature)".into(),
            ))
        }
    }
    .boxed_local()
}

#[cfg(feature = "latex")]
pub use latex::LatexEngine;

#[cfg(feature = "latex")]
mod latex {
    use pulldown_latex::config::{DisplayMode, RenderConfig};
    use pulldown_latex::mathml::push_mathml;
    use pulldown_latex::{Parser, Storage};

    use super::MathEngine;
    use crate::error::{Error, Result};

    /// MathML output via `pulldown-latex`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LatexEngine;

    impl LatexEngine {
        pub fn new() -> Self {
            Self
        }
    }

    impl MathEngine for LatexEngine {
        fn typeset(&self, source: &str, display: bool) -> Result<String> {
            let storage = Storage::new();
            let parser = Parser::new(source, &storage);
            let config = RenderConfig {
                display_mode: if display {
                    DisplayMode::Block
                } else {
                    DisplayMode::Inline
                },
                ..Default::default()
            };

            let events: Vec<_> = parser.collect();
            let errors: Vec<String> = events
                .iter()
                .filter_map(|e| e.as_ref().err().map(|err| err.to_string()))
                .collect();
            if !errors.is_empty() {
                return Err(Error::RenderFailure(errors.join("; ")));
            }

            let mut mathml = String::new();
            push_mathml(&mut mathml, events.into_iter(), config)
                .map_err(|e| Error::RenderFailure(e.to_string()))?;
            Ok(mathml)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_typeset_inline() {
            let markup = LatexEngine::new().typeset("x^2", false).unwrap();
            assert!(markup.contains("<math"));
        }

        #[test]
        fn test_typeset_error() {
            let result = LatexEngine::new().typeset(r"\frac{a", true);
            assert!(matches!(result, Err(Error::RenderFailure(_))));
        }
    }
}
