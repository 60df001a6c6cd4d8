//! Class names and attributes shared between the renderers, the injector and
//! the classifier.
//!
//! Everything the crate injects into the host tree is tagged with one of
//! these so later scans (and the serializer) can recognise it.

/// Class on injected copy buttons; also part of the classifier skip-list.
pub const COPY_BUTTON_CLASS: &str = "livemark-copy-button";
/// Attribute marking a control as already wired up.
pub const BOUND_ATTR: &str = "data-livemark-bound";
/// Class on a copy button while its success feedback is showing.
pub const COPIED_CLASS: &str = "livemark-copied";

/// Class on every math container the math renderer creates.
pub const MATH_CLASS: &str = "livemark-math";
pub const MATH_INLINE_CLASS: &str = "livemark-math-inline";
pub const MATH_DISPLAY_CLASS: &str = "livemark-math-display";
/// Added to a math container that holds the literal fallback text.
pub const MATH_ERROR_CLASS: &str = "livemark-math-error";
/// Annotation encoding carrying TeX source inside rendered math.
pub const TEX_ENCODING: &str = "application/x-tex";

/// Class on diagram result containers.
pub const DIAGRAM_CLASS: &str = "livemark-diagram";
/// Attribute on a diagram container holding the cached diagram source.
pub const DIAGRAM_SOURCE_ATTR: &str = "data-livemark-source";
/// Attribute hiding a diagram's source block while its render is shown.
pub const SOURCE_HIDDEN_ATTR: &str = "data-livemark-source-hidden";
/// Fenced-code language that identifies diagram source.
pub const DIAGRAM_LANGUAGE: &str = "mermaid";
