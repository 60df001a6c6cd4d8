//! Rendered content → Markdown.
//!
//! - [`escape`]: pure string helpers (fence sizing, cell flattening, cleanup)
//! - [`code`]: code-block language and source extraction
//! - [`serialize`]: the classifier-driven recursive serializer
//!
//! ## Design Notes
//!
//! Serialization is the inverse of what a Markdown renderer produced, so it
//! aims for text a renderer would turn back into the same structure rather
//! than for a canonical form:
//!
//! - **No text escaping**: copied text keeps its literal characters
//! - **Dynamic code fence length**: fences are always longer than any
//!   backtick run in the body
//! - **Blank-line discipline**: block fragments carry their own surrounding
//!   blank lines and a single top-level pass collapses the excess

pub mod code;
mod escape;
mod serialize;

pub use code::{code_language, code_text, fenced_block};
pub use escape::{
    calculate_fence_length, calculate_inline_code_ticks, collapse_blank_lines, flatten_table_cell,
};
pub use serialize::{ExtractionContext, math_source, serialize};
