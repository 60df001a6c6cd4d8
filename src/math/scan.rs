//! Math delimiter scanning.
//!
//! Delimiters are tried in priority order at every candidate position:
//! `$$…$$`, `\[…\]`, `\(…\)`, then `$…$`. A delimiter preceded by an odd
//! number of backslashes is escaped. A single-dollar opener must not be
//! followed by whitespace and its closer must not be preceded by whitespace
//! or followed by another `$`, which keeps prices like `$5 and $10` as text.
//! Empty bodies are never math.

use std::ops::Range;

use memchr::{memchr2, memmem};

/// One math span found in a string. Ranges are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSpan {
    /// Delimiters included.
    pub outer: Range<usize>,
    /// Between the delimiters.
    pub inner: Range<usize>,
    pub display: bool,
}

/// A piece of a tokenized text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Math {
        /// Source between the delimiters, trimmed.
        source: &'a str,
        /// The span as written, delimiters included.
        raw: &'a str,
        display: bool,
    },
}

/// Find every math span in `text`, left to right, non-overlapping.
pub fn find_math_spans(text: &str) -> Vec<MathSpan> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(offset) = memchr2(b'$', b'\\', &bytes[pos..]) {
        let at = pos + offset;
        if is_escaped(bytes, at) {
            pos = at + 1;
            continue;
        }

        match match_at(bytes, at) {
            Step::Span(span) => {
                pos = span.outer.end;
                spans.push(span);
            }
            Step::Skip(next) => pos = next,
        }
    }

    spans
}

/// Split `text` into alternating text and math tokens.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for span in find_math_spans(text) {
        if span.outer.start > last {
            tokens.push(Token::Text(&text[last..span.outer.start]));
        }
        tokens.push(Token::Math {
            source: text[span.inner.clone()].trim(),
            raw: &text[span.outer.clone()],
            display: span.display,
        });
        last = span.outer.end;
    }

    if last < text.len() {
        tokens.push(Token::Text(&text[last..]));
    }
    tokens
}

/// Cheap pre-check: could `text` contain any math at all?
pub fn may_contain_math(text: &str) -> bool {
    let bytes = text.as_bytes();
    memchr::memchr(b'$', bytes).is_some()
        || memmem::find(bytes, b"\\(").is_some()
        || memmem::find(bytes, b"\\[").is_some()
}

enum Step {
    Span(MathSpan),
    Skip(usize),
}

fn match_at(bytes: &[u8], at: usize) -> Step {
    let rest = &bytes[at..];

    if rest.starts_with(b"$$") {
        return match find_closer(bytes, at + 2, b"$$") {
            Some(close) if has_body(bytes, at + 2, close) => {
                Step::Span(span(at, 2, close, 2, true))
            }
            Some(close) => Step::Skip(close + 2),
            None => Step::Skip(at + 2),
        };
    }
    if rest.starts_with(b"\\[") {
        return match find_closer(bytes, at + 2, b"\\]") {
            Some(close) if has_body(bytes, at + 2, close) => {
                Step::Span(span(at, 2, close, 2, true))
            }
            _ => Step::Skip(at + 2),
        };
    }
    if rest.starts_with(b"\\(") {
        return match find_closer(bytes, at + 2, b"\\)") {
            Some(close) if has_body(bytes, at + 2, close) => {
                Step::Span(span(at, 2, close, 2, false))
            }
            _ => Step::Skip(at + 2),
        };
    }
    if rest[0] == b'$' {
        return match single_dollar_closer(bytes, at) {
            Some(close) if has_body(bytes, at + 1, close) => {
                Step::Span(span(at, 1, close, 1, false))
            }
            _ => Step::Skip(at + 1),
        };
    }

    // A lone backslash that opens nothing; skip past whatever it escapes.
    Step::Skip((at + 2).min(bytes.len()))
}

fn span(at: usize, open: usize, close: usize, close_len: usize, display: bool) -> MathSpan {
    MathSpan {
        outer: at..close + close_len,
        inner: at + open..close,
        display,
    }
}

fn has_body(bytes: &[u8], start: usize, end: usize) -> bool {
    bytes[start..end].iter().any(|b| !b.is_ascii_whitespace())
}

/// First unescaped occurrence of `closer` at or after `from`.
fn find_closer(bytes: &[u8], from: usize, closer: &[u8]) -> Option<usize> {
    let finder = memmem::Finder::new(closer);
    let mut pos = from;
    while let Some(offset) = finder.find(&bytes[pos..]) {
        let at = pos + offset;
        if !is_escaped(bytes, at) {
            return Some(at);
        }
        pos = at + 1;
    }
    None
}

fn single_dollar_closer(bytes: &[u8], open: usize) -> Option<usize> {
    let first = *bytes.get(open + 1)?;
    if first.is_ascii_whitespace() {
        return None;
    }

    let mut pos = open + 1;
    while let Some(offset) = memchr::memchr(b'$', &bytes[pos..]) {
        let at = pos + offset;
        if is_escaped(bytes, at) {
            pos = at + 1;
            continue;
        }
        if bytes.get(at + 1) == Some(&b'$') {
            // Part of a `$$`; never a single-dollar closer.
            pos = at + 2;
            continue;
        }
        if bytes[at - 1].is_ascii_whitespace() {
            pos = at + 1;
            continue;
        }
        return Some(at);
    }
    None
}

/// Odd number of backslashes directly before `at`.
fn is_escaped(bytes: &[u8], at: usize) -> bool {
    bytes[..at]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count()
        % 2
        == 1
}
