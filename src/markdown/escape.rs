//! Pure string helpers for Markdown output.
//!
//! Fence and tick sizing for code, table-cell flattening, and the final
//! blank-line cleanup.

/// Calculate the minimum fence length needed for a code block.
///
/// Returns the smallest number of fence characters (at least 3) that
/// doesn't appear as a run in the content.
///
/// # Examples
///
/// ```
/// use livemark::markdown::calculate_fence_length;
///
/// // Normal content needs 3 backticks
/// assert_eq!(calculate_fence_length("let x = 1;", '`'), 3);
///
/// // Content with 3 backticks needs 4
/// assert_eq!(calculate_fence_length("```rust\ncode\n```", '`'), 4);
/// ```
pub fn calculate_fence_length(content: &str, fence_char: char) -> usize {
    longest_run(content, fence_char).max(2) + 1
}

/// Calculate the minimum backtick count needed for inline code.
///
/// # Examples
///
/// ```
/// use livemark::markdown::calculate_inline_code_ticks;
///
/// assert_eq!(calculate_inline_code_ticks("code"), 1);
/// assert_eq!(calculate_inline_code_ticks("code with ` backtick"), 2);
/// ```
pub fn calculate_inline_code_ticks(content: &str) -> usize {
    longest_run(content, '`') + 1
}

fn longest_run(content: &str, target: char) -> usize {
    let mut max_run = 0;
    let mut current_run = 0;

    for c in content.chars() {
        if c == target {
            current_run += 1;
            max_run = max_run.max(current_run);
        } else {
            current_run = 0;
        }
    }

    max_run
}

/// Flatten a table cell onto one line and escape pipes. Each line break,
/// blank lines included, becomes a single space.
///
/// ```
/// use livemark::markdown::flatten_table_cell;
///
/// assert_eq!(flatten_table_cell(" a\nb | c "), "a b \\| c");
/// ```
pub fn flatten_table_cell(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        for c in line.chars() {
            match c {
                '|' => out.push_str("\\|"),
                _ => out.push(c),
            }
        }
    }
    out
}

/// Strip trailing spaces and tabs from every line, collapse runs of three
/// or more newlines to exactly two, then trim.
///
/// ```
/// use livemark::markdown::collapse_blank_lines;
///
/// assert_eq!(collapse_blank_lines("\n\na \n\n\t\n\nb\n"), "a\n\nb");
/// ```
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending = String::new();
    let mut newlines = 0;

    for c in text.chars() {
        match c {
            '\n' => {
                pending.clear();
                newlines += 1;
                if newlines <= 2 {
                    out.push(c);
                }
            }
            ' ' | '\t' => pending.push(c),
            _ => {
                newlines = 0;
                out.push_str(&pending);
                pending.clear();
                out.push(c);
            }
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_length() {
        assert_eq!(calculate_fence_length("", '`'), 3);
        assert_eq!(calculate_fence_length("````", '`'), 5);
        assert_eq!(calculate_fence_length("~~~", '`'), 3);
    }

    #[test]
    fn test_inline_ticks() {
        assert_eq!(calculate_inline_code_ticks("a `` b"), 3);
    }

    #[test]
    fn test_flatten_cell() {
        assert_eq!(flatten_table_cell("x\r\ny"), "x y");
        assert_eq!(flatten_table_cell("a|b"), "a\\|b");
        assert_eq!(flatten_table_cell("one\n\n\n\ntwo"), "one two");
    }

    #[test]
    fn test_collapse_keeps_double_newlines() {
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\nb"), "a\nb");
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb\n\n\nc"), "a\n\nb\n\nc");
        assert_eq!(collapse_blank_lines("  \n\n  "), "");
        assert_eq!(collapse_blank_lines("call \n\n```rust\nfoo()  \n```"), "call\n\n```rust\nfoo()\n```");
        assert_eq!(collapse_blank_lines("a \n \n\t\n \nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("- a\n  - b"), "- a\n  - b");
    }
}
