//! Content tree → Markdown serialization.
//!
//! Recursive descent driven by [`classify`]. Each kind returns its own
//! fragment with whatever blank lines it needs around it; the single
//! blank-line collapse at the top level tidies the joins.

use crate::classify::{NodeKind, classify};
use crate::dom::{ContentTree, NodeId};
use crate::markers::{DIAGRAM_LANGUAGE, DIAGRAM_SOURCE_ATTR, TEX_ENCODING};

use super::code::{code_language, code_text, fenced_block};
use super::escape::{calculate_inline_code_ticks, collapse_blank_lines, flatten_table_cell};

const BLOCK_CONTAINER_TAGS: &[&str] = &[
    "html", "body", "div", "section", "article", "main", "header", "footer", "aside", "nav",
    "figure", "figcaption", "details", "summary", "form", "dl", "dt", "dd",
];

/// Serialize the subtree at `root` to Markdown.
///
/// Never mutates the tree and never fails; unknown structures contribute
/// their children's text.
pub fn serialize(tree: &ContentTree, root: NodeId) -> String {
    let ctx = ExtractionContext::new(tree);
    collapse_blank_lines(&ctx.extract(root))
}

/// Per-call serialization state. Holds nothing but the tree, so two calls
/// on the same tree always agree.
pub struct ExtractionContext<'a> {
    tree: &'a ContentTree,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(tree: &'a ContentTree) -> Self {
        Self { tree }
    }

    /// Extract one node without the final cleanup.
    pub fn extract(&self, id: NodeId) -> String {
        match classify(self.tree, id) {
            NodeKind::Ignored => String::new(),
            NodeKind::Text => self.text(id),
            NodeKind::MathRendered { display } => self.math(id, display),
            NodeKind::DiagramRendered => self
                .tree
                .get_attr(id, DIAGRAM_SOURCE_ATTR)
                .map(|source| fenced(Some(DIAGRAM_LANGUAGE), source))
                .unwrap_or_default(),
            NodeKind::Table => self.table(id),
            NodeKind::CodeBlock => {
                let lang = code_language(self.tree, id);
                fenced(lang.as_deref(), &code_text(self.tree, id))
            }
            NodeKind::Heading(level) => {
                let content = self.children(id);
                let content = content.trim();
                if content.is_empty() {
                    return String::new();
                }
                let content = content.replace('\n', " ");
                format!("\n\n{} {}\n\n", "#".repeat(level as usize), content)
            }
            NodeKind::Emphasis => self.wrap_inline(id, "*"),
            NodeKind::Strong => self.wrap_inline(id, "**"),
            NodeKind::Strike => self.wrap_inline(id, "~~"),
            NodeKind::InlineCode => self.inline_code(id),
            NodeKind::Link => self.link(id),
            NodeKind::Image => {
                let src = self.tree.get_attr(id, "src").unwrap_or_default();
                let alt = self.tree.get_attr(id, "alt").unwrap_or_default();
                if src.is_empty() {
                    alt.to_string()
                } else {
                    format!("![{alt}]({src})")
                }
            }
            NodeKind::List { .. } => self.list(id),
            NodeKind::ListItem => self.list_item(id),
            NodeKind::Paragraph => {
                let content = self.children(id);
                let content = content.trim();
                if content.is_empty() {
                    String::new()
                } else {
                    format!("\n\n{content}\n\n")
                }
            }
            NodeKind::LineBreak => "\n".to_string(),
            NodeKind::Quote => self.quote(id),
            NodeKind::Divider => "\n\n---\n\n".to_string(),
            NodeKind::Container => self.children(id),
        }
    }

    fn children(&self, id: NodeId) -> String {
        self.tree
            .children(id)
            .map(|child| self.extract(child))
            .collect()
    }

    fn text(&self, id: NodeId) -> String {
        let Some(text) = self.tree.text(id) else {
            return String::new();
        };
        if text.chars().all(char::is_whitespace) {
            return if text.is_empty() || (text.contains('\n') && self.borders_block(id)) {
                String::new()
            } else {
                " ".to_string()
            };
        }

        let mut text = collapse_whitespace(text);
        if self.next_content(id).is_some_and(|next| self.is_block(next)) {
            text.truncate(text.trim_end().len());
        }
        if self.prev_content(id).is_some_and(|prev| self.is_block(prev)) {
            text = text.trim_start().to_string();
        }
        text
    }

    /// A line-broken whitespace node is layout only when it touches the
    /// parent's edge or a block sibling. Between two inline siblings it is
    /// a word gap.
    fn borders_block(&self, id: NodeId) -> bool {
        let next = std::iter::successors(self.next_content(id), |&next| self.next_content(next))
            .find(|&sibling| !self.is_blank(sibling));

        match (self.prev_content(id), next) {
            // The earlier gap already produced the space.
            (Some(prev), _) if self.is_blank(prev) => true,
            (Some(prev), Some(next)) => self.is_block(prev) || self.is_block(next),
            _ => true,
        }
    }

    fn prev_content(&self, id: NodeId) -> Option<NodeId> {
        std::iter::successors(self.tree.prev_sibling(id), |&prev| self.tree.prev_sibling(prev))
            .find(|&sibling| classify(self.tree, sibling) != NodeKind::Ignored)
    }

    fn next_content(&self, id: NodeId) -> Option<NodeId> {
        std::iter::successors(self.tree.next_sibling(id), |&next| self.tree.next_sibling(next))
            .find(|&sibling| classify(self.tree, sibling) != NodeKind::Ignored)
    }

    fn is_blank(&self, id: NodeId) -> bool {
        self.tree
            .text(id)
            .is_some_and(|text| text.chars().all(char::is_whitespace))
    }

    fn is_block(&self, id: NodeId) -> bool {
        match classify(self.tree, id) {
            NodeKind::MathRendered { display } => display,
            NodeKind::DiagramRendered
            | NodeKind::Table
            | NodeKind::CodeBlock
            | NodeKind::Heading(_)
            | NodeKind::List { .. }
            | NodeKind::ListItem
            | NodeKind::Paragraph
            | NodeKind::LineBreak
            | NodeKind::Quote
            | NodeKind::Divider => true,
            NodeKind::Container => self
                .tree
                .tag(id)
                .is_some_and(|tag| BLOCK_CONTAINER_TAGS.contains(&tag)),
            _ => false,
        }
    }

    fn wrap_inline(&self, id: NodeId, marker: &str) -> String {
        let content = self.children(id);
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        let lead = if content.starts_with(char::is_whitespace) { " " } else { "" };
        let trail = if content.ends_with(char::is_whitespace) { " " } else { "" };
        format!("{lead}{marker}{trimmed}{marker}{trail}")
    }

    fn inline_code(&self, id: NodeId) -> String {
        let code = self.tree.text_content(id).replace('\n', " ");
        if code.trim().is_empty() {
            return String::new();
        }
        let ticks = "`".repeat(calculate_inline_code_ticks(&code));
        // Content touching a backtick needs padding inside the fence
        if code.starts_with('`') || code.ends_with('`') {
            format!("{ticks} {code} {ticks}")
        } else {
            format!("{ticks}{code}{ticks}")
        }
    }

    fn link(&self, id: NodeId) -> String {
        let content = self.children(id);
        let text = content.trim();
        match self.tree.get_attr(id, "href").map(str::trim) {
            Some(href) if is_real_href(href) && !text.is_empty() => format!("[{text}]({href})"),
            Some(href) if is_real_href(href) => format!("<{href}>"),
            _ => text.to_string(),
        }
    }

    fn math(&self, id: NodeId, display: bool) -> String {
        let Some(source) = math_source(self.tree, id) else {
            return String::new();
        };
        if display {
            format!("\n\n$${source}$$\n\n")
        } else {
            format!("${source}$")
        }
    }

    fn quote(&self, id: NodeId) -> String {
        let content = self.children(id);
        let content = collapse_blank_lines(&content);
        if content.is_empty() {
            return String::new();
        }
        let quoted: Vec<String> = content
            .lines()
            .map(|line| {
                if line.trim().is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect();
        format!("\n\n{}\n\n", quoted.join("\n"))
    }

    // ========================================================================
    // Tables
    // ========================================================================

    fn table(&self, table: NodeId) -> String {
        let rows: Vec<Vec<(String, bool)>> = self
            .tree
            .descendants(table)
            .filter(|&id| self.tree.tag(id) == Some("tr") && self.owning_table(id) == Some(table))
            .map(|row| self.table_row(row))
            .filter(|cells| !cells.is_empty())
            .collect();

        if rows.is_empty() {
            return String::new();
        }

        let header_index = rows
            .iter()
            .position(|cells| cells.iter().any(|(_, is_header)| *is_header))
            .unwrap_or(0);

        let mut lines = Vec::with_capacity(rows.len() + 1);
        for (index, cells) in rows.iter().enumerate() {
            let texts: Vec<&str> = cells.iter().map(|(text, _)| text.as_str()).collect();
            lines.push(format!("| {} |", texts.join(" | ")));
            if index == header_index {
                let separator = vec!["---"; cells.len()];
                lines.push(format!("| {} |", separator.join(" | ")));
            }
        }

        format!("\n\n{}\n\n", lines.join("\n"))
    }

    fn table_row(&self, row: NodeId) -> Vec<(String, bool)> {
        self.tree
            .children(row)
            .filter_map(|cell| match self.tree.tag(cell) {
                Some("th") => Some((flatten_table_cell(&self.children(cell)), true)),
                Some("td") => Some((flatten_table_cell(&self.children(cell)), false)),
                _ => None,
            })
            .collect()
    }

    fn owning_table(&self, row: NodeId) -> Option<NodeId> {
        self.tree
            .ancestors(row)
            .find(|&id| self.tree.tag(id) == Some("table"))
    }

    // ========================================================================
    // Lists
    // ========================================================================

    fn list(&self, list: NodeId) -> String {
        let items: Vec<String> = self
            .tree
            .children(list)
            .filter(|&child| classify(self.tree, child) == NodeKind::ListItem)
            .map(|item| self.list_item(item))
            .filter(|item| !item.is_empty())
            .collect();

        if items.is_empty() {
            return String::new();
        }

        let body = items.join("\n");
        if self.list_depth(list) > 1 {
            body
        } else {
            format!("\n\n{body}\n\n")
        }
    }

    fn list_item(&self, item: NodeId) -> String {
        let depth = self.list_depth(item);
        let indent = "  ".repeat(depth.saturating_sub(1));

        let ordered = self
            .tree
            .ancestors(item)
            .find_map(|id| match classify(self.tree, id) {
                NodeKind::List { ordered } => Some(ordered),
                _ => None,
            })
            .unwrap_or(false);

        let marker = if ordered {
            let position = 1 + self
                .siblings_before(item)
                .filter(|&sibling| classify(self.tree, sibling) == NodeKind::ListItem)
                .count();
            format!("{position}. ")
        } else {
            "- ".to_string()
        };

        let mut own = String::new();
        let mut nested = Vec::new();
        self.split_item(item, &mut own, &mut nested);

        let continuation = format!("\n{indent}{}", " ".repeat(marker.len()));
        let own_lines: Vec<&str> = own
            .trim()
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect();

        if own_lines.is_empty() && nested.is_empty() {
            return String::new();
        }

        let mut out = format!("{indent}{marker}{}", own_lines.join(&continuation));
        for list in nested {
            out.push('\n');
            out.push_str(&list);
        }
        out
    }

    /// Separate an item's own content from its nested lists, looking through
    /// plain wrappers so `<li>a<div><ul>..</ul></div></li>` still nests.
    fn split_item(&self, node: NodeId, own: &mut String, nested: &mut Vec<String>) {
        for child in self.tree.children(node) {
            let kind = classify(self.tree, child);
            if kind.is_list() {
                let text = self.list(child);
                if !text.trim().is_empty() {
                    nested.push(text.trim_matches('\n').to_string());
                }
            } else if kind == NodeKind::Container && self.wraps_list(child) {
                self.split_item(child, own, nested);
            } else {
                own.push_str(&self.extract(child));
            }
        }
    }

    fn wraps_list(&self, id: NodeId) -> bool {
        self.tree.children(id).any(|child| match classify(self.tree, child) {
            NodeKind::List { .. } => true,
            NodeKind::Container => self.wraps_list(child),
            _ => false,
        })
    }

    /// Number of list ancestors, counting the item's own list.
    fn list_depth(&self, id: NodeId) -> usize {
        let own = usize::from(classify(self.tree, id).is_list());
        own + self
            .tree
            .ancestors(id)
            .filter(|&ancestor| classify(self.tree, ancestor).is_list())
            .count()
    }

    fn siblings_before(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.tree.prev_sibling(id), |&prev| {
            self.tree.prev_sibling(prev)
        })
    }
}

/// Recover TeX source from rendered math.
///
/// Looks for an `annotation[encoding=application/x-tex]` descendant first,
/// then the wrapper's `data-math-source` or `aria-label`, then a MathML
/// `alttext`.
pub fn math_source(tree: &ContentTree, id: NodeId) -> Option<String> {
    let annotation = tree.descendants(id).find(|&node| {
        tree.tag(node) == Some("annotation") && tree.get_attr(node, "encoding") == Some(TEX_ENCODING)
    });
    if let Some(annotation) = annotation {
        let source = tree.text_content(annotation);
        let source = source.trim();
        if !source.is_empty() {
            return Some(source.to_string());
        }
    }

    std::iter::once(id)
        .chain(tree.descendants(id))
        .find_map(|node| {
            tree.get_attr(node, "data-math-source")
                .or_else(|| tree.get_attr(node, "aria-label"))
                .or_else(|| tree.get_attr(node, "alttext"))
        })
        .map(str::trim)
        .filter(|source| !source.is_empty())
        .map(str::to_string)
}

fn fenced(lang: Option<&str>, body: &str) -> String {
    format!("\n\n{}\n\n", fenced_block(lang, body))
}

fn is_real_href(href: &str) -> bool {
    !href.is_empty()
        && href != "#"
        && !href
            .get(..11)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
}

/// Collapse whitespace runs to one space, keeping line structure: a run
/// that contains a newline becomes that many newlines.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    let mut run_newlines = 0;

    let flush = |out: &mut String, newlines: usize| {
        if newlines == 0 {
            out.push(' ');
        } else {
            out.extend(std::iter::repeat_n('\n', newlines));
        }
    };

    for c in text.chars() {
        if c.is_whitespace() {
            in_run = true;
            if c == '\n' {
                run_newlines += 1;
            }
        } else {
            if in_run {
                flush(&mut out, run_newlines);
                in_run = false;
                run_newlines = 0;
            }
            out.push(c);
        }
    }
    if in_run {
        flush(&mut out, run_newlines);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn md(html: &str) -> String {
        let tree = parse_html(html);
        serialize(&tree, tree.body())
    }

    // ========================================================================
    // Inline
    // ========================================================================

    #[test]
    fn test_inline_markers() {
        assert_eq!(
            md("<p>a <em>b</em> <strong>c</strong> <del>d</del></p>"),
            "a *b* **c** ~~d~~"
        );
    }

    #[test]
    fn test_inline_edge_whitespace_kept_outside() {
        assert_eq!(md("<p>a<em> b </em>c</p>"), "a *b* c");
        assert_eq!(md("<p>a<strong>  </strong>c</p>"), "ac");
    }

    #[test]
    fn test_inline_code_ticks() {
        assert_eq!(md("<p><code>x`y</code></p>"), "``x`y``");
        assert_eq!(md("<p><code>`</code></p>"), "`` ` ``");
    }

    #[test]
    fn test_links() {
        assert_eq!(md(r#"<p><a href="https://a.b">t</a></p>"#), "[t](https://a.b)");
        assert_eq!(md(r##"<p><a href="#">t</a></p>"##), "t");
        assert_eq!(md(r#"<p><a href="JavaScript:void(0)">t</a></p>"#), "t");
        assert_eq!(md("<p><a>t</a></p>"), "t");
    }

    #[test]
    fn test_image() {
        assert_eq!(md(r#"<p><img src="a.png" alt="pic"></p>"#), "![pic](a.png)");
    }

    #[test]
    fn test_whitespace_text() {
        assert_eq!(md("<p>a   b\tc</p>"), "a b c");
        assert_eq!(md("<p>a</p>\n   \n<p>b</p>"), "a\n\nb");
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(md("<h2> Title </h2><p>Body</p>"), "## Title\n\nBody");
        assert_eq!(md("<h1></h1><p>x</p>"), "x");
    }

    #[test]
    fn test_quote() {
        assert_eq!(md("<blockquote><p>a</p><p>b</p></blockquote>"), "> a\n>\n> b");
    }

    #[test]
    fn test_divider_and_break() {
        assert_eq!(md("<p>a<br>b</p><hr><p>c</p>"), "a\nb\n\n---\n\nc");
    }

    #[test]
    fn test_ignored_content() {
        assert_eq!(
            md("<p>x<script>alert(1)</script><button>Copy</button></p>"),
            "x"
        );
    }

    // ========================================================================
    // Code
    // ========================================================================

    #[test]
    fn test_code_fence() {
        assert_eq!(
            md(r#"<pre><code class="language-rust">let x = 1;</code></pre>"#),
            "```rust\nlet x = 1;\n```"
        );
    }

    #[test]
    fn test_code_fence_grows_with_content() {
        assert_eq!(
            md("<pre><code>```\ninner\n```</code></pre>"),
            "````\n```\ninner\n```\n````"
        );
    }

    // ========================================================================
    // Math and diagrams
    // ========================================================================

    #[test]
    fn test_math_annotation() {
        let html = r#"<p>see <span class="katex"><math><semantics><mrow></mrow><annotation encoding="application/x-tex">x^2</annotation></semantics></math><span class="katex-html">x2</span></span> here</p>"#;
        assert_eq!(md(html), "see $x^2$ here");
    }

    #[test]
    fn test_math_aria_label() {
        let html = r#"<p><mjx-container display="true" aria-label="a+b"><svg></svg></mjx-container></p>"#;
        assert_eq!(md(html), "$$a+b$$");
    }

    #[test]
    fn test_math_without_source_is_dropped() {
        assert_eq!(md(r#"<p>a<span class="katex">x</span>b</p>"#), "ab");
    }

    #[test]
    fn test_diagram_source() {
        let html = r#"<div class="livemark-diagram" data-livemark-source="graph TD; A-->B"><svg></svg></div>"#;
        assert_eq!(md(html), "```mermaid\ngraph TD; A-->B\n```");
        assert_eq!(md(r#"<div class="livemark-diagram"><svg></svg></div>"#), "");
    }

    // ========================================================================
    // Tables and lists
    // ========================================================================

    #[test]
    fn test_table_without_header_uses_first_row() {
        assert_eq!(
            md("<table><tr><td>a</td><td>b|c</td></tr><tr><td>1</td><td>2</td></tr></table>"),
            "| a | b\\|c |\n| --- | --- |\n| 1 | 2 |"
        );
    }

    #[test]
    fn test_nested_table_rows_stay_inside() {
        let html = "<table><tr><th>outer</th></tr><tr><td><table><tr><td>in</td></tr></table></td></tr></table>";
        let out = md(html);
        assert_eq!(out.lines().filter(|l| l.starts_with("| outer")).count(), 1);
        assert!(!out.lines().any(|l| l == "| in |"));
    }

    #[test]
    fn test_list_item_continuation() {
        assert_eq!(md("<ul><li><p>a</p><p>b</p></li></ul>"), "- a\n  b");
    }

    #[test]
    fn test_ordered_nested_in_unordered() {
        assert_eq!(
            md("<ul><li>x<ol><li>one</li><li>two</li></ol></li></ul>"),
            "- x\n  1. one\n  2. two"
        );
    }

    #[test]
    fn test_collapse_whitespace_helper() {
        assert_eq!(collapse_whitespace("a  \n  b"), "a\nb");
        assert_eq!(collapse_whitespace("a \t b "), "a b ");
        assert_eq!(collapse_whitespace("a\n\nb"), "a\n\nb");
    }
}
