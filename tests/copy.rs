//! Copy-button injection and click handling.

use std::time::Duration;

use web_time::Instant;

use livemark::config::{CopyButtonPlacement, CopyButtonStyle};
use livemark::copy::{FEEDBACK_DURATION, button_of};
use livemark::{Config, ContentTree, CopyButtons, CopyTarget, Error, MemoryClipboard, NodeId, parse_html};

fn blocks(tree: &ContentTree, class: &str) -> Vec<NodeId> {
    tree.descendants(tree.document())
        .filter(|&id| tree.has_class(id, class))
        .collect()
}

#[test]
fn test_only_innermost_blocks_get_buttons() {
    let mut tree = parse_html(
        r#"<article><div class="chat-message"><div class="markdown-body"><p>answer</p></div></div></article>"#,
    );
    let mut buttons = CopyButtons::new();
    let body = tree.body();

    assert_eq!(buttons.inject(&mut tree, body, &Config::default()), 1);
    let block = blocks(&tree, "markdown-body")[0];
    assert!(button_of(&tree, block).is_some());
    assert!(button_of(&tree, blocks(&tree, "chat-message")[0]).is_none());
    assert_eq!(buttons.target(button_of(&tree, block).unwrap()), Some(&CopyTarget::Block(block)));
}

#[test]
fn test_blank_blocks_skipped() {
    let mut tree = parse_html(
        r#"<div class="prose">   </div><div class="prose"><button>Regenerate</button></div><div class="prose"><p>x</p></div>"#,
    );
    let mut buttons = CopyButtons::new();
    let body = tree.body();

    assert_eq!(buttons.inject(&mut tree, body, &Config::default()), 1);
    let proses = blocks(&tree, "prose");
    assert!(button_of(&tree, proses[0]).is_none());
    assert!(button_of(&tree, proses[1]).is_none());
    assert!(button_of(&tree, proses[2]).is_some());
}

#[test]
fn test_placement_and_label() {
    let config = Config {
        copy_button_placement: CopyButtonPlacement::Bottom,
        copy_button_style: CopyButtonStyle::Custom,
        copy_button_custom_text: " Copy MD ".to_string(),
        copy_button_smart_hover: false,
        ..Config::default()
    };
    let mut tree = parse_html(r#"<div class="markdown-body"><p>a</p><p>b</p></div>"#);
    let mut buttons = CopyButtons::new();
    let body = tree.body();
    buttons.inject(&mut tree, body, &config);

    let block = blocks(&tree, "markdown-body")[0];
    let button = button_of(&tree, block).unwrap();
    assert_eq!(tree.children(block).last(), Some(button));
    assert_eq!(tree.text_content(button), "Copy MD");
    assert!(tree.has_class(button, "livemark-copy-bottom"));
    assert!(!tree.has_class(button, "livemark-smart-hover"));
}

#[test]
fn test_float_buttons_come_first() {
    let mut tree = parse_html(r#"<div class="markdown-body"><p>a</p></div>"#);
    let mut buttons = CopyButtons::new();
    let body = tree.body();
    buttons.inject(&mut tree, body, &Config::default());

    let block = blocks(&tree, "markdown-body")[0];
    let button = button_of(&tree, block).unwrap();
    assert_eq!(tree.children(block).next(), Some(button));
    assert!(tree.has_class(button, "livemark-copy-float"));
    assert!(tree.has_class(button, "livemark-smart-hover"));
    assert_eq!(tree.get_attr(button, "type"), Some("button"));
}

#[test]
fn test_click_copies_markdown_at_click_time() {
    let mut tree = parse_html(r#"<div class="markdown-body"><p>Hello <strong>world</strong></p></div>"#);
    let mut buttons = CopyButtons::new();
    let body = tree.body();
    buttons.inject(&mut tree, body, &Config::default());
    let block = blocks(&tree, "markdown-body")[0];
    let button = button_of(&tree, block).unwrap();

    // Content that streams in after injection is part of the copy.
    let p = tree.find_by_tag("p").unwrap();
    tree.append_text(p, "!");

    let mut clipboard = MemoryClipboard::new();
    let now = Instant::now();
    assert!(buttons.click(&mut tree, button, &mut clipboard, now).unwrap());
    assert_eq!(clipboard.contents(), Some("Hello **world**!"));
    assert!(tree.has_class(button, "livemark-copied"));

    // A second click copies again but does not restart the feedback.
    assert!(!buttons.click(&mut tree, button, &mut clipboard, now + Duration::from_millis(500)).unwrap());
    assert_eq!(clipboard.writes().len(), 2);
    assert_eq!(buttons.expire(&mut tree, now + FEEDBACK_DURATION), 1);
    assert!(!buttons.is_showing_feedback(button));
    assert!(!tree.has_class(button, "livemark-copied"));
}

#[test]
fn test_click_errors() {
    let mut tree = parse_html(r#"<div class="markdown-body"><p>x</p></div>"#);
    let mut buttons = CopyButtons::new();
    let body = tree.body();
    buttons.inject(&mut tree, body, &Config::default());
    let block = blocks(&tree, "markdown-body")[0];
    let button = button_of(&tree, block).unwrap();
    let mut clipboard = MemoryClipboard::new();

    let p = tree.find_by_tag("p").unwrap();
    assert!(matches!(
        buttons.click(&mut tree, p, &mut clipboard, Instant::now()),
        Err(Error::Clipboard(_))
    ));

    tree.remove(block);
    assert_eq!(
        buttons.click(&mut tree, button, &mut clipboard, Instant::now()),
        Err(Error::StaleContentRace { node: block.0 })
    );
    assert!(clipboard.contents().is_none());
}

#[test]
fn test_buttons_excluded_from_serialization() {
    let mut tree = parse_html(r#"<div class="markdown-body"><p>keep</p></div>"#);
    let mut buttons = CopyButtons::new();
    let body = tree.body();
    buttons.inject(&mut tree, body, &Config::default());

    assert_eq!(livemark::serialize(&tree, tree.body()), "keep");
    assert_eq!(buttons.inject(&mut tree, body, &Config::default()), 0);
}

#[test]
fn test_leftover_button_rewired_after_clear() {
    let mut tree = parse_html(r#"<div class="markdown-body"><p>kept</p></div>"#);
    let mut buttons = CopyButtons::new();
    let body = tree.body();
    buttons.inject(&mut tree, body, &Config::default());
    let block = blocks(&tree, "markdown-body")[0];
    let button = button_of(&tree, block).unwrap();
    tree.add_class(button, "livemark-copied");

    buttons.clear();
    assert!(buttons.target(button).is_none());

    assert_eq!(buttons.inject(&mut tree, body, &Config::default()), 0);
    assert_eq!(buttons.target(button), Some(&CopyTarget::Block(block)));
    assert!(!tree.has_class(button, "livemark-copied"));

    let mut clipboard = MemoryClipboard::new();
    assert!(buttons.click(&mut tree, button, &mut clipboard, Instant::now()).unwrap());
    assert_eq!(clipboard.contents(), Some("kept"));
}
