//! Runtime feature flags.
//!
//! The configuration is written by an external settings tool as JSON and is
//! read-only to this crate. Missing fields take their defaults and unknown
//! fields are ignored; anything that fails to parse yields
//! [`Config::default`].

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Where copy buttons are placed inside their block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyButtonPlacement {
    /// Floating in the block's top corner (inserted as first child).
    #[default]
    Float,
    /// Below the block's content (inserted as last child).
    Bottom,
}

/// How copy buttons are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyButtonStyle {
    #[default]
    Icon,
    Text,
    Custom,
}

/// Feature flags consumed by the renderers and the copy-button injector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub math: bool,
    /// Diagram rendering. The settings tool writes this as `mermaid`.
    #[serde(alias = "mermaid")]
    pub diagram: bool,
    #[serde(rename = "copyButton")]
    pub copy_button: bool,
    #[serde(rename = "tableColor")]
    pub table_color: bool,
    #[serde(rename = "fontSizeEnabled")]
    pub font_size_enabled: bool,
    #[serde(rename = "fontSize")]
    pub font_size: f32,
    /// Cap content width at `max_width_ratio` percent of the panel.
    #[serde(rename = "maxWidthEnabled")]
    pub max_width_enabled: bool,
    #[serde(rename = "maxWidthRatio")]
    pub max_width_ratio: f32,
    #[serde(rename = "copyButtonSmartHover")]
    pub copy_button_smart_hover: bool,
    #[serde(rename = "copyButtonShowBottom")]
    pub copy_button_placement: CopyButtonPlacement,
    #[serde(rename = "copyButtonStyle")]
    pub copy_button_style: CopyButtonStyle,
    #[serde(rename = "copyButtonCustomText")]
    pub copy_button_custom_text: String,
    /// Classes marking self-contained content blocks (messages, answers).
    #[serde(rename = "contentClasses")]
    pub content_classes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            math: true,
            diagram: true,
            copy_button: true,
            table_color: true,
            font_size_enabled: true,
            font_size: 16.0,
            max_width_enabled: true,
            max_width_ratio: 75.0,
            copy_button_smart_hover: true,
            copy_button_placement: CopyButtonPlacement::Float,
            copy_button_style: CopyButtonStyle::Icon,
            copy_button_custom_text: String::new(),
            content_classes: ["markdown-body", "prose", "message-content", "chat-message"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl Config {
    /// Parse configuration JSON, strictly.
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse configuration JSON, falling back to defaults on any error.
    pub fn from_json(json: &str) -> Self {
        Self::parse(json).unwrap_or_else(|err| {
            warn!("ignoring malformed configuration: {err}");
            Self::default()
        })
    }

    /// Read configuration from a file, falling back to defaults when the file
    /// is missing or malformed.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(err) => {
                warn!("cannot read configuration {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Label for injected copy buttons.
    pub fn copy_button_label(&self) -> &str {
        match self.copy_button_style {
            CopyButtonStyle::Icon => "\u{29c9}",
            CopyButtonStyle::Text => "Copy",
            CopyButtonStyle::Custom if self.copy_button_custom_text.trim().is_empty() => "Copy",
            CopyButtonStyle::Custom => self.copy_button_custom_text.trim(),
        }
    }

    /// Stylesheet the host injects alongside the rendered content.
    pub fn stylesheet(&self) -> String {
        let mut css = String::new();

        css.push_str("[data-livemark-source-hidden] { display: none !important; }\n");
        css.push_str(".livemark-math-display { display: block; text-align: center; margin: 0.5em 0; }\n");
        css.push_str(".livemark-math annotation { display: none; }\n");
        css.push_str(".livemark-math-error { color: #c0392b; font-family: monospace; }\n");
        css.push_str(".livemark-diagram { position: relative; overflow-x: auto; }\n");

        let selector = self
            .content_classes
            .iter()
            .map(|class| format!(".{class}"))
            .collect::<Vec<_>>()
            .join(", ");

        if self.font_size_enabled && !selector.is_empty() {
            let _ = writeln!(css, "{selector} {{ font-size: {}px; }}", self.font_size);
        }

        // Out-of-range ratios leave the width alone.
        if self.max_width_enabled
            && !selector.is_empty()
            && self.max_width_ratio > 0.0
            && self.max_width_ratio <= 100.0
        {
            let _ = writeln!(
                css,
                "{selector} {{ max-width: {}%; margin-left: auto; margin-right: auto; }}",
                self.max_width_ratio
            );
        }

        if self.table_color {
            css.push_str("table th { background: rgba(80, 140, 220, 0.18); }\n");
            css.push_str("table tr:nth-child(even) td { background: rgba(127, 127, 127, 0.08); }\n");
        }

        if self.copy_button {
            css.push_str(".livemark-copy-button { cursor: pointer; border: none; background: transparent; }\n");
            match self.copy_button_placement {
                CopyButtonPlacement::Float => css.push_str(
                    ".livemark-copy-float { position: absolute; top: 4px; right: 4px; }\n",
                ),
                CopyButtonPlacement::Bottom => css.push_str(
                    ".livemark-copy-bottom { display: block; margin-top: 4px; }\n",
                ),
            }
            if self.copy_button_smart_hover {
                css.push_str(".livemark-smart-hover { opacity: 0; transition: opacity 0.15s; }\n");
                css.push_str("*:hover > .livemark-smart-hover { opacity: 1; }\n");
            }
            css.push_str(".livemark-copy-button.livemark-copied { color: #27ae60; }\n");
        }

        css
    }
}
