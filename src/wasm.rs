//! WASM bindings for in-page Markdown export.
//!
//! This module exposes the serializer and stylesheet builder to JavaScript via
//! wasm-bindgen.

use wasm_bindgen::prelude::*;

use crate::config::Config;

/// Initialize panic hook for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Convert an HTML snapshot of rendered content to Markdown.
#[wasm_bindgen(js_name = htmlToMarkdown)]
pub fn html_to_markdown(html: &str) -> String {
    crate::html_to_markdown(html)
}

/// Stylesheet for the given configuration JSON. Malformed configuration
/// falls back to defaults.
#[wasm_bindgen]
pub fn stylesheet(config_json: &str) -> String {
    Config::from_json(config_json).stylesheet()
}

/// Validate configuration JSON, returning the normalized form.
#[wasm_bindgen(js_name = normalizeConfig)]
pub fn normalize_config(config_json: &str) -> Result<String, JsValue> {
    let config = Config::parse(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&config).map_err(|e| JsValue::from_str(&e.to_string()))
}
