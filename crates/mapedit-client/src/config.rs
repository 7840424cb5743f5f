//! Page-embedded editor configuration.

use mapedit_core::{EditorConfig, EditorError};

pub const CONFIG_ELEMENT_ID: &str = "mapedit-config";

/// Reads the JSON configuration from `<script id="mapedit-config">`.
///
/// Returns `Ok(None)` when the page carries no configuration element.
pub fn read_config() -> Result<Option<EditorConfig>, EditorError> {
    let Some(element) = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id(CONFIG_ELEMENT_ID))
    else {
        return Ok(None);
    };
    let json = element.text_content().unwrap_or_default();
    if json.trim().is_empty() {
        return Ok(None);
    }
    EditorConfig::from_json(&json).map(Some)
}
