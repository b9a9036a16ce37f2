//! `[editor]` section configuration.
//!
//! Options forwarded to the editor surface. The file editor has no use for
//! most of them; a richer surface would apply them to its widget.
//!
//! ```toml
//! [editor]
//! mode = "text/x-scss"
//! theme = "monokai"
//! line_numbers = false
//! match_brackets = false
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSectionConfig {
    /// Syntax mode (MIME-style).
    pub mode: String,
    pub theme: String,
    pub line_numbers: bool,
    pub match_brackets: bool,
}

impl Default for EditorSectionConfig {
    fn default() -> Self {
        Self {
            mode: "text/x-scss".into(),
            theme: "monokai".into(),
            line_numbers: false,
            match_brackets: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_editor_config() {
        let config = test_parse_config("[editor]\ntheme = \"solarized\"\nline_numbers = true");
        assert_eq!(config.editor.mode, "text/x-scss");
        assert_eq!(config.editor.theme, "solarized");
        assert!(config.editor.line_numbers);
        assert!(!config.editor.match_brackets);
    }
}
