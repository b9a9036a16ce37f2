//! `[display]` section configuration.
//!
//! ```toml
//! [display]
//! output = "preview.css"   # omit to show output in the terminal
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// File receiving the compiled output verbatim.
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::test_parse_config;

    #[test]
    fn test_display_config() {
        assert_eq!(test_parse_config("").display.output, None);

        let config = test_parse_config("[display]\noutput = \"out.css\"");
        assert_eq!(config.display.output, Some(PathBuf::from("out.css")));
    }
}
