//! `[session]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [session]
//! seed = "h2 { color: red; }"
//! seed_output = "h2 { color: red; }"
//! compile_seed = false
//! ```

use serde::{Deserialize, Serialize};

/// Initial document state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Source shown in the editor before the first edit.
    pub seed: String,

    /// Output shown before the first compile completes.
    pub seed_output: String,

    /// Compile the seed right away instead of trusting `seed_output`.
    pub compile_seed: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: "$borderColor: #3FBF3F;\n\nh2 {\n\tborder: 2px solid $borderColor;\n}".into(),
            seed_output: "h2 {\n\tborder: 2px solid #3FBF3F;\n}".into(),
            compile_seed: false,
        }
    }
}
