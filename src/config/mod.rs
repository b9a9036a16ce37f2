//! Preview configuration management for `stylepad.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [session] [compile] [editor] [display]
//! ├── types/         # ConfigError, FieldPath, global handle
//! ├── util.rs        # config file lookup
//! └── mod.rs         # PreviewConfig (this file)
//! ```
//!
//! The config file is optional: without one every section uses its
//! defaults and the project root is the current directory.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{
    CompileConfig, DisplayConfig, EditorSectionConfig, EngineKind, SessionConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath, cfg, init_config};

use crate::cli::{Cli, Commands, EngineArgs};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing stylepad.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Directory relative paths resolve against (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Seed document
    #[serde(default)]
    pub session: SessionConfig,

    /// Compile pipeline
    #[serde(default)]
    pub compile: CompileConfig,

    /// Editor surface options
    #[serde(default)]
    pub editor: EditorSectionConfig,

    /// Display surface
    #[serde(default)]
    pub display: DisplayConfig,
}

impl PreviewConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file; the project root is
    /// the config file's parent directory (or cwd when there is none).
    pub fn load(cli: &Cli) -> Result<Self> {
        crate::logger::set_verbose(cli.verbose);

        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let mut diag = ConfigDiagnostics::new();

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path, &mut diag)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = Some(path);
                config
            }
            None => {
                crate::debug!("config"; "no {} found, using defaults", cli.config.display());
                Self {
                    root: cwd,
                    ..Self::default()
                }
            }
        };

        if let Some(path) = &config.config_path {
            crate::debug!("config"; "using {}", path.display());
        }
        config.normalize_paths();
        config.apply_command_options(cli);
        config.validate(diag)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path, diag: &mut ConfigDiagnostics) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        for field in ignored {
            diag.unknown_field(field);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Watch {
                output,
                debounce,
                engine,
                ..
            } => {
                self.apply_engine_args(engine);
                Self::update_option(&mut self.compile.debounce_ms, debounce.as_ref());
                if output.is_some() {
                    self.display.output = output.clone();
                }
            }
            Commands::Compile { engine, .. } => self.apply_engine_args(engine),
        }
    }

    fn apply_engine_args(&mut self, args: &EngineArgs) {
        Self::update_option(&mut self.compile.engine, args.engine.as_ref());
        Self::update_option(&mut self.compile.style, args.style.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve config-relative paths against the root.
    fn normalize_paths(&mut self) {
        if let Some(output) = self.display.output.take() {
            self.display.output = Some(self.root.join(output));
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration, collecting all errors at once.
    fn validate(&self, mut diag: ConfigDiagnostics) -> Result<()> {
        self.compile.validate(&mut diag);
        diag.print_warnings();

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PreviewConfig {
    let (parsed, ignored) = PreviewConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
