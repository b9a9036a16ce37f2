//! `[compile]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [compile]
//! engine = "process"                          # or "css" (in-process, plain CSS)
//! command = ["sass", "--stdin", "--no-source-map"]
//! style = "expanded"                          # or "compressed"
//! style_flag = "--style"                      # "" to pass no style argument
//! debounce_ms = 200
//! timeout_ms = 10000                          # 0 disables the timeout
//! workers = 1
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compiler::engine::OutputStyle;
use crate::config::{ConfigDiagnostics, FieldPath};

/// Which compiler engine runs the compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// External command, source on stdin
    #[default]
    Process,
    /// In-process CSS parser/printer
    Css,
}

/// Compile pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub engine: EngineKind,

    /// Compiler command for the process engine (program + fixed args).
    pub command: Vec<String>,

    pub style: OutputStyle,

    /// Flag used to pass `style` to the command.
    pub style_flag: String,

    /// Quiet period after the last edit before a compile is issued.
    pub debounce_ms: u64,

    /// Per-compile timeout; 0 disables it.
    pub timeout_ms: u64,

    /// Engine worker threads.
    pub workers: usize,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Process,
            command: vec!["sass".into(), "--stdin".into(), "--no-source-map".into()],
            style: OutputStyle::Expanded,
            style_flag: "--style".into(),
            debounce_ms: 200,
            timeout_ms: 10_000,
            workers: 1,
        }
    }
}

impl CompileConfig {
    const COMMAND: FieldPath = FieldPath::new("compile.command");
    const DEBOUNCE: FieldPath = FieldPath::new("compile.debounce_ms");
    const WORKERS: FieldPath = FieldPath::new("compile.workers");

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Validate compile configuration.
    ///
    /// # Checks
    /// - `debounce_ms` and `workers` must be positive
    /// - For the process engine, `command` must be non-empty and `command[0]`
    ///   must be installed (package runners only get a hint)
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.debounce_ms == 0 {
            diag.error_with_hint(
                Self::DEBOUNCE,
                "must be greater than 0",
                "200 matches typing speed well",
            );
        }
        if self.workers == 0 {
            diag.error(Self::WORKERS, "must be at least 1");
        }

        if self.engine != EngineKind::Process {
            return;
        }

        let Some(cmd) = self.command.first() else {
            diag.error(Self::COMMAND, "engine is `process` but command is empty");
            return;
        };

        let is_package_runner = ["npx", "bunx", "pnpx", "yarn", "dlx"].contains(&cmd.as_str());
        if which::which(cmd).is_err() {
            if is_package_runner {
                if let Some(package) = self.command.get(1) {
                    diag.hint(
                        Self::COMMAND,
                        format!("`{package}` via `{cmd}`: ensure the package is installed"),
                    );
                }
            } else {
                diag.error_with_hint(
                    Self::COMMAND,
                    format!("`{cmd}` not found"),
                    "install dart-sass, or set `compile.engine = \"css\"` for plain CSS",
                );
            }
        }
    }
}
