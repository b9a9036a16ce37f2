//! External compiler process (e.g. `sass --stdin`).
//!
//! One process per compile: the source goes to stdin, the exit code is the
//! status, stdout is the output and stderr the diagnostic.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{Engine, EngineFactory, EngineReply, OutputStyle, TransportError};
use crate::utils::exec::{Cmd, strip_ansi};

pub struct ProcessFactory {
    command: Vec<String>,
    style_flag: String,
    style: OutputStyle,
    name: String,
    /// Working directory, so relative `@use`/`@import` resolve next to the document.
    cwd: Option<PathBuf>,
    deadline: Option<Duration>,
}

impl ProcessFactory {
    pub fn new(command: Vec<String>, style_flag: String, style: OutputStyle) -> Self {
        let name = command.first().cloned().unwrap_or_default();
        Self {
            command,
            style_flag,
            style,
            name,
            cwd: None,
            deadline: None,
        }
    }

    pub fn with_cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Kill a compile that runs longer than `limit`.
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(limit);
        self
    }

    /// Fixed arguments (kept verbatim, empty ones included) plus `--style=<style>` when a style flag is configured.
    fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = self.command.iter().skip(1).cloned().collect();
        if !self.style_flag.is_empty() {
            args.push(format!("{}={}", self.style_flag, self.style.as_str()));
        }
        args
    }
}

impl EngineFactory for ProcessFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<Box<dyn Engine>, TransportError> {
        let Some(program) = self.command.first() else {
            return Err(TransportError::Startup("empty compile.command".into()));
        };
        let path = which::which(program)
            .map_err(|e| TransportError::Startup(format!("`{program}` not found: {e}")))?;
        crate::debug!("engine"; "using {}", path.display());

        Ok(Box::new(ProcessEngine {
            program: path,
            args: self.args(),
            cwd: self.cwd.clone(),
            deadline: self.deadline,
        }))
    }
}

pub struct ProcessEngine {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    deadline: Option<Duration>,
}

impl Engine for ProcessEngine {
    fn compile(&mut self, source: &str) -> Result<EngineReply, TransportError> {
        let name = self.program.display().to_string();
        let mut cmd = Cmd::new(&self.program).args(&self.args).stdin(source);
        if let Some(dir) = &self.cwd {
            cmd = cmd.cwd(dir);
        }
        if let Some(limit) = self.deadline {
            cmd = cmd.timeout(limit);
        }

        let output = cmd.output().map_err(|source| match (source.kind(), self.deadline) {
            (io::ErrorKind::TimedOut, Some(limit)) => TransportError::Deadline {
                program: name.clone(),
                limit,
            },
            _ => TransportError::Spawn {
                program: name.clone(),
                source,
            },
        })?;

        let Some(status) = output.status.code() else {
            return Err(TransportError::Killed(name));
        };

        let text = if status == 0 {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            strip_ansi(&String::from_utf8_lossy(&output.stderr))
        };
        Ok(EngineReply { status, text })
    }
}
