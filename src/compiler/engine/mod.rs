//! Compiler engines - the opaque external service behind the client.
//!
//! An engine turns one source text into an [`EngineReply`] with a status
//! code (0 = success). Engines are created on worker threads through an
//! [`EngineFactory`], so slow startup (resolving a binary, loading a
//! runtime) happens off the session's task.
//!
//! | Engine          | Runs                                        |
//! |-----------------|---------------------------------------------|
//! | `ProcessEngine` | external command per compile, source on stdin |
//! | `CssEngine`     | in-process CSS parse/print (`lightningcss`)  |

mod css;
mod process;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{CompileConfig, EngineKind};

pub use css::CssFactory;
pub use process::ProcessFactory;

/// Raw engine answer: status code plus output or diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReply {
    pub status: i32,
    pub text: String,
}

impl EngineReply {
    pub fn new(status: i32, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }
}

/// The engine could not be reached or died mid-compile.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{0}` was terminated by a signal")]
    Killed(String),

    #[error("`{program}` killed after running for {}ms", .limit.as_millis())]
    Deadline { program: String, limit: Duration },

    #[error("engine startup failed: {0}")]
    Startup(String),

    #[error("engine panicked: {0}")]
    Panicked(String),
}

/// A started compiler engine, owned by exactly one worker thread.
pub trait Engine: Send {
    fn compile(&mut self, source: &str) -> Result<EngineReply, TransportError>;
}

/// Creates engines on worker threads.
pub trait EngineFactory: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Start one engine instance. May block.
    fn start(&self) -> Result<Box<dyn Engine>, TransportError>;
}

/// Output formatting passed through to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

impl OutputStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expanded => "expanded",
            Self::Compressed => "compressed",
        }
    }
}

/// Build the engine factory selected by `[compile]`.
///
/// `cwd` is where external compilers run (the document's directory).
/// External compilers are killed once they outlive `compile.timeout_ms`.
pub fn factory_for(config: &CompileConfig, cwd: &Path) -> Arc<dyn EngineFactory> {
    match config.engine {
        EngineKind::Process => {
            let mut factory = ProcessFactory::new(
                config.command.clone(),
                config.style_flag.clone(),
                config.style,
            )
            .with_cwd(cwd);
            if let Some(limit) = config.timeout() {
                factory = factory.with_deadline(limit);
            }
            Arc::new(factory)
        }
        EngineKind::Css => Arc::new(CssFactory::new(config.style)),
    }
}
