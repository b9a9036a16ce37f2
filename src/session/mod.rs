//! Edit Session - the single source of truth for one document.
//!
//! Holds the current source, the displayed output and the last diagnostic.
//! Edits land here first (optimistic echo), then go to the coordinator;
//! results come back through [`ResultSink`] and are published as
//! [`Snapshot`]s for display surfaces.
//!
//! ```text
//! editor --on_edit--> EditSession --schedule--> RequestCoordinator
//!                          |  ^                         |
//!                 snapshot |  +------ apply_result -----+
//!                          v
//!                       display
//! ```

mod state;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::actor::coordinator::{self, CoordinatorHandle, CoordinatorSettings, Phase, ResultSink};
use crate::compiler::{Compile, CompileResult, CompilerClient, Diagnostic};
use crate::config::{EditorSectionConfig, PreviewConfig};
use crate::core::Seq;
use crate::surface::EditorConfig;

pub use state::{SessionState, Snapshot};

/// Everything a session needs besides its compiler.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub seed: String,
    pub seed_output: String,
    /// Schedule the seed at startup
    pub compile_seed: bool,
    pub coordinator: CoordinatorSettings,
    pub editor: EditorSectionConfig,
}

impl SessionSettings {
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self {
            seed: config.session.seed.clone(),
            seed_output: config.session.seed_output.clone(),
            compile_seed: config.session.compile_seed,
            coordinator: CoordinatorSettings {
                debounce: config.compile.debounce(),
                timeout: config.compile.timeout(),
            },
            editor: config.editor.clone(),
        }
    }

    /// Replace the seed with an existing document; its output is unknown, so
    /// the document gets compiled right away.
    pub fn with_document(mut self, source: String) -> Self {
        self.seed = source;
        self.compile_seed = true;
        self
    }
}

/// State shared with the coordinator task.
struct SessionShared {
    state: RwLock<SessionState>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl SessionShared {
    /// Publish while still holding the write lock so snapshots are never
    /// observed out of order.
    fn publish(&self, state: &SessionState) {
        self.snapshot_tx.send_replace(state.snapshot());
    }
}

impl ResultSink for SessionShared {
    fn apply_result(&self, seq: Seq, result: CompileResult) {
        let mut state = self.state.write();
        if state.applied.is_some_and(|applied| applied >= seq) {
            crate::debug!("compile"; "ignored result {} (already applied {:?})", seq, state.applied);
            return;
        }
        state.applied = Some(seq);

        match result {
            CompileResult::Success { output } => {
                crate::debug!("compile"; "applied {} ({} bytes)", seq, output.len());
                state.output = output;
                state.diagnostic = None;
            }
            CompileResult::Failure { diagnostic } => {
                match diagnostic.status {
                    Some(status) => crate::log!(
                        "compile"; "request {} failed: {} (status {})", seq, diagnostic.summary(), status
                    ),
                    None => crate::log!("compile"; "request {} failed: {}", seq, diagnostic.summary()),
                }
                state.diagnostic = Some(diagnostic);
            }
        }
        self.publish(&state);
    }
}

/// One live document: source, output, diagnostic and the compile pipeline
/// behind them.
pub struct EditSession<C: Compile = CompilerClient> {
    shared: Arc<SessionShared>,
    coordinator: CoordinatorHandle,
    task: Mutex<Option<JoinHandle<()>>>,
    compiler: C,
    editor: EditorSectionConfig,
}

impl<C: Compile> EditSession<C> {
    /// Create the session and spawn its coordinator. Must run inside a tokio
    /// runtime.
    pub fn start(compiler: C, settings: SessionSettings) -> Self {
        let state = SessionState::new(settings.seed, settings.seed_output);
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        let shared = Arc::new(SessionShared {
            state: RwLock::new(state),
            snapshot_tx,
        });

        let sink: Arc<dyn ResultSink> = shared.clone();
        let (coordinator, task) = coordinator::spawn(compiler.clone(), sink, settings.coordinator);

        let session = Self {
            shared,
            coordinator,
            task: Mutex::new(Some(task)),
            compiler,
            editor: settings.editor,
        };
        if settings.compile_seed {
            session.coordinator.schedule(session.source());
        }
        session
    }

    /// Replace the source and schedule a compile. Never blocks on compiling.
    pub fn on_edit(&self, source: String) {
        {
            let mut state = self.shared.state.write();
            state.source.clone_from(&source);
            self.shared.publish(&state);
        }
        self.coordinator.schedule(source);
    }

    pub fn source(&self) -> String {
        self.shared.state.read().source.clone()
    }

    pub fn output(&self) -> String {
        self.shared.state.read().output.clone()
    }

    /// Diagnostic of the latest applied failure, cleared by the next success.
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        self.shared.state.read().diagnostic.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.state.read().snapshot()
    }

    /// Snapshot stream for display surfaces. The current snapshot counts as
    /// already seen.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.coordinator.phase()
    }

    /// Editor surface configuration for the current source.
    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig::new(self.source(), &self.editor)
    }

    /// Stop the coordinator, discard in-flight compiles and dispose the
    /// compiler. Idempotent.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
        self.compiler.dispose();

        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
            && e.is_panic()
        {
            crate::log!("watch"; "coordinator panicked: {}", e);
        }
    }
}

impl<C: Compile> Drop for EditSession<C> {
    fn drop(&mut self) {
        self.compiler.dispose();
    }
}
