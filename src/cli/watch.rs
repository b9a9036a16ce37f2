//! `stylepad watch`: live preview of one stylesheet.
//!
//! ```text
//! FileEditor --edit--> EditSession --snapshot--> DisplaySurface
//!  (notify)             (coordinator + client)     (terminal | file)
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::compiler::CompilerClient;
use crate::compiler::engine::factory_for;
use crate::config::cfg;
use crate::core::{is_shutdown, register_session};
use crate::log;
use crate::session::{EditSession, SessionSettings};
use crate::surface::{
    DisplaySurface, EditorSurface, FileDisplay, FileEditor, TerminalDisplay, initial_content,
};

/// How often the watch loop checks for Ctrl+C.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Run the live preview until Ctrl+C or the editor closes.
pub async fn watch_file(file: &Path) -> Result<()> {
    let config = cfg();
    let file = std::path::absolute(file)
        .with_context(|| format!("Invalid path: {}", file.display()))?;
    let cwd = file.parent().unwrap_or(config.get_root());

    let mut settings = SessionSettings::from_config(&config);
    if let Some(document) = initial_content(&file)? {
        settings = settings.with_document(document);
    }

    let factory = factory_for(&config.compile, cwd);
    log!("watch"; "{} with {} ({} worker(s))", file.display(), factory.name(), config.compile.workers);
    let client = CompilerClient::new(factory, config.compile.workers);
    let session = EditSession::start(client, settings);

    let mut editor = FileEditor::new(&file);
    editor.open(&session.editor_config())?;

    let mut display: Box<dyn DisplaySurface> = match &config.display.output {
        Some(path) => Box::new(FileDisplay::new(path)),
        None => Box::new(TerminalDisplay::new()),
    };
    display.render(&session.snapshot())?;

    let result = run_loop(&session, &mut editor, display.as_mut()).await;

    editor.close();
    crate::debug!(
        "watch"; "closing in {:?} with {} bytes of output",
        session.phase(), session.output().len()
    );
    if let Some(diagnostic) = session.diagnostic() {
        log!("watch"; "last compile failed: {}", diagnostic.summary());
    }
    session.shutdown().await;
    crate::debug!("watch"; "session closed");
    result
}

async fn run_loop(
    session: &EditSession,
    editor: &mut FileEditor,
    display: &mut dyn DisplaySurface,
) -> Result<()> {
    let shutdown_rx = register_session();
    let mut snapshots = session.subscribe();
    let mut poll = tokio::time::interval(SHUTDOWN_POLL);

    loop {
        tokio::select! {
            edit = editor.next_edit() => match edit {
                Some(source) => session.on_edit(source),
                None => {
                    log!("watch"; "editor closed");
                    return Ok(());
                }
            },

            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let snapshot = snapshots.borrow_and_update().clone();
                crate::debug!(
                    "watch"; "snapshot {:?}: {} bytes source, {} bytes output",
                    snapshot.applied, snapshot.source.len(), snapshot.output.len()
                );
                if let Err(e) = display.render(&snapshot) {
                    log!("error"; "display: {:#}", e);
                }
            }

            _ = poll.tick() => {
                let signalled = shutdown_rx.as_ref().is_some_and(|rx| rx.try_recv().is_ok());
                if signalled || is_shutdown() {
                    crate::debug!("watch"; "shutdown signal received");
                    return Ok(());
                }
            }
        }
    }
}
