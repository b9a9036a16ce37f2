//! Editor surface: emits the full document text on every edit.
//!
//! [`FileEditor`] treats a file on disk as the editor. Any external editor
//! saving that file produces an edit; saves that leave the content unchanged
//! are not re-emitted.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::EditorSectionConfig;

/// Wait after the first event of a save before reading the file, so a
/// truncate-then-write save is read whole.
const SAVE_SETTLE: Duration = Duration::from_millis(30);

/// Options handed to an editor surface when it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Initial document text
    pub value: String,
    pub mode: String,
    pub theme: String,
    pub options: EditorOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditorOptions {
    pub line_numbers: bool,
    pub match_brackets: bool,
}

impl EditorConfig {
    pub fn new(value: String, section: &EditorSectionConfig) -> Self {
        Self {
            value,
            mode: section.mode.clone(),
            theme: section.theme.clone(),
            options: EditorOptions {
                line_numbers: section.line_numbers,
                match_brackets: section.match_brackets,
            },
        }
    }
}

/// Source of edit notifications.
pub trait EditorSurface: Send {
    /// Prepare the surface with its initial value and options.
    fn open(&mut self, config: &EditorConfig) -> Result<()>;

    /// Wait for the next edit. `None` once the surface is closed.
    fn next_edit(&mut self) -> impl Future<Output = Option<String>> + Send;
}

/// Read the document the file editor would start from, if it exists.
pub fn initial_content(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Editor surface backed by a file watched with `notify`.
pub struct FileEditor {
    path: PathBuf,
    /// Last content emitted (or written by `open`)
    last: Option<String>,
    events: Option<mpsc::UnboundedReceiver<()>>,
    /// An event arrived but the file has not been read yet
    dirty: bool,
    /// Dropping the watcher stops events
    watcher: Option<RecommendedWatcher>,
}

impl FileEditor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last: None,
            events: None,
            dirty: false,
            watcher: None,
        }
    }

    /// Stop watching; `next_edit` returns `None` afterwards.
    pub fn close(&mut self) {
        self.watcher = None;
        self.events = None;
        self.dirty = false;
    }

    fn watch(&mut self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self
            .path
            .file_name()
            .map(ToOwned::to_owned)
            .with_context(|| format!("Not a file path: {}", self.path.display()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    if is_content_event(&event.kind)
                        && event.paths.iter().any(|p| p.file_name() == Some(file_name.as_os_str()))
                    {
                        let _ = tx.send(());
                    }
                }
                Err(e) => crate::log!("watch"; "notify error: {}", e),
            }
        })
        .context("Failed to create file watcher")?;

        // Watch the directory: editors often replace the file on save
        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", parent.display()))?;

        self.watcher = Some(watcher);
        self.events = Some(rx);
        Ok(())
    }

    /// Read the file and return it if it differs from the last emitted text.
    fn read_change(&mut self) -> Option<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                crate::debug!("watch"; "skip unreadable {}: {}", self.path.display(), e);
                return None;
            }
        };
        if self.last.as_deref() == Some(content.as_str()) {
            return None;
        }
        self.last = Some(content.clone());
        Some(content)
    }
}

impl EditorSurface for FileEditor {
    /// Write the initial value if the file does not exist, then start watching.
    fn open(&mut self, config: &EditorConfig) -> Result<()> {
        if !self.path.exists() {
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&self.path, &config.value)
                .with_context(|| format!("Failed to write {}", self.path.display()))?;
            crate::log!("watch"; "created {}", self.path.display());
        }

        self.last = initial_content(&self.path)?;
        self.watch()?;
        crate::debug!("watch"; "editing {} ({}, theme {}, {:?})", self.path.display(), config.mode, config.theme, config.options);
        Ok(())
    }

    /// Cancel safe: an event taken before cancellation is kept in `dirty`
    /// and read on the next call.
    fn next_edit(&mut self) -> impl Future<Output = Option<String>> + Send {
        async move {
            loop {
                if !self.dirty {
                    self.events.as_mut()?.recv().await?;
                    self.dirty = true;
                }
                tokio::time::sleep(SAVE_SETTLE).await;
                // Coalesce the burst of events a single save produces
                if let Some(events) = self.events.as_mut() {
                    while events.try_recv().is_ok() {}
                }
                self.dirty = false;
                if let Some(content) = self.read_change() {
                    return Some(content);
                }
            }
        }
    }
}

/// Only content-bearing events; metadata changes (mtime/chmod) are noise.
fn is_content_event(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(modify) => !matches!(modify, notify::event::ModifyKind::Metadata(_)),
        _ => false,
    }
}
