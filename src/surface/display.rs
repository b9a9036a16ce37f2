//! Display surfaces: render session snapshots.
//!
//! Source-only changes (the optimistic echo of an edit) do not redraw; only
//! a new output, diagnostic or applied seq does.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::logger::{status_error, status_success, status_unchanged};
use crate::session::Snapshot;

/// Accepts snapshots and shows them somewhere.
pub trait DisplaySurface: Send {
    fn render(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// What the status block shows for a snapshot.
#[derive(Debug, PartialEq, Eq)]
enum Status {
    /// Seed output, nothing compiled yet
    Seed(String),
    Compiled(String),
    Failed { summary: String, detail: String },
}

impl Status {
    fn show(&self) {
        match self {
            Self::Seed(message) => status_unchanged(message),
            Self::Compiled(message) => status_success(message),
            Self::Failed { summary, detail } => status_error(summary, detail),
        }
    }
}

/// Skip snapshots that render the same as the previous one.
fn needs_render(last: Option<&Snapshot>, snapshot: &Snapshot) -> bool {
    last.is_none_or(|last| last.output_differs(snapshot))
}

fn failed(snapshot: &Snapshot) -> Option<Status> {
    let diagnostic = snapshot.diagnostic.as_ref()?;
    let seq = snapshot.applied.map(|seq| format!(" ({seq})")).unwrap_or_default();
    Some(Status::Failed {
        summary: format!("{}{}", diagnostic.summary(), seq),
        detail: diagnostic.message.trim_end().to_string(),
    })
}

// ============================================================================
// Terminal
// ============================================================================

/// Status block with the compiled output printed verbatim underneath.
#[derive(Default)]
pub struct TerminalDisplay {
    last: Option<Snapshot>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn status(snapshot: &Snapshot) -> Status {
        if let Some(status) = failed(snapshot) {
            return status;
        }
        let output = snapshot.output.trim_end();
        match snapshot.applied {
            Some(seq) => Status::Compiled(format!("compiled {seq}\n{output}")),
            None => Status::Seed(format!("seed output\n{output}")),
        }
    }
}

impl DisplaySurface for TerminalDisplay {
    fn render(&mut self, snapshot: &Snapshot) -> Result<()> {
        if !needs_render(self.last.as_ref(), snapshot) {
            return Ok(());
        }
        Self::status(snapshot).show();
        self.last = Some(snapshot.clone());
        Ok(())
    }
}

// ============================================================================
// Output file
// ============================================================================

/// Writes the output verbatim to a file; diagnostics only reach the status
/// line, the file keeps the last good output.
pub struct FileDisplay {
    path: PathBuf,
    /// Content currently on disk (as written by us)
    written: Option<String>,
    last: Option<Snapshot>,
}

impl FileDisplay {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: None,
            last: None,
        }
    }

    /// Write `output` unless the file already holds it. Returns true if
    /// the file changed.
    fn write(&mut self, output: &str) -> Result<bool> {
        if self.written.as_deref() == Some(output) {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, output)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        self.written = Some(output.to_string());
        Ok(true)
    }

    fn status(&self, snapshot: &Snapshot, changed: bool) -> Status {
        if let Some(status) = failed(snapshot) {
            return status;
        }
        let path = self.path.display();
        match snapshot.applied {
            Some(seq) if changed => Status::Compiled(format!("wrote {path} ({seq})")),
            Some(seq) => Status::Seed(format!("unchanged {path} ({seq})")),
            None => Status::Seed(format!("wrote seed output to {path}")),
        }
    }
}

impl DisplaySurface for FileDisplay {
    fn render(&mut self, snapshot: &Snapshot) -> Result<()> {
        if !needs_render(self.last.as_ref(), snapshot) {
            return Ok(());
        }
        let changed = self.write(&snapshot.output)?;
        self.status(snapshot, changed).show();
        self.last = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::compiler::Diagnostic;
    use crate::core::Seq;

    fn snapshot(output: &str, applied: Option<u64>) -> Snapshot {
        Snapshot {
            source: "src".into(),
            output: output.into(),
            diagnostic: None,
            applied: applied.map(Seq::new),
        }
    }

    fn failing(output: &str, applied: u64, message: &str) -> Snapshot {
        Snapshot {
            diagnostic: Some(Diagnostic::compile(65, message)),
            ..snapshot(output, Some(applied))
        }
    }

    #[test]
    fn test_source_only_change_skips_render() {
        let last = snapshot("a{}", Some(1));
        let echoed = Snapshot {
            source: "edited".into(),
            ..last.clone()
        };
        assert!(needs_render(None, &last));
        assert!(!needs_render(Some(&last), &echoed));
        assert!(needs_render(Some(&last), &snapshot("b{}", Some(2))));
    }

    #[test]
    fn test_terminal_status() {
        assert_eq!(
            TerminalDisplay::status(&snapshot("h2 {}\n", None)),
            Status::Seed("seed output\nh2 {}".into())
        );
        assert_eq!(
            TerminalDisplay::status(&snapshot("a {}", Some(3))),
            Status::Compiled("compiled #3\na {}".into())
        );
        assert_eq!(
            TerminalDisplay::status(&failing("a {}", 5, "expected \"}\".\n  - 2:3  root stylesheet\n")),
            Status::Failed {
                summary: "compile error at 2:3 (#5)".into(),
                detail: "expected \"}\".\n  - 2:3  root stylesheet".into(),
            }
        );
    }

    #[test]
    fn test_file_display_writes_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/preview.css");
        let mut display = FileDisplay::new(&path);

        display.render(&snapshot("h2 {}", None)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "h2 {}");

        display.render(&snapshot("a {}", Some(1))).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a {}");
    }

    #[test]
    fn test_file_display_keeps_output_on_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preview.css");
        let mut display = FileDisplay::new(&path);

        display.render(&snapshot("a {}", Some(1))).unwrap();
        display.render(&failing("a {}", 2, "unexpected token")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a {}");
        assert!(matches!(
            display.status(&failing("a {}", 2, "unexpected token"), false),
            Status::Failed { .. }
        ));
    }

    #[test]
    fn test_file_display_skips_identical_output() {
        let dir = TempDir::new().unwrap();
        let mut display = FileDisplay::new(dir.path().join("preview.css"));

        assert!(display.write("a {}").unwrap());
        assert!(!display.write("a {}").unwrap());
        assert!(display.write("b {}").unwrap());
    }
}
