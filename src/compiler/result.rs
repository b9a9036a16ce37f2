//! Compile outcomes as seen by the session.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::engine::EngineReply;

/// `line:column` as printed by sass (`  - 2:3  root stylesheet`) and by the
/// in-process CSS engine (`... at 2:3`). Pairs inside source excerpts
/// (`2 │ a { grid-area: 1:2 }`) are not locations.
static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^[ \t]*- | at )([0-9]+):([0-9]+)").expect("valid location regex")
});

/// Why a compile did not produce output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Engine ran and reported a non-zero status.
    Compile,
    /// Worker or process failed before producing a status.
    Transport,
    /// No reply within `compile.timeout_ms`.
    Timeout,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Compile => "compile error",
            Self::Transport => "compiler unavailable",
            Self::Timeout => "compile timed out",
        }
    }
}

/// Compiler diagnostic kept by the session for the display surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: FailureKind,
    pub message: String,
    /// Engine status code, if the engine got far enough to report one.
    pub status: Option<i32>,
}

impl Diagnostic {
    pub fn compile(status: i32, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Compile,
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: message.into(),
            status: None,
        }
    }

    pub fn timeout(limit: Duration) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: format!("no reply after {}ms", limit.as_millis()),
            status: None,
        }
    }

    /// Position the engine reported the error at.
    pub fn location(&self) -> Option<(u32, u32)> {
        let caps = LOCATION.captures(&self.message)?;
        let line = caps.get(1)?.as_str().parse().ok()?;
        let column = caps.get(2)?.as_str().parse().ok()?;
        Some((line, column))
    }

    /// One-line summary for status displays.
    pub fn summary(&self) -> String {
        match self.location() {
            Some((line, column)) => format!("{} at {}:{}", self.kind.label(), line, column),
            None => self.kind.label().to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message.trim_end())
    }
}

/// Result of one compile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileResult {
    Success { output: String },
    Failure { diagnostic: Diagnostic },
}

impl CompileResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self::Success {
            output: output.into(),
        }
    }

    pub fn failure(diagnostic: Diagnostic) -> Self {
        Self::Failure { diagnostic }
    }

    /// Status 0 carries output, anything else carries a diagnostic.
    pub fn from_reply(reply: EngineReply) -> Self {
        if reply.status == 0 {
            Self::success(reply.text)
        } else {
            Self::failure(Diagnostic::compile(reply.status, reply.text))
        }
    }

    #[cfg(test)]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Success { output } => Some(output),
            Self::Failure { .. } => None,
        }
    }

    #[cfg(test)]
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { diagnostic } => Some(diagnostic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reply_status() {
        let ok = CompileResult::from_reply(EngineReply::new(0, "h2 { color: red; }"));
        assert_eq!(ok.output(), Some("h2 { color: red; }"));

        let failed = CompileResult::from_reply(EngineReply::new(65, "unexpected token"));
        let diagnostic = failed.diagnostic().unwrap();
        assert_eq!(diagnostic.kind, FailureKind::Compile);
        assert_eq!(diagnostic.status, Some(65));
        assert_eq!(diagnostic.message, "unexpected token");
    }

    #[test]
    fn test_sass_location() {
        let message = "Error: expected \"}\".\n  ╷\n2 │ a{\n  │   ^\n  ╵\n  - 2:3  root stylesheet\n";
        let diagnostic = Diagnostic::compile(65, message);
        assert_eq!(diagnostic.location(), Some((2, 3)));
        assert_eq!(diagnostic.summary(), "compile error at 2:3");
    }

    #[test]
    fn test_sass_location_skips_excerpt() {
        let message = "Error: expected \";\".\n  ╷\n2 │ a { grid-area: 1:2 }\n  │                   ^\n  ╵\n  - 2:20  root stylesheet\n";
        let diagnostic = Diagnostic::compile(65, message);
        assert_eq!(diagnostic.location(), Some((2, 20)));
        assert_eq!(diagnostic.summary(), "compile error at 2:20");
    }

    #[test]
    fn test_css_engine_location() {
        let diagnostic = Diagnostic::compile(65, "Unexpected token Delim('.') at 2:1");
        assert_eq!(diagnostic.location(), Some((2, 1)));
    }

    #[test]
    fn test_no_location() {
        let diagnostic = Diagnostic::transport("worker exited");
        assert_eq!(diagnostic.location(), None);
        assert_eq!(diagnostic.summary(), "compiler unavailable");
    }

    #[test]
    fn test_timeout_message() {
        let diagnostic = Diagnostic::timeout(Duration::from_millis(1500));
        assert_eq!(diagnostic.kind, FailureKind::Timeout);
        assert!(diagnostic.message.contains("1500ms"));
    }
}
