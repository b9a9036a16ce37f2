use crate::compiler::Diagnostic;
use crate::core::Seq;

/// Mutable session data, guarded by the session lock.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub source: String,
    pub output: String,
    pub diagnostic: Option<Diagnostic>,
    /// Seq of the last applied result, `None` while showing the seed output
    pub applied: Option<Seq>,
}

impl SessionState {
    pub fn new(source: String, output: String) -> Self {
        Self {
            source,
            output,
            diagnostic: None,
            applied: None,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            source: self.source.clone(),
            output: self.output.clone(),
            diagnostic: self.diagnostic.clone(),
            applied: self.applied,
        }
    }
}

/// What display surfaces render: an immutable copy of the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub source: String,
    pub output: String,
    pub diagnostic: Option<Diagnostic>,
    pub applied: Option<Seq>,
}

impl Snapshot {
    /// Whether `other` would render differently.
    pub fn output_differs(&self, other: &Self) -> bool {
        self.output != other.output
            || self.diagnostic != other.diagnostic
            || self.applied != other.applied
    }
}
