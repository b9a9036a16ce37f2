use std::time::Duration;

use tokio::time::Instant;

/// Pure debouncer: keeps the latest source and the deadline it becomes
/// ready at. No compile logic, no global state access.
pub(super) struct Debouncer {
    quiet: Duration,
    latest: Option<String>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            latest: None,
            deadline: None,
        }
    }

    /// Record an edit. Replaces any earlier pending source and restarts the
    /// quiet period.
    pub(super) fn push(&mut self, source: String) {
        self.latest = Some(source);
        self.deadline = Some(Instant::now() + self.quiet);
    }

    /// Take the pending source once the quiet period has elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<String> {
        if !self.is_ready() {
            return None;
        }
        self.deadline = None;
        self.latest.take()
    }

    pub(super) fn is_ready(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub(super) fn is_pending(&self) -> bool {
        self.latest.is_some()
    }

    /// Precise sleep duration until the pending source becomes ready.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(deadline) = self.deadline else {
            return Duration::from_secs(86400);
        };
        deadline
            .saturating_duration_since(Instant::now())
            .max(Duration::from_millis(1))
    }

    pub(super) fn clear(&mut self) {
        self.latest = None;
        self.deadline = None;
    }
}
