use crate::core::Seq;

/// Sequence bookkeeping for stale-result suppression.
///
/// Only a completion carrying the latest issued seq is accepted, so applied
/// seqs are strictly increasing no matter how completions are ordered.
#[derive(Debug, Default)]
pub(super) struct SequenceTracker {
    latest_issued: Option<Seq>,
    latest_applied: Option<Seq>,
    /// Latest issued seq whose completion has not arrived yet
    awaiting: Option<Seq>,
}

impl SequenceTracker {
    /// Allocate the next seq and mark it as the latest issued.
    pub(super) fn issue(&mut self) -> Seq {
        let seq = self.latest_issued.map_or(Seq::FIRST, Seq::next);
        self.latest_issued = Some(seq);
        self.awaiting = Some(seq);
        seq
    }

    /// Record the completion of `seq`. Returns true if its result should be
    /// applied.
    pub(super) fn settle(&mut self, seq: Seq) -> bool {
        self.abandon(seq);
        if self.latest_issued != Some(seq) {
            return false;
        }
        if self.latest_applied.is_some_and(|applied| applied >= seq) {
            return false;
        }
        self.latest_applied = Some(seq);
        true
    }

    /// Record that `seq` will never produce a result.
    pub(super) fn abandon(&mut self, seq: Seq) {
        if self.awaiting == Some(seq) {
            self.awaiting = None;
        }
    }

    /// Latest issued seq still waiting for its completion.
    pub(super) fn awaiting(&self) -> Option<Seq> {
        self.awaiting
    }

    #[cfg(test)]
    pub(super) fn latest_applied(&self) -> Option<Seq> {
        self.latest_applied
    }
}
