//! Compile request sequence numbers.

use std::fmt;

/// Monotonically increasing tag of an issued compile request.
///
/// The first request of a session is `#1`. A larger value always means a
/// later request, which is what stale-result suppression compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Seq(u64);

impl Seq {
    pub const FIRST: Self = Self(1);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_ordering() {
        let first = Seq::FIRST;
        let second = first.next();
        assert!(second > first);
        assert_eq!(second, Seq::new(2));
        assert_eq!(second.to_string(), "#2");
    }
}
