//! Ledger-scoped monotonic counter.
//!
//! Feeds order and trade ID derivation. It lives inside the ledger so it is
//! persisted and rolled back with the rows it numbers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCounter {
    next: u64,
}

impl SequenceCounter {
    #[must_use]
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Take the next value.
    pub fn advance(&mut self) -> u64 {
        let value = self.next;
        self.next = self.next.wrapping_add(1);
        value
    }

    /// The value the next call to [`SequenceCounter::advance`] will return.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic() {
        let mut seq = SequenceCounter::default();
        assert_eq!(seq.advance(), 0);
        assert_eq!(seq.advance(), 1);
        assert_eq!(seq.peek(), 2);
    }

    #[test]
    fn resumes_from_snapshot() {
        let mut seq = SequenceCounter::starting_at(41);
        assert_eq!(seq.advance(), 41);
    }
}
