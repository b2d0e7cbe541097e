//! Deferred-verification record buffer.
//!
//! Reads and writes issued mid-run are only checkable once their version
//! has committed, so the driver parks `(version, key, value)` triples here
//! and the verifier replays them after the run.

use std::collections::HashMap;

/// What a read returned or a write intended, pinned to its version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRecord {
    pub version: u64,
    pub key: String,
    pub value: String,
}

/// Insertion-ordered log of pending records.
///
/// A later record for the same `(version, key)` replaces the pending value
/// in place: only the last intent at a version can commit, so replaying a
/// superseded one would report a phantom mismatch.
#[derive(Debug, Default)]
pub struct PendingBuffer {
    records: Vec<PendingRecord>,
    slots: HashMap<(u64, String), usize>,
}

impl PendingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation or intent. Amortized O(1).
    pub fn push(&mut self, version: u64, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.slots.get(&(version, key.clone())) {
            Some(&index) => self.records[index].value = value,
            None => {
                self.slots
                    .insert((version, key.clone()), self.records.len());
                self.records.push(PendingRecord {
                    version,
                    key,
                    value,
                });
            }
        }
    }

    /// Ordered snapshot view, oldest first. Non-destructive, so
    /// verification can run more than once over the same buffer.
    pub fn records(&self) -> &[PendingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_order() {
        let mut buf = PendingBuffer::new();
        buf.push(1, "a", "x");
        buf.push(2, "b", "y");
        buf.push(1, "c", "z");

        let versions: Vec<u64> = buf.records().iter().map(|r| r.version).collect();
        assert_eq!(versions, vec![1, 2, 1]);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_same_slot_keeps_last_intent() {
        let mut buf = PendingBuffer::new();
        buf.push(1, "a", "first");
        buf.push(1, "b", "other");
        buf.push(1, "a", "second");

        assert_eq!(buf.len(), 2);
        assert_eq!(buf.records()[0].value, "second");
        assert_eq!(buf.records()[1].value, "other");
    }

    #[test]
    fn test_same_key_different_versions_are_distinct() {
        let mut buf = PendingBuffer::new();
        buf.push(1, "a", "x");
        buf.push(2, "a", "y");

        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_records_is_not_destructive() {
        let mut buf = PendingBuffer::new();
        buf.push(1, "a", "x");

        let first = buf.records().to_vec();
        let second = buf.records().to_vec();
        assert_eq!(first, second);
        assert_eq!(buf.len(), 1);
    }
}
