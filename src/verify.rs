//! Proof replay over the deferred-verification buffer.
//!
//! A failed check is diagnostic output, not an error: surfacing engine
//! defects and harness ordering bugs is the point of the replay, so the
//! verifier collects mismatches instead of unwinding.

use std::fmt;

use crate::buffer::{PendingBuffer, PendingRecord};
use crate::engine::{AuthenticatedKv, RootHash, TableId};

/// Why a buffered record failed to check out.
#[derive(Clone, Debug)]
pub enum MismatchKind {
    /// The engine rejected the proof replay against this root.
    ProofRejected { root: RootHash },
    /// The root hash or proof for the record's version could not be
    /// fetched, typically a commit-ordering bug in the harness.
    EngineError(String),
}

/// One record that did not verify.
#[derive(Clone, Debug)]
pub struct VerificationMismatch {
    pub record: PendingRecord,
    pub kind: MismatchKind,
}

impl fmt::Display for VerificationMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let PendingRecord { version, key, value } = &self.record;
        match &self.kind {
            MismatchKind::ProofRejected { root } => write!(
                f,
                "proof rejected: version {} key {} value {:?} root 0x{}..",
                version,
                key,
                value,
                hex::encode(&root[..8])
            ),
            MismatchKind::EngineError(reason) => write!(
                f,
                "engine error at version {} key {}: {}",
                version, key, reason
            ),
        }
    }
}

/// Outcome of replaying a whole buffer.
#[derive(Debug, Default)]
pub struct VerificationReport {
    pub checked: u64,
    pub mismatches: Vec<VerificationMismatch>,
}

impl VerificationReport {
    pub fn passed(&self) -> u64 {
        self.checked - self.mismatches.len() as u64
    }

    pub fn all_passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Replays buffered records against committed roots and proofs.
pub struct Verifier<'a, E: AuthenticatedKv> {
    engine: &'a E,
    table: TableId,
}

impl<'a, E: AuthenticatedKv> Verifier<'a, E> {
    pub fn new(engine: &'a E, table: TableId) -> Self {
        Self { engine, table }
    }

    /// Check every buffered record. The buffer is read non-destructively,
    /// so a second pass over the same run is possible.
    pub fn verify_all(&self, buffer: &PendingBuffer) -> VerificationReport {
        let mut report = VerificationReport::default();
        for record in buffer.records() {
            report.checked += 1;
            if let Some(mismatch) = self.check(record) {
                report.mismatches.push(mismatch);
            }
        }
        report
    }

    fn check(&self, record: &PendingRecord) -> Option<VerificationMismatch> {
        let root = match self.engine.root_hash(self.table, record.version) {
            Ok(root) => root,
            Err(err) => {
                return Some(VerificationMismatch {
                    record: record.clone(),
                    kind: MismatchKind::EngineError(err.to_string()),
                })
            }
        };
        let proof = match self.engine.proof(self.table, record.version, &record.key) {
            Ok(proof) => proof,
            Err(err) => {
                return Some(VerificationMismatch {
                    record: record.clone(),
                    kind: MismatchKind::EngineError(err.to_string()),
                })
            }
        };
        if !self
            .engine
            .verify(self.table, &record.key, &record.value, &root, &proof)
        {
            return Some(VerificationMismatch {
                record: record.clone(),
                kind: MismatchKind::ProofRejected { root },
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DEFAULT_TABLE;
    use crate::store::MemoryTrie;

    #[test]
    fn test_committed_writes_verify() {
        let mut engine = MemoryTrie::new();
        let mut buffer = PendingBuffer::new();
        engine.put(DEFAULT_TABLE, 1, "00001", "a").unwrap();
        engine.put(DEFAULT_TABLE, 1, "00002", "b").unwrap();
        engine.commit(1).unwrap();
        buffer.push(1, "00001", "a");
        buffer.push(1, "00002", "b");

        let report = Verifier::new(&engine, DEFAULT_TABLE).verify_all(&buffer);
        assert_eq!(report.checked, 2);
        assert!(report.all_passed(), "mismatches: {:?}", report.mismatches);
    }

    #[test]
    fn test_wrong_value_is_reported_not_fatal() {
        let mut engine = MemoryTrie::new();
        let mut buffer = PendingBuffer::new();
        engine.put(DEFAULT_TABLE, 1, "00001", "a").unwrap();
        engine.commit(1).unwrap();
        buffer.push(1, "00001", "not what was written");

        let report = Verifier::new(&engine, DEFAULT_TABLE).verify_all(&buffer);
        assert_eq!(report.checked, 1);
        assert_eq!(report.passed(), 0);
        assert!(matches!(
            report.mismatches[0].kind,
            MismatchKind::ProofRejected { .. }
        ));
    }

    #[test]
    fn test_uncommitted_version_is_reported() {
        let mut engine = MemoryTrie::new();
        let mut buffer = PendingBuffer::new();
        engine.put(DEFAULT_TABLE, 1, "00001", "a").unwrap();
        engine.commit(1).unwrap();
        // Version 5 never committed: an ordering bug in a driver.
        buffer.push(5, "00001", "a");

        let report = Verifier::new(&engine, DEFAULT_TABLE).verify_all(&buffer);
        assert!(matches!(
            report.mismatches[0].kind,
            MismatchKind::EngineError(_)
        ));
    }

    #[test]
    fn test_verification_is_repeatable() {
        let mut engine = MemoryTrie::new();
        let mut buffer = PendingBuffer::new();
        engine.put(DEFAULT_TABLE, 1, "00001", "a").unwrap();
        engine.commit(1).unwrap();
        buffer.push(1, "00001", "a");

        let verifier = Verifier::new(&engine, DEFAULT_TABLE);
        let first = verifier.verify_all(&buffer);
        let second = verifier.verify_all(&buffer);
        assert_eq!(first.checked, second.checked);
        assert_eq!(first.all_passed(), second.all_passed());
    }
}
