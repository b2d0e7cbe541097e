//! In-memory reference engine.
//!
//! A conforming stand-in for the external trie: staged writes become
//! visible at commit, every committed version keeps a full snapshot, and
//! roots/proofs come from a binary Merkle tree over the snapshot's sorted
//! entries. It exists to exercise the driver and verifier; it persists
//! nothing and keeps no pages.

use std::collections::BTreeMap;

use alloy_primitives::B256;

use crate::engine::{AuthenticatedKv, Direction, Proof, RootHash, TableId, Version};
use crate::error::{BenchError, Result};
use crate::hash::{Blake3Hasher, Hasher};

type Snapshot = BTreeMap<String, String>;

#[derive(Clone, Debug, Default)]
struct TableState {
    /// Writes staged per not-yet-committed version.
    staged: BTreeMap<Version, Snapshot>,
    /// Full snapshot per committed version.
    committed: BTreeMap<Version, Snapshot>,
}

/// Versioned authenticated store backed by plain maps.
#[derive(Clone, Debug, Default)]
pub struct MemoryTrie<H: Hasher = Blake3Hasher> {
    hasher: H,
    tables: BTreeMap<TableId, TableState>,
    last_committed: Version,
    flushes: u64,
}

impl MemoryTrie<Blake3Hasher> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: Hasher> MemoryTrie<H> {
    pub fn with_hasher(hasher: H) -> Self {
        Self {
            hasher,
            tables: BTreeMap::new(),
            last_committed: 0,
            flushes: 0,
        }
    }

    /// Highest committed version, 0 before the first commit.
    pub fn last_committed(&self) -> Version {
        self.last_committed
    }

    /// Versions committed for `table`, ascending.
    pub fn committed_versions(&self, table: TableId) -> Vec<Version> {
        self.tables
            .get(&table)
            .map(|t| t.committed.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of live entries in `table` as of `version`.
    pub fn entry_count(&self, table: TableId, version: Version) -> usize {
        self.snapshot_at(table, version).map_or(0, Snapshot::len)
    }

    /// How many times `flush` has been called.
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    /// Latest committed snapshot at or before `version`.
    fn snapshot_at(&self, table: TableId, version: Version) -> Option<&Snapshot> {
        self.tables
            .get(&table)?
            .committed
            .range(..=version)
            .next_back()
            .map(|(_, snap)| snap)
    }

    /// Snapshot committed exactly at `version`. Roots and proofs are
    /// version-addressed, so an inexact lookup would paper over the very
    /// ordering bugs this harness exists to catch.
    fn snapshot_exact(&self, table: TableId, version: Version) -> Result<&Snapshot> {
        let state = self
            .tables
            .get(&table)
            .ok_or(BenchError::UnknownTable(table))?;
        state
            .committed
            .get(&version)
            .ok_or(BenchError::UnknownVersion(version))
    }

    fn leaves(&self, snap: &Snapshot) -> Vec<B256> {
        snap.iter()
            .map(|(k, v)| self.hasher.hash_leaf(k, v))
            .collect()
    }

    /// Root of the binary Merkle tree over the snapshot's sorted entries.
    /// An unpaired rightmost node is promoted unchanged.
    fn root_of(&self, snap: &Snapshot) -> B256 {
        let mut level = self.leaves(snap);
        if level.is_empty() {
            return B256::ZERO;
        }
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| {
                    if pair.len() == 2 {
                        self.hasher.hash_node(&pair[0], &pair[1])
                    } else {
                        pair[0]
                    }
                })
                .collect();
        }
        level[0]
    }

    /// Sibling path for the leaf at `index`, leaf to root. Promoted levels
    /// contribute no path entry.
    fn path_of(&self, snap: &Snapshot, index: usize) -> Vec<(B256, Direction)> {
        let mut level = self.leaves(snap);
        let mut path = Vec::new();
        let mut idx = index;
        while level.len() > 1 {
            let sibling = idx ^ 1;
            if sibling < level.len() {
                let direction = if idx % 2 == 0 {
                    Direction::Left
                } else {
                    Direction::Right
                };
                path.push((level[sibling], direction));
            }
            level = level
                .chunks(2)
                .map(|pair| {
                    if pair.len() == 2 {
                        self.hasher.hash_node(&pair[0], &pair[1])
                    } else {
                        pair[0]
                    }
                })
                .collect();
            idx /= 2;
        }
        path
    }
}

impl<H: Hasher> AuthenticatedKv for MemoryTrie<H> {
    fn put(&mut self, table: TableId, version: Version, key: &str, value: &str) -> Result<()> {
        self.tables
            .entry(table)
            .or_default()
            .staged
            .entry(version)
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, table: TableId, version: Version, key: &str) -> Result<Option<String>> {
        Ok(self
            .snapshot_at(table, version)
            .and_then(|snap| snap.get(key).cloned()))
    }

    fn commit(&mut self, version: Version) -> Result<()> {
        if version <= self.last_committed {
            return Err(BenchError::CommitOrder {
                version,
                last: self.last_committed,
            });
        }
        for state in self.tables.values_mut() {
            let mut snapshot = state
                .committed
                .last_key_value()
                .map(|(_, snap)| snap.clone())
                .unwrap_or_default();
            if let Some(staged) = state.staged.remove(&version) {
                snapshot.extend(staged);
            }
            state.committed.insert(version, snapshot);
        }
        self.last_committed = version;
        Ok(())
    }

    fn flush(&mut self, _table: TableId, _version: Version) -> Result<()> {
        // Nothing to persist; counted so flush cadence is testable.
        self.flushes += 1;
        Ok(())
    }

    fn root_hash(&self, table: TableId, version: Version) -> Result<RootHash> {
        let snap = self.snapshot_exact(table, version)?;
        Ok(self.root_of(snap))
    }

    fn proof(&self, table: TableId, version: Version, key: &str) -> Result<Proof> {
        let snap = self.snapshot_exact(table, version)?;
        match snap.keys().position(|k| k == key) {
            Some(index) => Ok(Proof {
                value: snap.get(key).cloned(),
                path: self.path_of(snap, index),
            }),
            // Absence placeholder: this fake does not produce range
            // proofs for exclusion.
            None => Ok(Proof {
                value: None,
                path: Vec::new(),
            }),
        }
    }

    fn verify(
        &self,
        _table: TableId,
        key: &str,
        value: &str,
        root: &RootHash,
        proof: &Proof,
    ) -> bool {
        match &proof.value {
            Some(proven) if proven != value => return false,
            None if proof.path.is_empty() => return value.is_empty(),
            None => return false,
            Some(_) => {}
        }
        proof.compute_root(&self.hasher, key) == *root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DEFAULT_TABLE;

    fn put(trie: &mut MemoryTrie, version: Version, key: &str, value: &str) {
        trie.put(DEFAULT_TABLE, version, key, value).unwrap();
    }

    #[test]
    fn test_staged_writes_invisible_until_commit() {
        let mut trie = MemoryTrie::new();
        put(&mut trie, 1, "00001", "a");
        assert_eq!(trie.get(DEFAULT_TABLE, 1, "00001").unwrap(), None);

        trie.commit(1).unwrap();
        assert_eq!(
            trie.get(DEFAULT_TABLE, 1, "00001").unwrap(),
            Some("a".to_string())
        );
    }

    #[test]
    fn test_versioned_reads_see_their_snapshot() {
        let mut trie = MemoryTrie::new();
        put(&mut trie, 1, "00001", "a");
        trie.commit(1).unwrap();
        put(&mut trie, 2, "00001", "b");
        trie.commit(2).unwrap();

        assert_eq!(
            trie.get(DEFAULT_TABLE, 1, "00001").unwrap(),
            Some("a".to_string())
        );
        assert_eq!(
            trie.get(DEFAULT_TABLE, 2, "00001").unwrap(),
            Some("b".to_string())
        );
        // A later version without new writes still sees version 2 state.
        assert_eq!(
            trie.get(DEFAULT_TABLE, 9, "00001").unwrap(),
            Some("b".to_string())
        );
    }

    #[test]
    fn test_commit_must_advance() {
        let mut trie = MemoryTrie::new();
        put(&mut trie, 1, "00001", "a");
        trie.commit(1).unwrap();

        let err = trie.commit(1).unwrap_err();
        assert!(matches!(err, BenchError::CommitOrder { version: 1, last: 1 }));
    }

    #[test]
    fn test_root_changes_with_content() {
        let mut trie = MemoryTrie::new();
        put(&mut trie, 1, "00001", "a");
        trie.commit(1).unwrap();
        put(&mut trie, 2, "00002", "b");
        trie.commit(2).unwrap();

        let r1 = trie.root_hash(DEFAULT_TABLE, 1).unwrap();
        let r2 = trie.root_hash(DEFAULT_TABLE, 2).unwrap();
        assert_ne!(r1, r2);
        assert_ne!(r1, B256::ZERO);
    }

    #[test]
    fn test_root_requires_exact_version() {
        let mut trie = MemoryTrie::new();
        put(&mut trie, 1, "00001", "a");
        trie.commit(1).unwrap();

        assert!(matches!(
            trie.root_hash(DEFAULT_TABLE, 3),
            Err(BenchError::UnknownVersion(3))
        ));
    }

    #[test]
    fn test_proof_roundtrip_all_positions() {
        let mut trie = MemoryTrie::new();
        // Odd entry count exercises the promoted-node path.
        for i in 1..=7u64 {
            put(&mut trie, 1, &format!("{:05}", i), &format!("v{}", i));
        }
        trie.commit(1).unwrap();
        let root = trie.root_hash(DEFAULT_TABLE, 1).unwrap();

        for i in 1..=7u64 {
            let key = format!("{:05}", i);
            let proof = trie.proof(DEFAULT_TABLE, 1, &key).unwrap();
            assert_eq!(proof.value.as_deref(), Some(format!("v{}", i).as_str()));
            assert!(trie.verify(DEFAULT_TABLE, &key, &format!("v{}", i), &root, &proof));
        }
    }

    #[test]
    fn test_verify_rejects_wrong_value() {
        let mut trie = MemoryTrie::new();
        put(&mut trie, 1, "00001", "a");
        put(&mut trie, 1, "00002", "b");
        trie.commit(1).unwrap();

        let root = trie.root_hash(DEFAULT_TABLE, 1).unwrap();
        let proof = trie.proof(DEFAULT_TABLE, 1, "00001").unwrap();
        assert!(!trie.verify(DEFAULT_TABLE, "00001", "tampered", &root, &proof));
    }

    #[test]
    fn test_verify_rejects_wrong_root() {
        let mut trie = MemoryTrie::new();
        put(&mut trie, 1, "00001", "a");
        trie.commit(1).unwrap();
        put(&mut trie, 2, "00001", "changed");
        trie.commit(2).unwrap();

        let stale_root = trie.root_hash(DEFAULT_TABLE, 1).unwrap();
        let proof = trie.proof(DEFAULT_TABLE, 2, "00001").unwrap();
        assert!(!trie.verify(DEFAULT_TABLE, "00001", "changed", &stale_root, &proof));
    }

    #[test]
    fn test_absent_key_verifies_as_empty() {
        let mut trie = MemoryTrie::new();
        put(&mut trie, 1, "00001", "a");
        trie.commit(1).unwrap();

        let root = trie.root_hash(DEFAULT_TABLE, 1).unwrap();
        let proof = trie.proof(DEFAULT_TABLE, 1, "99999").unwrap();
        assert_eq!(proof.value, None);
        assert!(trie.verify(DEFAULT_TABLE, "99999", "", &root, &proof));
        assert!(!trie.verify(DEFAULT_TABLE, "99999", "something", &root, &proof));
    }

    #[test]
    fn test_sha256_backend_verifies_too() {
        use crate::hash::Sha256Hasher;

        let mut trie: MemoryTrie<Sha256Hasher> = MemoryTrie::with_hasher(Sha256Hasher);
        trie.put(DEFAULT_TABLE, 1, "00001", "a").unwrap();
        trie.commit(1).unwrap();

        let root = trie.root_hash(DEFAULT_TABLE, 1).unwrap();
        let proof = trie.proof(DEFAULT_TABLE, 1, "00001").unwrap();
        assert!(trie.verify(DEFAULT_TABLE, "00001", "a", &root, &proof));
    }
}
