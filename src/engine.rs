//! Capability contract of the external versioned trie engine.
//!
//! The benchmark core consumes a storage backend through this trait and
//! never looks inside it. Any conforming engine can be substituted, which
//! is also how the driver and verifier are unit-tested against the
//! in-memory reference engine, [`crate::MemoryTrie`].

use alloy_primitives::B256;

use crate::error::Result;
use crate::hash::Hasher;

/// Identifier of a key space inside the engine.
pub type TableId = u64;

/// A committed logical snapshot identifier. Strictly increasing, never
/// reused.
pub type Version = u64;

/// Per-version digest of a table's committed state. Opaque to the driver.
pub type RootHash = B256;

/// The table every driver in this crate operates on.
pub const DEFAULT_TABLE: TableId = 0;

/// Side of the proven node relative to its sibling on a proof path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Inclusion evidence for a key at a committed version.
///
/// Carries the stored value so callers that need both (the payment
/// workload) read and obtain evidence in one engine call. The sibling path
/// runs leaf to root; the driver passes it back into
/// [`AuthenticatedKv::verify`] unmodified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    /// Value stored at the proven key. `None` attests absence.
    pub value: Option<String>,
    pub path: Vec<(B256, Direction)>,
}

impl Proof {
    /// Replay the path and recompute the root this proof commits to.
    pub fn compute_root<H: Hasher>(&self, hasher: &H, key: &str) -> B256 {
        let mut current = match &self.value {
            Some(value) => hasher.hash_leaf(key, value),
            None => B256::ZERO,
        };
        for (sibling, direction) in &self.path {
            current = match direction {
                Direction::Left => hasher.hash_node(&current, sibling),
                Direction::Right => hasher.hash_node(sibling, &current),
            };
        }
        current
    }

    /// Approximate serialized size in bytes, for storage accounting.
    pub fn size(&self) -> usize {
        let value_len = self.value.as_ref().map_or(0, String::len);
        1 + value_len + self.path.len() * 33
    }
}

/// Versioned, authenticated key-value store.
///
/// Writes staged by [`put`](Self::put) become externally visible only
/// after [`commit`](Self::commit) of their version; reads, proofs and root
/// hashes address committed state.
pub trait AuthenticatedKv {
    /// Stage a write at `version`.
    fn put(&mut self, table: TableId, version: Version, key: &str, value: &str) -> Result<()>;

    /// Value visible as of `version`. `None` for absent keys.
    fn get(&self, table: TableId, version: Version, key: &str) -> Result<Option<String>>;

    /// Make all writes staged at `version` durable and queryable. Must be
    /// called with strictly increasing versions.
    fn commit(&mut self, version: Version) -> Result<()>;

    /// Force persistence of committed state through `version`. Purely an
    /// optimization hook from the harness's perspective.
    fn flush(&mut self, table: TableId, version: Version) -> Result<()>;

    /// Digest of `table` at a committed `version`.
    fn root_hash(&self, table: TableId, version: Version) -> Result<RootHash>;

    /// Inclusion (or absence) evidence for `key` at a committed `version`.
    fn proof(&self, table: TableId, version: Version, key: &str) -> Result<Proof>;

    /// Proof-replay check: does `proof` attest that `key` held `value`
    /// under `root`?
    fn verify(&self, table: TableId, key: &str, value: &str, root: &RootHash, proof: &Proof)
        -> bool;
}
