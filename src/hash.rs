//! Hash function abstraction for the reference engine.
//!
//! The external engine's digest algorithm is its own business; the
//! reference engine used for harness testing merkleizes snapshots through
//! this trait so either BLAKE3 or SHA-256 can back it.

use alloy_primitives::B256;
use sha2::{Digest, Sha256};

/// Domain tag for leaf hashes.
const LEAF_TAG: u8 = 0x00;
/// Domain tag for internal-node hashes.
const NODE_TAG: u8 = 0x01;

/// Trait for hash functions used when merkleizing a committed snapshot.
///
/// Leaf and internal hashes are domain-separated so a leaf digest can never
/// be replayed as an internal node.
pub trait Hasher: Clone + Default {
    /// Hash one key-value entry into a leaf digest. Keys are decimal
    /// strings, so the `0x00` separator between key and value is
    /// unambiguous.
    fn hash_leaf(&self, key: &str, value: &str) -> B256;

    /// Hash two child digests into an internal-node digest.
    fn hash_node(&self, left: &B256, right: &B256) -> B256;
}

fn leaf_input(key: &str, value: &str) -> Vec<u8> {
    let mut input = Vec::with_capacity(2 + key.len() + value.len());
    input.push(LEAF_TAG);
    input.extend_from_slice(key.as_bytes());
    input.push(0x00);
    input.extend_from_slice(value.as_bytes());
    input
}

fn node_input(left: &B256, right: &B256) -> [u8; 65] {
    let mut input = [0u8; 65];
    input[0] = NODE_TAG;
    input[1..33].copy_from_slice(left.as_slice());
    input[33..].copy_from_slice(right.as_slice());
    input
}

/// BLAKE3-based hasher (default).
#[derive(Clone, Default)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    fn hash_leaf(&self, key: &str, value: &str) -> B256 {
        B256::from_slice(blake3::hash(&leaf_input(key, value)).as_bytes())
    }

    fn hash_node(&self, left: &B256, right: &B256) -> B256 {
        B256::from_slice(blake3::hash(&node_input(left, right)).as_bytes())
    }
}

/// SHA-256-based hasher.
#[derive(Clone, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash_leaf(&self, key: &str, value: &str) -> B256 {
        B256::from_slice(&Sha256::digest(leaf_input(key, value)))
    }

    fn hash_node(&self, left: &B256, right: &B256) -> B256 {
        B256::from_slice(&Sha256::digest(node_input(left, right)))
    }
}
