//! # trie-bench
//!
//! Benchmark and correctness-verification harness for versioned,
//! authenticated key-value trie engines.
//!
//! The harness generates synthetic workloads, drives an engine through
//! batched commit epochs, records timing and throughput, and defers
//! cryptographic verification of every read and write until after commit,
//! then replays it against the engine's inclusion proofs.
//!
//! Pieces:
//!
//! - **Generators**: sequential, uniform and hot/cold-skewed key
//!   selection plus fixed-width key formatting, all reproducible from a
//!   seed.
//! - **Driver** ([`WorkloadDriver`]): loading phase, transactional phase
//!   (read/update/insert/scan/read-modify-write) and a payment-transfer
//!   variant, with commit batching and flush cadence.
//! - **Verification** ([`PendingBuffer`], [`Verifier`]): a record of
//!   `(version, key, value)` observations replayed against per-version
//!   root hashes and proofs once the run is over.
//! - **Engine contract** ([`AuthenticatedKv`]): the capability trait any
//!   storage backend implements; [`MemoryTrie`] is an in-memory reference
//!   engine for tests and local runs.
//! - **Metrics** ([`MetricsRecorder`]): per-batch latency/throughput and
//!   trace-replay block timings, held in memory for external sinks.
//! - **Trace replay** ([`TraceReplayer`]): structured parsing of recorded
//!   operation logs and block-by-block replay.
//!
//! The whole core is single-threaded and synchronous; every engine call
//! completes before the next is issued.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod buffer;
mod config;
mod engine;
mod error;
mod hash;
mod key;
mod keygen;
mod metrics;
mod store;
mod trace;
mod verify;
mod workload;

pub use buffer::{PendingBuffer, PendingRecord};
pub use config::{BenchConfig, OperationMix};
pub use engine::{
    AuthenticatedKv, Direction, Proof, RootHash, TableId, Version, DEFAULT_TABLE,
};
pub use error::{BenchError, Result};
pub use hash::{Blake3Hasher, Hasher, Sha256Hasher};
pub use key::KeyCodec;
pub use keygen::{SequentialGenerator, SkewedGenerator, UniformGenerator, ValueGenerator};
pub use metrics::{BatchSample, BlockSample, MetricsRecorder, StorageSample};
pub use store::MemoryTrie;
pub use trace::{parse_line, ReplayConfig, ReplaySummary, TraceOp, TraceReplayer};
pub use verify::{MismatchKind, VerificationMismatch, VerificationReport, Verifier};
pub use workload::{OperationKind, WorkloadDriver};
