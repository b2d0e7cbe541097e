//! Error types for the benchmark harness.

use thiserror::Error;

/// Errors that can occur while driving a benchmark run.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Commit was called with a version that does not advance the engine.
    #[error("commit version {version} does not advance last committed version {last}")]
    CommitOrder { version: u64, last: u64 },

    /// A root hash or proof was requested for a version that was never committed.
    #[error("version {0} has not been committed")]
    UnknownVersion(u64),

    /// A query addressed a table the engine has never seen.
    #[error("unknown table {0}")]
    UnknownTable(u64),

    /// The workload named an operation kind the driver cannot dispatch.
    #[error("operation kind not recognized: {0:?}")]
    UnknownOperation(String),

    /// A stored balance could not be parsed as an integer.
    #[error("balance for key {key} is not numeric: {value:?}")]
    MalformedBalance { key: String, value: String },

    /// Trace replay could not read its input file.
    #[error("trace input {path}: {source}")]
    Trace {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, BenchError>;
