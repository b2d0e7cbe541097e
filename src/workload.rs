//! Workload driver: batched loading, transactional access, payment
//! transfers.
//!
//! The driver owns all rolling state of a run (`current_version`,
//! `put_count`, the verification buffer, metrics), so several independent
//! runs can coexist in one process. It talks to the engine exclusively
//! through [`AuthenticatedKv`].

use std::str::FromStr;
use std::time::Instant;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::buffer::PendingBuffer;
use crate::config::BenchConfig;
use crate::engine::{AuthenticatedKv, Version, DEFAULT_TABLE};
use crate::error::{BenchError, Result};
use crate::key::KeyCodec;
use crate::keygen::{SequentialGenerator, SkewedGenerator, UniformGenerator, ValueGenerator};
use crate::metrics::MetricsRecorder;

/// The five transactional operation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Update,
    Insert,
    Scan,
    ReadModifyWrite,
}

impl FromStr for OperationKind {
    type Err = BenchError;

    /// Unknown kinds are a workload-definition bug, not a runtime
    /// condition; the error aborts the run.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "READ" => Ok(Self::Read),
            "UPDATE" => Ok(Self::Update),
            "INSERT" => Ok(Self::Insert),
            "SCAN" => Ok(Self::Scan),
            "READMODIFYWRITE" => Ok(Self::ReadModifyWrite),
            other => Err(BenchError::UnknownOperation(other.to_string())),
        }
    }
}

/// Drives batched workloads against an engine.
pub struct WorkloadDriver<'a, E: AuthenticatedKv> {
    engine: &'a mut E,
    config: BenchConfig,
    codec: KeyCodec,
    sequence: SequentialGenerator,
    uniform: UniformGenerator,
    skewed: SkewedGenerator,
    values: ValueGenerator,
    rng: StdRng,
    buffer: PendingBuffer,
    metrics: MetricsRecorder,
    current_version: Version,
    put_count: u64,
}

impl<'a, E: AuthenticatedKv> WorkloadDriver<'a, E> {
    pub fn new(engine: &'a mut E, config: BenchConfig) -> Self {
        let seed = config.seed;
        let key_space = config.accounts.max(2);
        Self {
            engine,
            codec: KeyCodec::new(config.key_len),
            sequence: SequentialGenerator::new(1),
            uniform: UniformGenerator::new(1, key_space, seed),
            skewed: SkewedGenerator::new(key_space, seed.wrapping_add(1)),
            values: ValueGenerator::new(config.value_len, seed.wrapping_add(2)),
            rng: StdRng::seed_from_u64(seed.wrapping_add(3)),
            buffer: PendingBuffer::new(),
            metrics: MetricsRecorder::new(),
            current_version: 0,
            put_count: 0,
            config,
        }
    }

    pub fn current_version(&self) -> Version {
        self.current_version
    }

    /// Mutations since the last commit boundary.
    pub fn put_count(&self) -> u64 {
        self.put_count
    }

    pub fn buffer(&self) -> &PendingBuffer {
        &self.buffer
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Release the engine borrow and hand back the run's artifacts.
    pub fn into_parts(self) -> (PendingBuffer, MetricsRecorder) {
        (self.buffer, self.metrics)
    }

    /// Loading phase: create `accounts` sequential keys in commit batches
    /// of `load_batch_size`. A non-empty trailing partial batch is still
    /// committed; dropping it would lose generated keys. Returns the final
    /// load version.
    pub fn load(&mut self) -> Result<Version> {
        let batch_size = self.config.load_batch_size.max(1);
        let mut version = self.current_version + 1;
        let mut in_batch = 0u64;
        for _ in 0..self.config.accounts {
            let key = self.codec.encode(self.sequence.next());
            let value = match self.config.initial_balance {
                Some(balance) => balance.to_string(),
                None => self.values.next(),
            };
            self.timed_put(version, &key, &value)?;
            self.buffer.push(version, key, value);
            in_batch += 1;
            if in_batch == batch_size {
                self.commit_version(version)?;
                version += 1;
                in_batch = 0;
            }
        }
        if in_batch > 0 {
            self.commit_version(version)?;
            version += 1;
        }
        self.current_version = version - 1;
        Ok(self.current_version)
    }

    /// Transaction phase: run `operations` draws from the configured mix,
    /// committing every `txn_batch_size` mutations plus one residual
    /// commit at the end.
    pub fn run_transactions(&mut self) -> Result<()> {
        for _ in 0..self.config.operations {
            let kind = self.config.mix.choose(&mut self.rng);
            self.execute(kind)?;
        }
        self.finish()
    }

    /// Run one operation, including the commit trigger for mutations.
    pub fn execute(&mut self, kind: OperationKind) -> Result<()> {
        match kind {
            OperationKind::Read => {
                let key = self.codec.encode(self.uniform.next());
                self.read(&key)?;
            }
            OperationKind::Update => {
                let key = self.codec.encode(self.uniform.next());
                let value = self.values.next();
                self.write(&key, &value)?;
            }
            OperationKind::Insert => {
                let key = self.codec.encode(self.sequence.next());
                let value = self.values.next();
                self.write(&key, &value)?;
            }
            OperationKind::Scan => {
                let start = self.uniform.next();
                let len = self.rng.gen_range(1..=self.config.scan_max_len.max(1));
                self.scan(start, len)?;
            }
            OperationKind::ReadModifyWrite => {
                let key = self.codec.encode(self.uniform.next());
                self.read_modify_write(&key)?;
            }
        }
        self.maybe_commit()
    }

    /// Read at the current version, buffer the observation, then write a
    /// fresh value at the next version. Returns the pre-modification
    /// value.
    pub fn read_modify_write(&mut self, key: &str) -> Result<String> {
        let prior = self.read(key)?;
        let value = self.values.next();
        self.write(key, &value)?;
        Ok(prior)
    }

    /// Payment phase: `count` transfers between skewed key pairs, same
    /// commit cadence as the transaction phase.
    pub fn run_payments(&mut self, count: u64) -> Result<()> {
        for _ in 0..count {
            self.transfer()?;
        }
        self.finish()
    }

    /// One transfer between two distinct skewed keys.
    pub fn transfer(&mut self) -> Result<()> {
        let sender = self.skewed.next();
        let mut receiver = self.skewed.next();
        while receiver == sender {
            receiver = self.skewed.next();
        }
        self.transfer_between(sender, receiver)
    }

    /// Debit one unit from `sender` and credit it to `receiver`, unless
    /// the sender's balance is not strictly positive, in which case both
    /// balances are rewritten unchanged. Balances never go negative.
    pub fn transfer_between(&mut self, sender: u64, receiver: u64) -> Result<()> {
        let key_send = self.codec.encode(sender);
        let key_recv = self.codec.encode(receiver);

        // Proof retrieval is the read path here: value and inclusion
        // evidence come back together.
        let mut balance_send = self.fetch_balance(&key_send)?;
        let mut balance_recv = self.fetch_balance(&key_recv)?;
        if balance_send > 0 {
            balance_send -= 1;
            balance_recv += 1;
        }

        let version = self.current_version + 1;
        let value_send = balance_send.to_string();
        let value_recv = balance_recv.to_string();
        self.timed_put(version, &key_send, &value_send)?;
        self.buffer.push(version, key_send, value_send);
        self.timed_put(version, &key_recv, &value_recv)?;
        self.buffer.push(version, key_recv, value_recv);
        self.put_count += 1;
        self.maybe_commit()
    }

    /// Commit any residual mutations. Writes at an uncommitted version
    /// are unverifiable, so every phase ends through here.
    pub fn finish(&mut self) -> Result<()> {
        if self.put_count > 0 {
            self.advance_and_commit()?;
        }
        Ok(())
    }

    /// Read `len` consecutive numeric keys from `start`. Each read is
    /// buffered on its own; the scan claims no atomicity.
    pub fn scan(&mut self, start: u64, len: u64) -> Result<()> {
        for i in 0..len {
            let key = self.codec.encode(start + i);
            self.read(&key)?;
        }
        Ok(())
    }

    fn read(&mut self, key: &str) -> Result<String> {
        let version = self.current_version;
        let value = self.timed_get(version, key)?;
        self.buffer.push(version, key, value.clone());
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let version = self.current_version + 1;
        self.timed_put(version, key, value)?;
        self.buffer.push(version, key, value);
        self.put_count += 1;
        Ok(())
    }

    fn fetch_balance(&mut self, key: &str) -> Result<i64> {
        let start = Instant::now();
        let proof = self.engine.proof(DEFAULT_TABLE, self.current_version, key)?;
        self.metrics.record_get(start.elapsed());
        let value = proof.value.unwrap_or_default();
        value.parse().map_err(|_| BenchError::MalformedBalance {
            key: key.to_string(),
            value,
        })
    }

    fn maybe_commit(&mut self) -> Result<()> {
        if self.put_count >= self.config.txn_batch_size.max(1) {
            self.advance_and_commit()?;
        }
        Ok(())
    }

    fn advance_and_commit(&mut self) -> Result<()> {
        self.current_version += 1;
        self.commit_version(self.current_version)?;
        self.put_count = 0;
        Ok(())
    }

    fn commit_version(&mut self, version: Version) -> Result<()> {
        self.engine.commit(version)?;
        if self.config.flush_interval > 0 && version % self.config.flush_interval == 0 {
            self.engine.flush(DEFAULT_TABLE, version)?;
        }
        self.metrics.end_batch(version);
        Ok(())
    }

    fn timed_get(&mut self, version: Version, key: &str) -> Result<String> {
        let start = Instant::now();
        let value = self.engine.get(DEFAULT_TABLE, version, key)?;
        self.metrics.record_get(start.elapsed());
        Ok(value.unwrap_or_default())
    }

    fn timed_put(&mut self, version: Version, key: &str, value: &str) -> Result<()> {
        let start = Instant::now();
        self.engine.put(DEFAULT_TABLE, version, key, value)?;
        self.metrics.record_put(start.elapsed());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTrie;

    #[test]
    fn test_operation_kind_parses() {
        assert_eq!("READ".parse::<OperationKind>().unwrap(), OperationKind::Read);
        assert_eq!(
            "READMODIFYWRITE".parse::<OperationKind>().unwrap(),
            OperationKind::ReadModifyWrite
        );
    }

    #[test]
    fn test_unknown_operation_kind_is_fatal() {
        let err = "DELETE".parse::<OperationKind>().unwrap_err();
        assert!(matches!(err, BenchError::UnknownOperation(ref s) if s == "DELETE"));
    }

    #[test]
    fn test_reads_do_not_trigger_commits() {
        let mut engine = MemoryTrie::new();
        let config = BenchConfig {
            accounts: 10,
            load_batch_size: 10,
            txn_batch_size: 2,
            ..BenchConfig::default()
        };
        let mut driver = WorkloadDriver::new(&mut engine, config);
        driver.load().unwrap();

        for _ in 0..20 {
            driver.execute(OperationKind::Read).unwrap();
        }
        assert_eq!(driver.current_version(), 1);
        assert_eq!(driver.put_count(), 0);
    }

    #[test]
    fn test_mutations_commit_at_batch_size() {
        let mut engine = MemoryTrie::new();
        let config = BenchConfig {
            accounts: 10,
            load_batch_size: 10,
            txn_batch_size: 3,
            ..BenchConfig::default()
        };
        let mut driver = WorkloadDriver::new(&mut engine, config);
        driver.load().unwrap();

        driver.execute(OperationKind::Update).unwrap();
        driver.execute(OperationKind::Update).unwrap();
        assert_eq!(driver.current_version(), 1);
        driver.execute(OperationKind::Update).unwrap();
        assert_eq!(driver.current_version(), 2);
        assert_eq!(driver.put_count(), 0);
    }

    #[test]
    fn test_read_modify_write_returns_prior_value() {
        let mut engine = MemoryTrie::new();
        let config = BenchConfig {
            accounts: 5,
            load_batch_size: 5,
            initial_balance: Some(7),
            ..BenchConfig::default()
        };
        let mut driver = WorkloadDriver::new(&mut engine, config);
        driver.load().unwrap();

        let prior = driver.read_modify_write("000000001").unwrap();
        assert_eq!(prior, "7");
    }
}
