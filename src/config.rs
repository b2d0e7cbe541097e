//! Benchmark configuration.
//!
//! Numeric knobs accept string input through [`BenchConfig::set`] so runs
//! can be parameterized from files or command lines. A value that fails to
//! parse is reported and the previous value kept; configuration mistakes
//! should not kill a long benchmark.

use rand::Rng;

use crate::workload::OperationKind;

/// Relative weights for the transactional operation mix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationMix {
    pub read: u32,
    pub update: u32,
    pub insert: u32,
    pub scan: u32,
    pub read_modify_write: u32,
}

impl Default for OperationMix {
    fn default() -> Self {
        Self {
            read: 50,
            update: 25,
            insert: 10,
            scan: 5,
            read_modify_write: 10,
        }
    }
}

impl OperationMix {
    /// A mix consisting of a single operation kind.
    pub fn only(kind: OperationKind) -> Self {
        let mut mix = Self {
            read: 0,
            update: 0,
            insert: 0,
            scan: 0,
            read_modify_write: 0,
        };
        match kind {
            OperationKind::Read => mix.read = 1,
            OperationKind::Update => mix.update = 1,
            OperationKind::Insert => mix.insert = 1,
            OperationKind::Scan => mix.scan = 1,
            OperationKind::ReadModifyWrite => mix.read_modify_write = 1,
        }
        mix
    }

    pub fn total(&self) -> u32 {
        self.read + self.update + self.insert + self.scan + self.read_modify_write
    }

    /// Draw one operation kind according to the weights.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> OperationKind {
        let total = self.total();
        assert!(total > 0, "operation mix has no weight");
        let mut draw = rng.gen_range(0..total);
        for (weight, kind) in [
            (self.read, OperationKind::Read),
            (self.update, OperationKind::Update),
            (self.insert, OperationKind::Insert),
            (self.scan, OperationKind::Scan),
            (self.read_modify_write, OperationKind::ReadModifyWrite),
        ] {
            if draw < weight {
                return kind;
            }
            draw -= weight;
        }
        unreachable!("draw exceeded total weight")
    }
}

/// Parameters of one benchmark run.
#[derive(Clone, Debug)]
pub struct BenchConfig {
    /// Keys created during the loading phase.
    pub accounts: u64,
    /// Puts per commit during the loading phase.
    pub load_batch_size: u64,
    /// Operations executed during the transaction phase.
    pub operations: u64,
    /// Mutating operations per commit during the transaction phase.
    pub txn_batch_size: u64,
    /// Width of generated keys. Normalized to odd by the key codec.
    pub key_len: usize,
    /// Length of generated string values.
    pub value_len: usize,
    /// Commit count between flush calls. 0 disables flushing.
    pub flush_interval: u64,
    /// Blocks between storage-size samples during trace replay.
    pub storage_sample_interval: u64,
    /// Upper bound on scan lengths, inclusive.
    pub scan_max_len: u64,
    /// Load every account with this numeric balance instead of a random
    /// value. Payment workloads need numeric state.
    pub initial_balance: Option<i64>,
    pub mix: OperationMix,
    pub seed: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            accounts: 1000,
            load_batch_size: 100,
            operations: 1000,
            txn_batch_size: 50,
            key_len: 9,
            value_len: 16,
            flush_interval: 100,
            storage_sample_interval: 100,
            scan_max_len: 10,
            initial_balance: None,
            mix: OperationMix::default(),
            seed: 42,
        }
    }
}

impl BenchConfig {
    /// Apply one string-valued setting. Unparsable numeric input is
    /// reported and the previous value kept; unknown keys are reported and
    /// ignored.
    pub fn set(&mut self, key: &str, raw: &str) {
        match key {
            "accounts" => set_u64(&mut self.accounts, key, raw),
            "load_batch_size" => set_u64(&mut self.load_batch_size, key, raw),
            "operations" => set_u64(&mut self.operations, key, raw),
            "txn_batch_size" => set_u64(&mut self.txn_batch_size, key, raw),
            "key_len" => set_usize(&mut self.key_len, key, raw),
            "value_len" => set_usize(&mut self.value_len, key, raw),
            "flush_interval" => set_u64(&mut self.flush_interval, key, raw),
            "storage_sample_interval" => set_u64(&mut self.storage_sample_interval, key, raw),
            "scan_max_len" => set_u64(&mut self.scan_max_len, key, raw),
            "seed" => set_u64(&mut self.seed, key, raw),
            _ => eprintln!("[WARN] unknown config key {:?}, ignoring", key),
        }
    }
}

fn set_u64(slot: &mut u64, key: &str, raw: &str) {
    match raw.parse() {
        Ok(value) => *slot = value,
        Err(_) => eprintln!(
            "[WARN] config {}: {:?} is not numeric, keeping {}",
            key, raw, slot
        ),
    }
}

fn set_usize(slot: &mut usize, key: &str, raw: &str) {
    match raw.parse() {
        Ok(value) => *slot = value,
        Err(_) => eprintln!(
            "[WARN] config {}: {:?} is not numeric, keeping {}",
            key, raw, slot
        ),
    }
}
