//! Timing and throughput metrics for benchmark runs.
//!
//! The recorder accumulates per-call durations inside a batch window and
//! derives latency/throughput figures when the batch commits. Samples stay
//! in memory; result-file writers live outside this crate.

use std::time::Duration;

/// One committed batch worth of latency and throughput figures.
///
/// Latencies are total seconds spent in engine calls inside the batch
/// window; throughputs are ops per second, 0.0 when no operation of that
/// kind ran.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchSample {
    pub version: u64,
    pub get_latency: f64,
    pub put_latency: f64,
    pub get_throughput: f64,
    pub put_throughput: f64,
}

/// Wall-clock nanoseconds one trace-replay block took.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockSample {
    pub block_id: u64,
    pub elapse: u128,
}

/// Periodic storage footprint sample during trace replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageSample {
    pub block_id: u64,
    pub size: u64,
}

/// Collects samples for one benchmark run.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    batches: Vec<BatchSample>,
    blocks: Vec<BlockSample>,
    storage: Vec<StorageSample>,

    // Accumulators for the open batch window.
    get_time: Duration,
    get_ops: u64,
    put_time: Duration,
    put_ops: u64,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_get(&mut self, elapsed: Duration) {
        self.get_time += elapsed;
        self.get_ops += 1;
    }

    pub fn record_put(&mut self, elapsed: Duration) {
        self.put_time += elapsed;
        self.put_ops += 1;
    }

    /// Close the open batch window and derive its figures.
    pub fn end_batch(&mut self, version: u64) {
        let get_latency = self.get_time.as_secs_f64();
        let put_latency = self.put_time.as_secs_f64();
        self.batches.push(BatchSample {
            version,
            get_latency,
            put_latency,
            get_throughput: throughput(self.get_ops, get_latency),
            put_throughput: throughput(self.put_ops, put_latency),
        });
        self.get_time = Duration::ZERO;
        self.get_ops = 0;
        self.put_time = Duration::ZERO;
        self.put_ops = 0;
    }

    pub fn record_block(&mut self, block_id: u64, elapsed: Duration) {
        self.blocks.push(BlockSample {
            block_id,
            elapse: elapsed.as_nanos(),
        });
    }

    pub fn record_storage(&mut self, block_id: u64, size: u64) {
        self.storage.push(StorageSample { block_id, size });
    }

    pub fn batches(&self) -> &[BatchSample] {
        &self.batches
    }

    pub fn blocks(&self) -> &[BlockSample] {
        &self.blocks
    }

    pub fn storage(&self) -> &[StorageSample] {
        &self.storage
    }
}

fn throughput(ops: u64, latency_secs: f64) -> f64 {
    if latency_secs > 0.0 {
        ops as f64 / latency_secs
    } else {
        0.0
    }
}
