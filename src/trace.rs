//! Trace replay: parse YCSB-style operation logs and drive them in blocks.
//!
//! Input lines look like
//! `INSERT usertable user12345 [ field0=payload ]`,
//! `UPDATE usertable user12345 [ field0=payload ]` and
//! `READ usertable user12345 [ <all fields> ]`. Lines that are none of
//! these are skipped and counted.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Instant;

use crate::engine::{AuthenticatedKv, TableId, Version};
use crate::error::{BenchError, Result};
use crate::metrics::MetricsRecorder;

/// One parsed trace operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceOp {
    Insert { key: String, value: String },
    Update { key: String, value: String },
    Read { key: String },
}

/// Parse one trace line. `None` for lines that carry no operation.
pub fn parse_line(line: &str) -> Option<TraceOp> {
    if let Some(rest) = line.strip_prefix("INSERT usertable user") {
        let (key, value) = parse_write_fields(rest)?;
        return Some(TraceOp::Insert { key, value });
    }
    if let Some(rest) = line.strip_prefix("UPDATE usertable user") {
        let (key, value) = parse_write_fields(rest)?;
        return Some(TraceOp::Update { key, value });
    }
    if let Some(rest) = line.strip_prefix("READ usertable user") {
        let key = rest.split_whitespace().next()?;
        if key.is_empty() {
            return None;
        }
        return Some(TraceOp::Read {
            key: key.to_string(),
        });
    }
    None
}

/// Split `<key> [ fieldN=<value> ]` into key and value.
fn parse_write_fields(rest: &str) -> Option<(String, String)> {
    let (key, bracket) = rest.split_once(" [ ")?;
    let fields = bracket.strip_suffix(" ]")?;
    let (field, value) = fields.split_once('=')?;
    if !field.starts_with("field") || key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// Knobs for a trace replay run.
#[derive(Clone, Debug)]
pub struct ReplayConfig {
    /// INSERT operations consumed to build the base state.
    pub base_ops: u64,
    /// Operations replayed (and timed) after the base is built.
    pub txn_ops: u64,
    /// Operations per committed block.
    pub block_size: u64,
    /// Commit count between flush calls. 0 disables flushing.
    pub flush_interval: u64,
    /// Timed blocks between storage-size samples.
    pub storage_sample_interval: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            base_ops: 10_000,
            txn_ops: 10_000,
            block_size: 100,
            flush_interval: 100,
            storage_sample_interval: 100,
        }
    }
}

/// Counts from one replay run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub base_blocks: u64,
    pub txn_blocks: u64,
    pub applied: u64,
    pub skipped_lines: u64,
    pub final_version: Version,
}

/// Replays a recorded trace against an engine in commit blocks.
pub struct TraceReplayer<'a, E: AuthenticatedKv> {
    engine: &'a mut E,
    table: TableId,
    config: ReplayConfig,
}

impl<'a, E: AuthenticatedKv> TraceReplayer<'a, E> {
    pub fn new(engine: &'a mut E, table: TableId, config: ReplayConfig) -> Self {
        Self {
            engine,
            table,
            config,
        }
    }

    /// Replay a trace file. A missing or unreadable file is an error the
    /// caller reports and skips; it must not kill the process.
    pub fn replay_file(
        &mut self,
        path: &str,
        metrics: &mut MetricsRecorder,
        sampler: Option<&mut dyn FnMut() -> u64>,
    ) -> Result<ReplaySummary> {
        let file = File::open(path).map_err(|source| BenchError::Trace {
            path: path.to_string(),
            source,
        })?;
        let lines = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<Vec<String>>>()
            .map_err(|source| BenchError::Trace {
                path: path.to_string(),
                source,
            })?;
        self.replay_lines(lines, metrics, sampler)
    }

    /// Replay already-read trace lines.
    pub fn replay_lines(
        &mut self,
        lines: impl IntoIterator<Item = String>,
        metrics: &mut MetricsRecorder,
        mut sampler: Option<&mut dyn FnMut() -> u64>,
    ) -> Result<ReplaySummary> {
        let block_size = self.config.block_size.max(1) as usize;
        let mut lines = lines.into_iter();
        let mut summary = ReplaySummary::default();
        let mut version: Version = 1;
        let mut block: Vec<TraceOp> = Vec::with_capacity(block_size);

        // Base build: only INSERT ops count toward base_ops.
        let mut consumed = 0u64;
        while consumed < self.config.base_ops {
            let Some(line) = lines.next() else { break };
            match parse_line(&line) {
                Some(op @ TraceOp::Insert { .. }) => {
                    block.push(op);
                    consumed += 1;
                }
                Some(_) => continue,
                None => {
                    summary.skipped_lines += 1;
                    continue;
                }
            }
            if block.len() == block_size {
                self.apply_block(&block, version)?;
                self.commit_block(version, false)?;
                summary.base_blocks += 1;
                summary.applied += block.len() as u64;
                block.clear();
                version += 1;
            }
        }
        if !block.is_empty() {
            self.apply_block(&block, version)?;
            self.commit_block(version, true)?;
            summary.base_blocks += 1;
            summary.applied += block.len() as u64;
            block.clear();
            version += 1;
        }

        // Timed replay.
        let mut consumed = 0u64;
        while consumed < self.config.txn_ops {
            let Some(line) = lines.next() else { break };
            match parse_line(&line) {
                Some(op) => {
                    block.push(op);
                    consumed += 1;
                }
                None => {
                    summary.skipped_lines += 1;
                    continue;
                }
            }
            if block.len() == block_size {
                let applied = block.len() as u64;
                self.timed_block(&block, version, false, metrics)?;
                summary.txn_blocks += 1;
                summary.applied += applied;
                self.maybe_sample_storage(summary.txn_blocks, version, metrics, &mut sampler);
                block.clear();
                version += 1;
            }
        }
        if !block.is_empty() {
            let applied = block.len() as u64;
            self.timed_block(&block, version, true, metrics)?;
            summary.txn_blocks += 1;
            summary.applied += applied;
            if let Some(sample) = sampler.as_mut() {
                metrics.record_storage(version, sample());
            }
            block.clear();
            version += 1;
        }

        summary.final_version = version - 1;
        Ok(summary)
    }

    fn apply_block(&mut self, block: &[TraceOp], version: Version) -> Result<()> {
        for op in block {
            match op {
                TraceOp::Insert { key, value } | TraceOp::Update { key, value } => {
                    self.engine.put(self.table, version, key, value)?;
                }
                // Reads address the previously committed block.
                TraceOp::Read { key } => {
                    self.engine.get(self.table, version.saturating_sub(1), key)?;
                }
            }
        }
        Ok(())
    }

    fn timed_block(
        &mut self,
        block: &[TraceOp],
        version: Version,
        force_flush: bool,
        metrics: &mut MetricsRecorder,
    ) -> Result<()> {
        let start = Instant::now();
        self.apply_block(block, version)?;
        self.commit_block(version, force_flush)?;
        metrics.record_block(version, start.elapsed());
        Ok(())
    }

    fn commit_block(&mut self, version: Version, force_flush: bool) -> Result<()> {
        self.engine.commit(version)?;
        let on_interval =
            self.config.flush_interval > 0 && version % self.config.flush_interval == 0;
        if force_flush || on_interval {
            self.engine.flush(self.table, version)?;
        }
        Ok(())
    }

    fn maybe_sample_storage(
        &mut self,
        txn_block_index: u64,
        version: Version,
        metrics: &mut MetricsRecorder,
        sampler: &mut Option<&mut dyn FnMut() -> u64>,
    ) {
        if self.config.storage_sample_interval == 0
            || txn_block_index % self.config.storage_sample_interval != 0
        {
            return;
        }
        if let Some(sample) = sampler.as_mut() {
            metrics.record_storage(version, sample());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DEFAULT_TABLE;
    use crate::store::MemoryTrie;

    #[test]
    fn test_parse_insert_line() {
        let op = parse_line("INSERT usertable user123 [ field0=hello ]").unwrap();
        assert_eq!(
            op,
            TraceOp::Insert {
                key: "123".to_string(),
                value: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_parse_update_line() {
        let op = parse_line("UPDATE usertable user42 [ field3=x=y ]").unwrap();
        assert_eq!(
            op,
            TraceOp::Update {
                key: "42".to_string(),
                value: "x=y".to_string()
            }
        );
    }

    #[test]
    fn test_parse_read_line() {
        let op = parse_line("READ usertable user9 [ <all fields> ]").unwrap();
        assert_eq!(
            op,
            TraceOp::Read {
                key: "9".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_noise() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("SCAN usertable user1 [ ]"), None);
        assert_eq!(parse_line("INSERT usertable user1 no brackets"), None);
        assert_eq!(parse_line("INSERT usertable user1 [ notafield ]"), None);
    }

    fn insert_line(key: u64) -> String {
        format!("INSERT usertable user{} [ field0=v{} ]", key, key)
    }

    #[test]
    fn test_replay_builds_base_and_times_blocks() {
        let mut engine = MemoryTrie::new();
        let mut metrics = MetricsRecorder::new();
        let config = ReplayConfig {
            base_ops: 4,
            txn_ops: 4,
            block_size: 2,
            flush_interval: 1,
            storage_sample_interval: 1,
        };

        let mut lines: Vec<String> = (1..=4).map(insert_line).collect();
        lines.push("UPDATE usertable user1 [ field0=changed ]".to_string());
        lines.push("READ usertable user2 [ <all fields> ]".to_string());
        lines.push("junk line".to_string());
        lines.push("UPDATE usertable user3 [ field0=changed ]".to_string());
        lines.push("READ usertable user4 [ <all fields> ]".to_string());

        let mut size = 0u64;
        let mut sampler = || {
            size += 100;
            size
        };
        let summary = {
            let mut replayer = TraceReplayer::new(&mut engine, DEFAULT_TABLE, config);
            replayer
                .replay_lines(lines, &mut metrics, Some(&mut sampler))
                .unwrap()
        };

        assert_eq!(summary.base_blocks, 2);
        assert_eq!(summary.txn_blocks, 2);
        assert_eq!(summary.applied, 8);
        assert_eq!(summary.skipped_lines, 1);
        assert_eq!(summary.final_version, 4);

        assert_eq!(metrics.blocks().len(), 2);
        assert_eq!(metrics.storage().len(), 2);
        assert_eq!(
            engine.get(DEFAULT_TABLE, 3, "1").unwrap(),
            Some("changed".to_string())
        );
        assert_eq!(
            engine.get(DEFAULT_TABLE, 2, "1").unwrap(),
            Some("v1".to_string())
        );
    }

    #[test]
    fn test_replay_commits_trailing_partial_block() {
        let mut engine = MemoryTrie::new();
        let mut metrics = MetricsRecorder::new();
        let config = ReplayConfig {
            base_ops: 3,
            txn_ops: 0,
            block_size: 2,
            ..ReplayConfig::default()
        };

        let lines: Vec<String> = (1..=3).map(insert_line).collect();
        let summary = {
            let mut replayer = TraceReplayer::new(&mut engine, DEFAULT_TABLE, config);
            replayer.replay_lines(lines, &mut metrics, None).unwrap()
        };

        assert_eq!(summary.base_blocks, 2);
        assert_eq!(summary.final_version, 2);
        assert_eq!(engine.entry_count(DEFAULT_TABLE, 2), 3);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let mut engine = MemoryTrie::new();
        let mut metrics = MetricsRecorder::new();
        let mut replayer =
            TraceReplayer::new(&mut engine, DEFAULT_TABLE, ReplayConfig::default());

        let err = replayer
            .replay_file("/no/such/trace.log", &mut metrics, None)
            .unwrap_err();
        assert!(matches!(err, BenchError::Trace { .. }));
    }
}
