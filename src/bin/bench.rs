//! CLI binary for driving benchmark runs against the in-memory reference
//! engine.
//!
//! Usage:
//!   cargo run --bin bench -- --accounts 100000 --load_batch_size 1000
//!   cargo run --bin bench -- --payments 10000 --txn_batch_size 500
//!   cargo run --bin bench -- --trace ops.log --base-tx 10000 --tx 10000

use trie_bench::{
    BenchConfig, MemoryTrie, MetricsRecorder, ReplayConfig, TraceReplayer, Verifier,
    WorkloadDriver, DEFAULT_TABLE,
};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let mut config = BenchConfig::default();
    // Raw strings go straight into the config: malformed numbers are
    // warned about and the defaults kept.
    for knob in [
        "accounts",
        "load_batch_size",
        "operations",
        "txn_batch_size",
        "key_len",
        "value_len",
        "flush_interval",
        "storage_sample_interval",
        "scan_max_len",
        "seed",
    ] {
        if let Some(raw) = parse_arg(&args, &format!("--{}", knob)) {
            config.set(knob, raw);
        }
    }

    if let Some(path) = parse_arg(&args, "--trace") {
        let base_ops = parse_arg(&args, "--base-tx")
            .map(|s| s.parse::<u64>().expect("invalid base-tx"))
            .unwrap_or(10_000);
        let txn_ops = parse_arg(&args, "--tx")
            .map(|s| s.parse::<u64>().expect("invalid tx"))
            .unwrap_or(10_000);
        run_trace_replay(path, base_ops, txn_ops, &config);
        return;
    }

    let payments = parse_arg(&args, "--payments")
        .map(|s| s.parse::<u64>().expect("invalid payments"))
        .unwrap_or(0);

    run_workload(&mut config, payments);
}

fn run_workload(config: &mut BenchConfig, payments: u64) {
    if payments > 0 {
        // Transfers need numeric balances to debit and credit.
        config.initial_balance = Some(10);
    }

    let mut engine = MemoryTrie::new();
    let mut driver = WorkloadDriver::new(&mut engine, config.clone());

    let load_version = driver.load().expect("loading phase failed");
    println!(
        "loaded {} accounts, current version {}",
        config.accounts, load_version
    );

    if payments > 0 {
        driver.run_payments(payments).expect("payment phase failed");
        println!("processed {} transfers, current version {}", payments, driver.current_version());
    } else {
        driver
            .run_transactions()
            .expect("transaction phase failed");
        println!(
            "processed {} operations, current version {}",
            config.operations,
            driver.current_version()
        );
    }

    let (buffer, metrics) = driver.into_parts();
    for sample in metrics.batches() {
        println!(
            "version {}, get latency {:.6}s ({:.0}/s), put latency {:.6}s ({:.0}/s)",
            sample.version,
            sample.get_latency,
            sample.get_throughput,
            sample.put_latency,
            sample.put_throughput
        );
    }

    println!();
    println!("verifying {} buffered records", buffer.len());
    let report = Verifier::new(&engine, DEFAULT_TABLE).verify_all(&buffer);
    println!("verified: {} passed, {} mismatched", report.passed(), report.mismatches.len());

    if !report.all_passed() {
        for mismatch in &report.mismatches {
            eprintln!("  [MISMATCH] {}", mismatch);
        }
        std::process::exit(1);
    }
}

fn run_trace_replay(path: &str, base_ops: u64, txn_ops: u64, config: &BenchConfig) {
    let mut engine = MemoryTrie::new();
    let mut metrics = MetricsRecorder::new();
    let replay = ReplayConfig {
        base_ops,
        txn_ops,
        block_size: config.txn_batch_size,
        flush_interval: config.flush_interval,
        storage_sample_interval: config.storage_sample_interval,
    };

    let mut replayer = TraceReplayer::new(&mut engine, DEFAULT_TABLE, replay);
    // The in-memory engine has no disk footprint to sample.
    let summary = match replayer.replay_file(path, &mut metrics, None) {
        Ok(summary) => summary,
        Err(err) => {
            // A bad trace path skips the replay rather than killing the run.
            eprintln!("[WARN] {}, skipping replay", err);
            return;
        }
    };

    println!(
        "replayed {} ops in {} base + {} txn blocks ({} lines skipped), final version {}",
        summary.applied,
        summary.base_blocks,
        summary.txn_blocks,
        summary.skipped_lines,
        summary.final_version
    );
    for block in metrics.blocks() {
        println!("{{\"block_id\":{},\"elapse\":{}}}", block.block_id, block.elapse);
    }
    for sample in metrics.storage() {
        println!("{{\"block_id\":{},\"size\":{}}}", sample.block_id, sample.size);
    }
}

fn parse_arg<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn print_usage() {
    println!("trie-bench workload driver");
    println!();
    println!("USAGE:");
    println!("  bench [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --accounts <N>                Keys created during loading (default 1000)");
    println!("  --load_batch_size <N>         Puts per load commit (default 100)");
    println!("  --operations <N>              Transaction-phase operations (default 1000)");
    println!("  --txn_batch_size <N>          Mutations per txn commit (default 50)");
    println!("  --key_len <N>                 Key width, forced odd (default 9)");
    println!("  --value_len <N>               Value length (default 16)");
    println!("  --flush_interval <N>          Commits between flushes (default 100)");
    println!("  --scan_max_len <N>            Max scan length (default 10)");
    println!("  --seed <N>                    Generator seed (default 42)");
    println!("  --payments <N>                Run N payment transfers instead of the mix");
    println!("  --trace <FILE>                Replay a recorded trace instead");
    println!("  --base-tx <N>                 Trace ops for the base build (default 10000)");
    println!("  --tx <N>                      Trace ops for the timed replay (default 10000)");
    println!("  --help                        Show this message");
    println!();
    println!("EXAMPLES:");
    println!("  bench --accounts 100000 --load_batch_size 1000");
    println!("  bench --payments 10000 --txn_batch_size 500 --seed 7");
    println!("  bench --trace ops.log --base-tx 10000 --tx 10000");
}
