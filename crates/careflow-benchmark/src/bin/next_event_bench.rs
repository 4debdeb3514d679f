//! Next-event prediction benchmark binary.
//!
//! Generates a synthetic procedure cohort, trains the sequence model, and
//! reports held-out ranking metrics as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Default configuration, JSON to stdout
//! cargo run -p careflow-benchmark --bin next_event_bench
//!
//! # Bigger cohort, results to a file
//! cargo run -p careflow-benchmark --bin next_event_bench -- \
//!   --patients 256 --steps 8 --procedures 16 --epochs 20 -o results.json
//! ```

use std::env;
use std::path::PathBuf;

use careflow_benchmark::{BenchmarkConfig, BenchmarkRunner};

struct CliConfig {
    patients: usize,
    steps: usize,
    procedures: usize,
    epochs: usize,
    batch_size: usize,
    num_hidden: usize,
    seed: u64,
    output: Option<PathBuf>,
    verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            patients: 64,
            steps: 6,
            procedures: 8,
            epochs: 10,
            batch_size: 16,
            num_hidden: 32,
            seed: 42,
            output: None,
            verbose: false,
        }
    }
}

fn parse_args() -> CliConfig {
    let args: Vec<String> = env::args().collect();
    let mut config = CliConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--patients" => {
                i += 1;
                if i < args.len() {
                    config.patients = args[i].parse().unwrap_or(config.patients);
                }
            }
            "--steps" => {
                i += 1;
                if i < args.len() {
                    config.steps = args[i].parse().unwrap_or(config.steps);
                }
            }
            "--procedures" => {
                i += 1;
                if i < args.len() {
                    config.procedures = args[i].parse().unwrap_or(config.procedures);
                }
            }
            "--epochs" => {
                i += 1;
                if i < args.len() {
                    config.epochs = args[i].parse().unwrap_or(config.epochs);
                }
            }
            "--batch-size" => {
                i += 1;
                if i < args.len() {
                    config.batch_size = args[i].parse().unwrap_or(config.batch_size);
                }
            }
            "--hidden" => {
                i += 1;
                if i < args.len() {
                    config.num_hidden = args[i].parse().unwrap_or(config.num_hidden);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    config.seed = args[i].parse().unwrap_or(config.seed);
                }
            }
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    config.output = Some(PathBuf::from(&args[i]));
                }
            }
            "-v" | "--verbose" => {
                config.verbose = true;
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!(
                    "Valid: --patients N --steps N --procedures N --epochs N \
                     --batch-size N --hidden N --seed N -o PATH -v"
                );
                std::process::exit(2);
            }
        }
        i += 1;
    }
    config
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = parse_args();
    let mut config = BenchmarkConfig::default();
    config.cohort.num_patients = cli.patients;
    config.cohort.time_length = cli.steps;
    config.cohort.x_depth = cli.procedures;
    config.cohort.seed = cli.seed;
    config.test_patients = (cli.patients / 4).max(1);
    config.epochs = cli.epochs;
    config.batch_size = cli.batch_size;
    config.num_hidden = cli.num_hidden;

    if cli.verbose {
        eprintln!("Next-event benchmark configuration:");
        eprintln!("  Patients: {} ({} held out)", cli.patients, config.test_patients);
        eprintln!("  Steps: {}", cli.steps);
        eprintln!("  Procedure types: {}", cli.procedures);
        eprintln!("  Epochs: {}", cli.epochs);
        eprintln!("  Seed: {}", cli.seed);
        eprintln!();
    }

    let report = match BenchmarkRunner::new(config).run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Benchmark failed: {e}");
            std::process::exit(1);
        }
    };

    eprintln!(
        "Held-out: {} in {} ms",
        report.test_metrics.summary(),
        report.elapsed_ms
    );

    let json = serde_json::to_string_pretty(&report).expect("Failed to serialize report");
    if let Some(path) = &cli.output {
        std::fs::write(path, &json).expect("Failed to write JSON output");
        if cli.verbose {
            eprintln!("JSON results written to: {}", path.display());
        }
    } else {
        println!("{json}");
    }
}
