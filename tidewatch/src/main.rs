use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tidewatch::benchmark::{run_benchmark, BenchmarkConfig};
use tidewatch::config::{init_tracing, load_config};
use tidewatch::runner::{run_scenario, write_report};
use tidewatch::scenario::{load_scenario, load_scenario_dir};
use tidewatch::util::{
    parse_feature_csv, parse_seed, parse_seed_csv, parse_seed_file, seed_range, seed_to_hex,
};
use tidewatch_core::label::decode_status;
use tidewatch_core::FeatureId;

#[derive(Parser, Debug)]
#[command(name = "tidewatch")]
#[command(about = "Tick-driven fishing and combat automation engine, run against scripted worlds")]
struct Cli {
    /// Engine config JSON; `TIDEWATCH_*` variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the registered features in tick order
    ListFeatures,
    /// Print the effective engine config as JSON
    PrintConfig,
    /// Decode the `current/max` status out of a marker label
    DecodeStatus {
        label: String,
    },
    /// Run one scenario and print its metrics
    Run {
        #[arg(long)]
        scenario: PathBuf,
        #[arg(long, default_value = "1")]
        seed: String,
        #[arg(long)]
        max_ticks: Option<u64>,
        /// Replace the scenario's enabled features, e.g. `auto_fishing,lasso`
        #[arg(long)]
        features: Option<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run every scenario in a directory over many seeds
    Bench {
        #[arg(long, default_value = "tidewatch/scenarios")]
        scenarios: PathBuf,
        #[arg(long)]
        seeds: Option<String>,
        #[arg(long)]
        seed_file: Option<PathBuf>,
        #[arg(long)]
        seed_start: Option<String>,
        #[arg(long, default_value_t = 8)]
        seed_count: u32,
        #[arg(long)]
        max_ticks: Option<u64>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        jobs: Option<usize>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let Cli { config, command } = Cli::parse();

    match command {
        Commands::ListFeatures => {
            for id in FeatureId::ALL {
                println!("{:18} {}", id.as_str(), id.description());
            }
        }
        Commands::PrintConfig => {
            let engine = load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&engine)?);
        }
        Commands::DecodeStatus { label } => {
            let status = decode_status(&label)
                .ok_or_else(|| anyhow!("no status found in label '{label}'"))?;
            println!("current={}", status.current);
            println!("max={}", status.max);
            println!("fraction={:.3}", status.fraction());
            println!("live={}", status.is_live());
        }
        Commands::Run {
            scenario,
            seed,
            max_ticks,
            features,
            output,
        } => {
            let engine = load_config(config.as_deref())?;
            let mut loaded = load_scenario(&scenario)?;
            if let Some(csv) = features {
                loaded.features = parse_feature_csv(&csv)?;
            }
            let seed = parse_seed(&seed)?;
            let artifact = run_scenario(&loaded, &engine, seed, max_ticks)?;
            let metrics = &artifact.metrics;

            println!("scenario={}", metrics.scenario);
            println!("seed={}", seed_to_hex(seed));
            println!("ticks={}", metrics.ticks);
            println!("presses={}", metrics.sim.presses);
            println!("casts={}", metrics.sim.casts);
            println!("catches={}", metrics.sim.catches);
            println!("kills={}", metrics.sim.kills);
            println!("captures={}", metrics.sim.captures);
            println!("finishers={}", metrics.sim.finishers);
            println!("orbs={}", metrics.sim.orbs);
            println!("planner={}", metrics.planner.as_str());
            for status in &artifact.statuses {
                if status.enabled {
                    println!("{}={}", status.id.as_str(), status.status);
                }
            }
            if let Some(path) = output {
                write_report(&path, &artifact)?;
                println!("output={}", path.display());
            }
        }
        Commands::Bench {
            scenarios,
            seeds,
            seed_file,
            seed_start,
            seed_count,
            max_ticks,
            out_dir,
            jobs,
        } => {
            let engine = load_config(config.as_deref())?;
            let loaded: Vec<_> = load_scenario_dir(&scenarios)?
                .into_iter()
                .map(|(_, scenario)| scenario)
                .collect();
            let seeds = resolve_seeds(
                seeds.as_deref(),
                seed_file.as_deref(),
                seed_start.as_deref(),
                seed_count,
            )?;
            let out_dir = out_dir
                .unwrap_or_else(|| PathBuf::from(format!("benchmarks/{}", timestamp_suffix())));

            let report = run_benchmark(BenchmarkConfig {
                scenarios: loaded,
                seeds,
                max_ticks,
                engine,
                out_dir: out_dir.clone(),
                jobs,
            })?;

            println!("runs={}", report.run_count);
            println!(
                "jobs={}",
                report
                    .jobs
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "auto".to_string())
            );
            println!("out_dir={}", out_dir.display());
            println!("scenarios:");
            for aggregate in &report.aggregates {
                println!(
                    "  {}  runs={} avg_presses={:.1} avg_catches={:.1} avg_kills={:.1} avg_captures={:.1} apm={:.1}",
                    aggregate.scenario,
                    aggregate.runs,
                    aggregate.avg_presses,
                    aggregate.avg_catches,
                    aggregate.avg_kills,
                    aggregate.avg_captures,
                    aggregate.avg_actions_per_minute,
                );
            }
        }
    }

    Ok(())
}

fn resolve_seeds(
    seeds: Option<&str>,
    seed_file: Option<&Path>,
    seed_start: Option<&str>,
    seed_count: u32,
) -> Result<Vec<u32>> {
    if let Some(path) = seed_file {
        return parse_seed_file(path);
    }
    if let Some(csv) = seeds {
        return parse_seed_csv(csv);
    }
    let start = match seed_start {
        Some(start) => parse_seed(start)?,
        None => 1,
    };
    if seed_count == 0 {
        return Err(anyhow!("--seed-count must be >= 1"));
    }
    Ok(seed_range(start, seed_count))
}

fn timestamp_suffix() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{now}")
}
