use crate::runner::{run_scenario, write_report, RunMetrics};
use crate::scenario::Scenario;
use crate::util::seed_to_hex;
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tidewatch_core::constants::TICK_MS;
use tidewatch_core::EngineConfig;
use tracing::info;

#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    pub scenarios: Vec<Scenario>,
    pub seeds: Vec<u32>,
    pub max_ticks: Option<u64>,
    pub engine: EngineConfig,
    pub out_dir: PathBuf,
    pub jobs: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunRecord {
    pub scenario: String,
    pub seed: u32,
    pub seed_hex: String,
    pub ticks: u64,
    pub presses: u64,
    pub casts: u64,
    pub catches: u64,
    pub kills: u64,
    pub captures: u64,
    pub finishers: u64,
    pub orbs: u64,
    pub actions_per_minute: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScenarioAggregate {
    pub scenario: String,
    pub runs: usize,
    pub avg_presses: f64,
    pub avg_catches: f64,
    pub avg_kills: f64,
    pub avg_captures: f64,
    pub max_kills: u64,
    pub avg_actions_per_minute: f64,
    pub max_actions_per_minute: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct BenchmarkReport {
    pub generated_unix_s: u64,
    pub max_ticks: Option<u64>,
    pub jobs: Option<usize>,
    pub scenarios: Vec<String>,
    pub seeds: Vec<u32>,
    pub run_count: usize,
    pub aggregates: Vec<ScenarioAggregate>,
    pub runs: Vec<RunRecord>,
}

fn actions_per_minute(metrics: &RunMetrics) -> f64 {
    let minutes = (metrics.ticks * TICK_MS) as f64 / 60_000.0;
    if minutes <= 0.0 {
        return 0.0;
    }
    metrics.sim.presses as f64 / minutes
}

pub fn run_benchmark(config: BenchmarkConfig) -> Result<BenchmarkReport> {
    if config.seeds.is_empty() {
        return Err(anyhow!("benchmark requires at least one seed"));
    }
    if config.scenarios.is_empty() {
        return Err(anyhow!("benchmark requires at least one scenario"));
    }
    if let Some(jobs) = config.jobs {
        if jobs == 0 {
            return Err(anyhow!("benchmark --jobs must be >= 1 when provided"));
        }
    }
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("failed creating {}", config.out_dir.display()))?;

    let run_jobs: Vec<(&Scenario, u32)> = config
        .scenarios
        .iter()
        .flat_map(|scenario| config.seeds.iter().map(move |seed| (scenario, *seed)))
        .collect();

    let run_one = |(scenario, seed): &(&Scenario, u32)| -> Result<RunMetrics> {
        let artifact = run_scenario(scenario, &config.engine, *seed, config.max_ticks)
            .with_context(|| {
                format!(
                    "benchmark run failed for scenario={} seed={seed:#x}",
                    scenario.name
                )
            })?;
        Ok(artifact.metrics)
    };

    let run_results: Vec<Result<RunMetrics>> = if let Some(jobs) = config.jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build rayon threadpool")?;
        pool.install(|| run_jobs.par_iter().map(run_one).collect())
    } else {
        run_jobs.par_iter().map(run_one).collect()
    };

    let mut runs = Vec::with_capacity(run_results.len());
    for result in run_results {
        runs.push(result?);
    }

    let mut grouped: BTreeMap<String, Vec<&RunMetrics>> = BTreeMap::new();
    for run in &runs {
        grouped.entry(run.scenario.clone()).or_default().push(run);
    }

    let mut aggregates = Vec::with_capacity(grouped.len());
    for (scenario, scenario_runs) in grouped {
        let count = scenario_runs.len() as f64;
        let avg = |pick: fn(&RunMetrics) -> u64| {
            scenario_runs.iter().map(|run| pick(run) as f64).sum::<f64>() / count
        };
        let rates: Vec<f64> = scenario_runs
            .iter()
            .map(|run| actions_per_minute(run))
            .collect();
        aggregates.push(ScenarioAggregate {
            runs: scenario_runs.len(),
            avg_presses: avg(|run| run.sim.presses),
            avg_catches: avg(|run| run.sim.catches),
            avg_kills: avg(|run| run.sim.kills),
            avg_captures: avg(|run| run.sim.captures),
            max_kills: scenario_runs
                .iter()
                .map(|run| run.sim.kills)
                .max()
                .unwrap_or_default(),
            avg_actions_per_minute: rates.iter().sum::<f64>() / count,
            max_actions_per_minute: rates.iter().copied().fold(0.0, f64::max),
            scenario,
        });
    }

    let mut run_records: Vec<RunRecord> = runs
        .iter()
        .map(|run| RunRecord {
            scenario: run.scenario.clone(),
            seed: run.seed,
            seed_hex: seed_to_hex(run.seed),
            ticks: run.ticks,
            presses: run.sim.presses,
            casts: run.sim.casts,
            catches: run.sim.catches,
            kills: run.sim.kills,
            captures: run.sim.captures,
            finishers: run.sim.finishers,
            orbs: run.sim.orbs,
            actions_per_minute: actions_per_minute(run),
        })
        .collect();
    run_records.sort_by(|a, b| {
        a.scenario
            .cmp(&b.scenario)
            .then_with(|| b.actions_per_minute.total_cmp(&a.actions_per_minute))
            .then_with(|| a.seed.cmp(&b.seed))
    });

    let report = BenchmarkReport {
        generated_unix_s: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or_default(),
        max_ticks: config.max_ticks,
        jobs: config.jobs,
        scenarios: config
            .scenarios
            .iter()
            .map(|scenario| scenario.name.clone())
            .collect(),
        seeds: config.seeds.clone(),
        run_count: run_records.len(),
        aggregates,
        runs: run_records,
    };

    let summary = config.out_dir.join("summary.json");
    write_report(&summary, &report)?;
    info!(runs = report.run_count, summary = %summary.display(), "benchmark complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(out_dir: PathBuf) -> BenchmarkConfig {
        BenchmarkConfig {
            scenarios: vec![Scenario {
                max_ticks: 200,
                ..Scenario::default()
            }],
            seeds: vec![1, 2],
            max_ticks: None,
            engine: EngineConfig::default(),
            out_dir,
            jobs: Some(1),
        }
    }

    #[test]
    fn zero_jobs_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = config(dir.path().to_path_buf());
        config.jobs = Some(0);
        assert!(run_benchmark(config).is_err());
        Ok(())
    }

    #[test]
    fn empty_seed_list_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = config(dir.path().to_path_buf());
        config.seeds.clear();
        assert!(run_benchmark(config).is_err());
        Ok(())
    }

    #[test]
    fn writes_summary() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let report = run_benchmark(config(dir.path().join("bench")))?;
        assert_eq!(report.run_count, 2);
        assert_eq!(report.aggregates.len(), 1);
        assert!(dir.path().join("bench").join("summary.json").exists());
        Ok(())
    }
}
