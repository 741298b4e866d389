use anyhow::Result;
use std::fs;
use tidewatch::benchmark::{run_benchmark, BenchmarkConfig};
use tidewatch::config::load_config;
use tidewatch::runner::{run_scenario, write_report};
use tidewatch::scenario::Scenario;
use tidewatch_core::strategy::StrategyKind;
use tidewatch_core::EngineConfig;

#[test]
fn benchmark_writes_summary_for_each_scenario() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out_dir = dir.path().join("bench");
    let scenarios = vec![
        Scenario {
            name: "a".to_string(),
            max_ticks: 150,
            ..Scenario::default()
        },
        Scenario {
            name: "b".to_string(),
            max_ticks: 150,
            ..Scenario::default()
        },
    ];
    let report = run_benchmark(BenchmarkConfig {
        scenarios,
        seeds: vec![1, 2, 3],
        max_ticks: None,
        engine: EngineConfig::default(),
        out_dir: out_dir.clone(),
        jobs: Some(2),
    })?;
    assert_eq!(report.run_count, 6);
    let names: Vec<&str> = report
        .aggregates
        .iter()
        .map(|aggregate| aggregate.scenario.as_str())
        .collect();
    assert_eq!(names, vec!["a", "b"]);

    let summary: serde_json::Value =
        serde_json::from_slice(&fs::read(out_dir.join("summary.json"))?)?;
    assert_eq!(summary["run_count"], 6);
    Ok(())
}

#[test]
fn config_file_round_trips_through_loader() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("engine.json");
    fs::write(
        &path,
        r#"{ "combat": { "strategy": "melee", "cluster_threshold": 2 } }"#,
    )?;
    let config = load_config(Some(&path))?;
    assert_eq!(config.combat.strategy, StrategyKind::Melee);
    assert_eq!(config.combat.cluster_threshold, 2);
    Ok(())
}

#[test]
fn run_report_is_written_as_json() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("run.json");
    let scenario = Scenario {
        max_ticks: 100,
        ..Scenario::default()
    };
    let artifact = run_scenario(&scenario, &EngineConfig::default(), 1, None)?;
    write_report(&path, &artifact)?;
    let value: serde_json::Value = serde_json::from_slice(&fs::read(&path)?)?;
    assert_eq!(value["metrics"]["ticks"], 100);
    assert!(value["statuses"].as_array().is_some_and(|list| !list.is_empty()));
    Ok(())
}
