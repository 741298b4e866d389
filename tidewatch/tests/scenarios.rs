use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tidewatch::runner::{run_scenario, RunArtifact};
use tidewatch::scenario::{load_scenario, load_scenario_dir};
use tidewatch_core::{EngineConfig, FeatureId};

fn repo_path(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(path)
}

fn run(name: &str, seed: u32) -> Result<RunArtifact> {
    let scenario = load_scenario(&repo_path(&format!("scenarios/{name}.json")))?;
    run_scenario(&scenario, &EngineConfig::default(), seed, None)
}

fn counter(artifact: &RunArtifact, id: FeatureId, name: &str) -> Result<u64> {
    let status = artifact
        .statuses
        .iter()
        .find(|status| status.id == id)
        .ok_or_else(|| anyhow!("no status for {id}"))?;
    status
        .counters
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| *value)
        .ok_or_else(|| anyhow!("{id} has no counter {name}"))
}

#[test]
fn every_bundled_scenario_loads_and_runs() -> Result<()> {
    let scenarios = load_scenario_dir(&repo_path("scenarios"))?;
    assert!(scenarios.len() >= 5, "found {}", scenarios.len());
    for (path, scenario) in scenarios {
        let artifact = run_scenario(&scenario, &EngineConfig::default(), 0xA57E_0001, Some(200))?;
        assert_eq!(artifact.metrics.ticks, 200, "scenario {}", path.display());
    }
    Ok(())
}

#[test]
fn calm_fishing_catches_fish() -> Result<()> {
    let artifact = run("fishing_calm", 11)?;
    assert!(artifact.metrics.sim.casts > 1);
    assert!(artifact.metrics.sim.catches > 0);
    assert_eq!(artifact.metrics.sim.kills, 0);
    assert!(counter(&artifact, FeatureId::AutoFishing, "casts")? > 1);
    Ok(())
}

#[test]
fn school_is_cleared_and_rod_handed_back() -> Result<()> {
    let artifact = run("sea_creature_school", 5)?;
    assert!(artifact.metrics.sim.kills >= 3, "kills={}", artifact.metrics.sim.kills);
    assert!(counter(&artifact, FeatureId::SeaCreatureCombat, "attacks")? > 0);
    assert!(artifact.metrics.sim.catches > 0);
    Ok(())
}

#[test]
fn melee_strategy_brings_down_guardian() -> Result<()> {
    let artifact = run("melee_guardian", 3)?;
    assert!(artifact.metrics.sim.kills >= 1);
    Ok(())
}

#[test]
fn lasso_captures_drifting_target() -> Result<()> {
    let artifact = run("lasso_zee", 9)?;
    assert!(artifact.metrics.sim.captures >= 1);
    assert!(counter(&artifact, FeatureId::LassoCapture, "throws")? >= 1);
    assert!(counter(&artifact, FeatureId::LassoCapture, "captures")? >= 1);
    Ok(())
}

#[test]
fn farmer_bursts_bezals_down() -> Result<()> {
    let artifact = run("bezal_farm", 2)?;
    assert!(artifact.metrics.sim.kills >= 1);
    assert!(counter(&artifact, FeatureId::BurstFarmer, "bursts")? >= 2);
    Ok(())
}

#[test]
fn flare_macro_orbs_once_then_loses_the_flare() -> Result<()> {
    let artifact = run("flare_camp", 6)?;
    assert_eq!(artifact.metrics.sim.orbs, 1);
    assert!(counter(&artifact, FeatureId::FlareMacro, "volleys")? >= 5);
    assert_eq!(counter(&artifact, FeatureId::FlareMacro, "lost")?, 1);
    assert!(artifact.metrics.sim.kills >= 1);
    Ok(())
}

#[test]
fn distance_assist_only_watches() -> Result<()> {
    let artifact = run("spike_approach", 4)?;
    assert_eq!(artifact.metrics.sim.presses, 0);
    assert_eq!(artifact.metrics.sim.selections, 0);
    assert!(counter(&artifact, FeatureId::DistanceAssist, "scans")? >= 1);
    Ok(())
}

#[test]
fn runs_are_reproducible_per_seed() -> Result<()> {
    let first = run("sea_creature_school", 77)?;
    let second = run("sea_creature_school", 77)?;
    assert_eq!(first.metrics.sim, second.metrics.sim);
    Ok(())
}
