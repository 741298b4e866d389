use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;
use std::path::Path;
use tidewatch_core::strategy::StrategyKind;
use tidewatch_core::EngineConfig;

/// Loads the engine config: JSON file if given, then `TIDEWATCH_*` overrides,
/// then clamping and validation.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading config {}", path.display()))?;
            serde_json::from_str::<EngineConfig>(&raw)
                .with_context(|| format!("failed parsing config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    apply_overrides_from(&mut config, |name| env::var(name).ok());
    config.clamp();
    config
        .validate()
        .map_err(|err| anyhow!("invalid engine config: {err}"))?;
    Ok(config)
}

/// Applies environment-style overrides read through `lookup`. Unparseable or
/// zero values keep the current setting.
pub fn apply_overrides_from<F>(config: &mut EngineConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    config.combat.cluster_threshold =
        env.u32("TIDEWATCH_CLUSTER_THRESHOLD", config.combat.cluster_threshold);
    if let Some(raw) = env.raw("TIDEWATCH_STRATEGY") {
        match raw.parse::<StrategyKind>() {
            Ok(kind) => config.combat.strategy = kind,
            Err(err) => tracing::warn!("ignoring TIDEWATCH_STRATEGY: {err}"),
        }
    }
    config.combat.require_fishing =
        env.bool("TIDEWATCH_REQUIRE_FISHING", config.combat.require_fishing);
    config.input.min_interval_ms =
        env.u64("TIDEWATCH_MIN_INTERVAL_MS", config.input.min_interval_ms);
    config.lasso.timeout_ms = env.u64("TIDEWATCH_LASSO_TIMEOUT_MS", config.lasso.timeout_ms);
    config.distance_assist.min_distance = env.f64(
        "TIDEWATCH_ASSIST_DISTANCE",
        config.distance_assist.min_distance,
    );
    config.distance_assist.aim_assist =
        env.bool("TIDEWATCH_ASSIST_AIM", config.distance_assist.aim_assist);
    config.burst_farmer.finisher_enabled = env.bool(
        "TIDEWATCH_FINISHER",
        config.burst_farmer.finisher_enabled,
    );
    config.planner.enabled = env.bool("TIDEWATCH_PLANNER", config.planner.enabled);
    config.planner.run_minutes =
        env.u64("TIDEWATCH_RUN_MINUTES", config.planner.run_minutes);
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn u32(&self, name: &str, default: u32) -> u32 {
        self.raw(name)
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(default)
    }

    fn u64(&self, name: &str, default: u64) -> u64 {
        self.raw(name)
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(default)
    }

    fn f64(&self, name: &str, default: f64) -> f64 {
        self.raw(name)
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value > 0.0)
            .unwrap_or(default)
    }

    fn bool(&self, name: &str, default: bool) -> bool {
        let Some(value) = self.raw(name) else {
            return default;
        };
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let mut config = EngineConfig::default();
        apply_overrides_from(&mut config, |name| vars.get(name).cloned());
        config
    }

    #[test]
    fn overrides_apply_and_bad_values_fall_back() {
        let config = overrides(&[
            ("TIDEWATCH_CLUSTER_THRESHOLD", "4"),
            ("TIDEWATCH_STRATEGY", "melee"),
            ("TIDEWATCH_ASSIST_AIM", "yes"),
            ("TIDEWATCH_MIN_INTERVAL_MS", "0"),
            ("TIDEWATCH_ASSIST_DISTANCE", "far"),
        ]);
        let defaults = EngineConfig::default();
        assert_eq!(config.combat.cluster_threshold, 4);
        assert_eq!(config.combat.strategy, StrategyKind::Melee);
        assert!(config.distance_assist.aim_assist);
        assert_eq!(config.input.min_interval_ms, defaults.input.min_interval_ms);
        assert_eq!(
            config.distance_assist.min_distance,
            defaults.distance_assist.min_distance
        );
    }

    #[test]
    fn unrecognised_flag_keeps_current_value() {
        let mut config = EngineConfig::default();
        config.planner.enabled = true;
        config.combat.require_fishing = true;
        let vars: HashMap<&str, &str> = [
            ("TIDEWATCH_PLANNER", "enabled"),
            ("TIDEWATCH_REQUIRE_FISHING", "Off"),
        ]
        .into_iter()
        .collect();
        apply_overrides_from(&mut config, |name| vars.get(name).map(|v| v.to_string()));
        assert!(config.planner.enabled);
        assert!(!config.combat.require_fishing);
    }

    #[test]
    fn unknown_strategy_is_ignored() {
        let config = overrides(&[("TIDEWATCH_STRATEGY", "archer")]);
        assert_eq!(config.combat.strategy, EngineConfig::default().combat.strategy);
    }

    #[test]
    fn threshold_override_is_clamped_on_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{ "combat": { "cluster_threshold": 64 } }"#)?;
        let config = load_config(Some(&path))?;
        assert_eq!(config.combat.cluster_threshold, 30);
        Ok(())
    }

    #[test]
    fn broken_pattern_is_rejected_on_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{ "burst_farmer": { "pattern": "(" } }"#)?;
        assert!(load_config(Some(&path)).is_err());
        Ok(())
    }
}
