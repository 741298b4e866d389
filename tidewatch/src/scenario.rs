use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tidewatch_core::constants::HOTBAR_SLOTS;
use tidewatch_core::geometry::Vec3;
use tidewatch_core::strategy::StrategyKind;
use tidewatch_core::{FeatureId, Tool};

/// A scripted world for the simulator: who stands where, what they carry,
/// and what shows up when.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub max_ticks: u64,
    pub features: Vec<FeatureId>,
    pub strategy: Option<StrategyKind>,
    pub observer: ObserverSetup,
    pub spawns: Vec<Spawn>,
    pub fishing: FishingSetup,
    pub combat: CombatSetup,
    pub lasso: LassoSetup,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            description: String::new(),
            max_ticks: 1_200,
            features: vec![FeatureId::AutoFishing],
            strategy: None,
            observer: ObserverSetup::default(),
            spawns: Vec::new(),
            fishing: FishingSetup::default(),
            combat: CombatSetup::default(),
            lasso: LassoSetup::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverSetup {
    pub name: String,
    pub position: Vec3,
    pub eye_height: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub selected_slot: usize,
    pub hotbar: Vec<Option<Tool>>,
}

impl Default for ObserverSetup {
    fn default() -> Self {
        Self {
            name: "Angler".to_string(),
            position: Vec3::ZERO,
            eye_height: 1.62,
            yaw: 0.0,
            pitch: 0.0,
            selected_slot: 0,
            hotbar: vec![
                Some(Tool::new("Rod of the Sea", Some("fishing_rod"))),
                Some(Tool::new("Hyperion", Some("sword"))),
                Some(Tool::new("Flaming Katana", Some("sword"))),
                Some(Tool::new("Prime Huntaxe", Some("axe"))),
                Some(Tool::new("Black Hole", None)),
                Some(Tool::new("Lasso", None)),
                Some(Tool::new("Overflux Power Orb", None)),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnKind {
    /// Body with a status marker floating above it.
    #[default]
    Creature,
    /// Roaming lasso target; only a name marker, no status.
    Lasso,
    /// Free-standing marker with a fixed label.
    Marker,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Spawn {
    pub tick: u64,
    pub kind: SpawnKind,
    pub name: String,
    pub position: Vec3,
    /// Blocks per tick.
    pub velocity: Vec3,
    pub max_status: Option<f64>,
    pub type_tag: Option<String>,
    pub count: u32,
    /// Offset between consecutive copies when `count > 1`.
    pub spacing: Vec3,
}

impl Default for Spawn {
    fn default() -> Self {
        Self {
            tick: 0,
            kind: SpawnKind::Creature,
            name: "Sea Walker".to_string(),
            position: Vec3::new(0.0, 0.0, 4.0),
            velocity: Vec3::ZERO,
            max_status: Some(1_000.0),
            type_tag: Some("zombie".to_string()),
            count: 1,
            spacing: Vec3::new(1.5, 0.0, 0.0),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FishingSetup {
    pub bite_min_ticks: u64,
    pub bite_max_ticks: u64,
    pub bite_window_ticks: u64,
    /// Chance that a caught fish is a sea creature instead.
    pub creature_chance: f64,
    pub creature_name: String,
    pub creature_status: f64,
    pub creature_offset: Vec3,
}

impl Default for FishingSetup {
    fn default() -> Self {
        Self {
            bite_min_ticks: 20,
            bite_max_ticks: 60,
            bite_window_ticks: 20,
            creature_chance: 0.0,
            creature_name: "Sea Walker".to_string(),
            creature_status: 1_000.0,
            creature_offset: Vec3::new(2.0, 0.0, 2.0),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSetup {
    pub area_damage: f64,
    pub area_radius: f64,
    pub melee_damage: f64,
    pub melee_reach: f64,
    pub finisher_damage: f64,
    pub finisher_radius: f64,
}

impl Default for CombatSetup {
    fn default() -> Self {
        Self {
            area_damage: 600.0,
            area_radius: 6.0,
            melee_damage: 300.0,
            melee_reach: 4.0,
            finisher_damage: 50_000.0,
            finisher_radius: 8.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LassoSetup {
    pub reach: f64,
    pub reels_needed: u32,
    pub indicator_delay_ticks: u64,
}

impl Default for LassoSetup {
    fn default() -> Self {
        Self {
            reach: 15.0,
            reels_needed: 1,
            indicator_delay_ticks: 3,
        }
    }
}

impl Scenario {
    pub fn from_json(raw: &str) -> Result<Self> {
        let scenario: Scenario =
            serde_json::from_str(raw).context("failed parsing scenario json")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_ticks == 0 {
            return Err(anyhow!("scenario '{}': max_ticks must be > 0", self.name));
        }
        if self.observer.hotbar.len() > HOTBAR_SLOTS {
            return Err(anyhow!(
                "scenario '{}': hotbar has {} slots, at most {HOTBAR_SLOTS} allowed",
                self.name,
                self.observer.hotbar.len()
            ));
        }
        if self.observer.selected_slot >= HOTBAR_SLOTS {
            return Err(anyhow!(
                "scenario '{}': selected_slot {} out of range",
                self.name,
                self.observer.selected_slot
            ));
        }
        if self.fishing.bite_min_ticks > self.fishing.bite_max_ticks {
            return Err(anyhow!(
                "scenario '{}': bite_min_ticks exceeds bite_max_ticks",
                self.name
            ));
        }
        if !(0.0..=1.0).contains(&self.fishing.creature_chance) {
            return Err(anyhow!(
                "scenario '{}': creature_chance must be within [0, 1]",
                self.name
            ));
        }
        Ok(())
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading scenario {}", path.display()))?;
    Scenario::from_json(&raw).with_context(|| format!("invalid scenario {}", path.display()))
}

/// Every `*.json` scenario in `dir`, sorted by file name.
pub fn load_scenario_dir(dir: &Path) -> Result<Vec<(PathBuf, Scenario)>> {
    let mut paths = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed listing {}", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    paths
        .into_iter()
        .map(|path| load_scenario(&path).map(|scenario| (path, scenario)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_json_fills_defaults() -> Result<()> {
        let scenario = Scenario::from_json(
            r#"{
                "name": "cluster",
                "features": ["auto_fishing", "sea_creature_combat"],
                "spawns": [{ "tick": 5, "count": 3 }]
            }"#,
        )?;
        assert_eq!(scenario.max_ticks, 1_200);
        assert_eq!(scenario.spawns[0].count, 3);
        assert_eq!(scenario.spawns[0].name, "Sea Walker");
        assert_eq!(scenario.observer.hotbar.len(), 6);
        Ok(())
    }

    #[test]
    fn oversized_hotbar_is_rejected() {
        let raw = format!(
            r#"{{ "observer": {{ "hotbar": [{}] }} }}"#,
            vec!["null"; 10].join(",")
        );
        assert!(Scenario::from_json(&raw).is_err());
    }

    #[test]
    fn zero_ticks_is_rejected() {
        assert!(Scenario::from_json(r#"{ "max_ticks": 0 }"#).is_err());
    }
}
