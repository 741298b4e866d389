//! Engine configuration. Every constant the engine relies on lives here with
//! its default so hosts can override it from a file or the environment.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{
    ASSIST_DISTANCE, ASSIST_RADIUS, ASSIST_SCAN_MS, BITE_DEBOUNCE_MS, BITE_LABEL, BITE_RADIUS,
    BURST_COOLDOWN_MS, CAST_SETTLE_TICKS, CLUSTER_THRESHOLD_MAX, CLUSTER_THRESHOLD_MIN,
    COMBAT_DETECTION_RADIUS, COMBAT_RECOVER_MS, FARMER_ATTACK_DISTANCE,
    FARMER_FINISHER_WAIT_TICKS, FARMER_LOW_STATUS, FARMER_STATUS_CHECK_MS, FLARE_CLICK_COUNT,
    FLARE_ORB_INTERVAL_MS, FLARE_RADIUS, HOLD_MAX_MS,
    HOLD_MIN_MS, LASSO_CONVERGE_DEGREES, LASSO_ESCAPE_DISTANCE, LASSO_RADIUS, LASSO_REEL_RADIUS,
    LASSO_ROTATION_SPEED, LASSO_TIMEOUT_MS, MAGE_COOLDOWN_MS, MARKER_RADIUS,
    MELEE_COOLDOWN_MS, MELEE_ROTATION_SPEED, POST_REEL_MIN_TICKS, PROXY_MARGIN_HORIZONTAL,
    PROXY_MARGIN_VERTICAL, ROTATION_SPEED_MAX, ROTATION_SPEED_MIN, TICK_MS,
    WIDE_MARGIN_HORIZONTAL, WIDE_MARGIN_VERTICAL,
};
use crate::error::ConfigError;
use crate::label::LabelFilter;
use crate::proxy::ProxySearch;
use crate::strategy::StrategyKind;
use crate::timer::TimerSpec;
use crate::tools::ToolPolicy;

const SEA_CREATURES: &[&str] = &[
    "Sea Walker",
    "Night Squid",
    "Sea Guardian",
    "Sea Witch",
    "Sea Archer",
    "Rider of the Deep",
    "Catfish",
    "Carrot King",
    "Sea Leech",
    "Guardian Defender",
    "Deep Sea Protector",
    "Water Hydra",
    "Sea Emperor",
    "Agarimoo",
    "Oasis Rabbit",
    "Oasis Sheep",
    "Water Worm",
    "Poisoned Water Worm",
    "Abyssal Miner",
    "Scarecrow",
    "Nightmare",
    "Werewolf",
    "Phantom Fisher",
    "Grim Reaper",
    "Frozen Steve",
    "Frosty",
    "Grinch",
    "Nutcracker",
    "Yeti",
    "Reindrake",
    "Nurse Shark",
    "Blue Shark",
    "Tiger Shark",
    "Great White Shark",
    "Plhlegblast",
    "Magma Slug",
    "Moogma",
    "Lava Leech",
    "Pyroclastic Worm",
    "Lava Flame",
    "Fire Eel",
    "Taurus",
    "Thunder",
    "Lord Jawbus",
    "Flaming Worm",
    "Lava Blaze",
    "Lava Pigman",
    "Trash Gobbler",
    "Dumpster Diver",
    "Banshee",
    "Bayou Sludge",
    "Alligator",
    "Titanoboa",
    "Blue Ringed Octopus",
    "Wiki Tiki",
    "Fried Chicken",
    "Fireproof Witch",
    "Snapping Turtle",
    "Ragnarok",
];

const VANILLA_SEA_TYPES: &[&str] = &["squid", "glow_squid", "guardian", "elder_guardian"];

const MAGE_PRIMARY_TOOLS: &[&str] = &["hyperion", "valkyrie", "astraea", "scylla"];

const MAGE_SECONDARY_TOOLS: &[&str] = &[
    "fire veil wand",
    "fire veil",
    "wand of healing",
    "wand of strength",
    "wand of atonement",
    "wand of mending",
    "wand of restoration",
];

const MELEE_TOOLS: &[&str] = &[
    "rookie axe",
    "promising axe",
    "sweet axe",
    "efficient axe",
    "treecapitator",
    "jungle axe",
    "axe",
    "sword",
    "blade",
    "cleaver",
    "katana",
];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub horizontal_margin: f64,
    pub vertical_margin: f64,
    pub preferred_type: Option<String>,
}

impl SearchConfig {
    pub fn narrow() -> Self {
        Self {
            horizontal_margin: PROXY_MARGIN_HORIZONTAL,
            vertical_margin: PROXY_MARGIN_VERTICAL,
            preferred_type: None,
        }
    }

    pub fn wide() -> Self {
        Self {
            horizontal_margin: WIDE_MARGIN_HORIZONTAL,
            vertical_margin: WIDE_MARGIN_VERTICAL,
            preferred_type: None,
        }
    }

    pub fn to_search(&self) -> ProxySearch {
        ProxySearch {
            horizontal_margin: self.horizontal_margin,
            vertical_margin: self.vertical_margin,
            preferred_type: self.preferred_type.clone(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::narrow()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub min_interval_ms: u64,
    pub hold_min_ms: u64,
    pub hold_max_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: TICK_MS,
            hold_min_ms: HOLD_MIN_MS,
            hold_max_ms: HOLD_MAX_MS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FishingConfig {
    pub recast: TimerSpec,
    pub reel: TimerSpec,
    pub post_reel_min_ticks: u32,
    pub cast_settle_ticks: u32,
    pub bite_label: String,
    pub bite_radius: f64,
    pub bite_debounce_ms: u64,
    /// Reel in and recast when no bite arrives within this many ticks.
    pub max_wait_ticks: u32,
}

impl Default for FishingConfig {
    fn default() -> Self {
        Self {
            recast: TimerSpec::proportional(10, 0.2, 2, 50),
            reel: TimerSpec::proportional(6, 0.15, 2, 15),
            post_reel_min_ticks: POST_REEL_MIN_TICKS,
            cast_settle_ticks: CAST_SETTLE_TICKS,
            bite_label: BITE_LABEL.to_string(),
            bite_radius: BITE_RADIUS,
            bite_debounce_ms: BITE_DEBOUNCE_MS,
            max_wait_ticks: 1_200,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MageConfig {
    pub cooldown_ms: u64,
    pub look_down: bool,
    /// Tools that get the look-down override.
    pub look_down_tools: Vec<String>,
    pub tools: ToolPolicy,
}

impl Default for MageConfig {
    fn default() -> Self {
        let mut priority = strings(MAGE_PRIMARY_TOOLS);
        priority.extend(strings(MAGE_SECONDARY_TOOLS));
        Self {
            cooldown_ms: MAGE_COOLDOWN_MS,
            look_down: true,
            look_down_tools: strings(MAGE_PRIMARY_TOOLS),
            tools: ToolPolicy::named(priority),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeConfig {
    pub cooldown_ms: u64,
    pub rotation_speed: f64,
    pub tools: ToolPolicy,
}

impl Default for MeleeConfig {
    fn default() -> Self {
        let mut excluded = strings(MAGE_PRIMARY_TOOLS);
        excluded.extend(strings(MAGE_SECONDARY_TOOLS));
        Self {
            cooldown_ms: MELEE_COOLDOWN_MS,
            rotation_speed: MELEE_ROTATION_SPEED,
            tools: ToolPolicy {
                priority: Vec::new(),
                allowed: strings(MELEE_TOOLS),
                allowed_kinds: strings(&["sword", "axe"]),
                excluded,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub detection_radius: f64,
    pub marker_radius: f64,
    pub cluster_threshold: u32,
    pub strategy: StrategyKind,
    pub recover_delay_ms: u64,
    pub escape_distance: f64,
    pub exclusion_ticks: u64,
    pub engage_timeout_ms: u64,
    /// Wait between committing to a target and engaging it.
    pub engage_delay: TimerSpec,
    /// Wait after each attack before the next one is tried.
    pub settle: TimerSpec,
    /// Only run while the fishing feature is enabled.
    pub require_fishing: bool,
    pub creature_names: Vec<String>,
    pub creature_types: Vec<String>,
    pub search: SearchConfig,
    pub mage: MageConfig,
    pub melee: MeleeConfig,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            detection_radius: COMBAT_DETECTION_RADIUS,
            marker_radius: MARKER_RADIUS,
            cluster_threshold: 1,
            strategy: StrategyKind::Mage,
            recover_delay_ms: COMBAT_RECOVER_MS,
            escape_distance: 12.0,
            exclusion_ticks: 200,
            engage_timeout_ms: 30_000,
            engage_delay: TimerSpec::new(1.0, 1.0, 0, 2),
            settle: TimerSpec::new(2.0, 1.0, 1, 3),
            require_fishing: true,
            creature_names: strings(SEA_CREATURES),
            creature_types: strings(VANILLA_SEA_TYPES),
            search: SearchConfig::narrow(),
            mage: MageConfig::default(),
            melee: MeleeConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LassoConfig {
    pub names: Vec<String>,
    pub detection_radius: f64,
    pub escape_distance: f64,
    pub timeout_ms: u64,
    pub reel_label: String,
    pub reel_radius: f64,
    pub reel_delay: TimerSpec,
    pub settle: TimerSpec,
    pub rotation_speed: f64,
    pub converge_degrees: f64,
    /// Vertical offset from the marker to the aim point.
    pub aim_offset: f64,
    pub exclusion_ticks: u64,
    pub return_to_origin: bool,
    pub return_max_ticks: u32,
    /// Hotbar tool selected before throwing, if set.
    pub tool_name: Option<String>,
}

impl Default for LassoConfig {
    fn default() -> Self {
        Self {
            names: strings(&["exe", "wai", "zee"]),
            detection_radius: LASSO_RADIUS,
            escape_distance: LASSO_ESCAPE_DISTANCE,
            timeout_ms: LASSO_TIMEOUT_MS,
            reel_label: "reel".to_string(),
            reel_radius: LASSO_REEL_RADIUS,
            reel_delay: TimerSpec::fixed(1),
            settle: TimerSpec::new(2.0, 1.0, 1, 4),
            rotation_speed: LASSO_ROTATION_SPEED,
            converge_degrees: LASSO_CONVERGE_DEGREES,
            aim_offset: -1.0,
            exclusion_ticks: 1_200,
            return_to_origin: true,
            return_max_ticks: 40,
            tool_name: Some("lasso".to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceAssistConfig {
    pub pattern: String,
    pub detection_radius: f64,
    pub scan_interval_ms: u64,
    pub min_distance: f64,
    pub aim_assist: bool,
    pub rotation_speed: f64,
    pub escape_distance: f64,
    pub exclusion_ticks: u64,
    pub search: SearchConfig,
}

impl Default for DistanceAssistConfig {
    fn default() -> Self {
        Self {
            pattern: r"spike.*\d+/\d+".to_string(),
            detection_radius: ASSIST_RADIUS,
            scan_interval_ms: ASSIST_SCAN_MS,
            min_distance: ASSIST_DISTANCE,
            aim_assist: false,
            rotation_speed: MELEE_ROTATION_SPEED,
            escape_distance: 64.0,
            exclusion_ticks: 200,
            search: SearchConfig {
                preferred_type: Some("pufferfish".to_string()),
                ..SearchConfig::wide()
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstFarmerConfig {
    pub pattern: String,
    pub detection_radius: f64,
    pub attack_distance: f64,
    pub weapon_name: String,
    pub auto_aim: bool,
    pub rotation_speed: f64,
    pub click_count: u32,
    pub click_gap_ticks: u32,
    pub cooldown_ms: u64,
    pub status_check_delay_ms: u64,
    pub low_status_threshold: f64,
    pub finisher_enabled: bool,
    pub finisher_name: String,
    pub finisher_wait_ticks: u32,
    pub escape_distance: f64,
    pub exclusion_ticks: u64,
    /// Wait between committing to a target and equipping the weapon.
    pub engage_delay: TimerSpec,
    /// Extra wait after the status check delay before the next burst.
    pub settle: TimerSpec,
    pub search: SearchConfig,
}

impl Default for BurstFarmerConfig {
    fn default() -> Self {
        Self {
            pattern: r"bezal.*[\d,]+(?:\.\d+)?[km]?/[\d,]+(?:\.\d+)?[km]?".to_string(),
            detection_radius: ASSIST_RADIUS,
            attack_distance: FARMER_ATTACK_DISTANCE,
            weapon_name: "Prime Huntaxe".to_string(),
            auto_aim: true,
            rotation_speed: MELEE_ROTATION_SPEED,
            click_count: 3,
            click_gap_ticks: 1,
            cooldown_ms: BURST_COOLDOWN_MS,
            status_check_delay_ms: FARMER_STATUS_CHECK_MS,
            low_status_threshold: FARMER_LOW_STATUS,
            finisher_enabled: false,
            finisher_name: "Black Hole".to_string(),
            finisher_wait_ticks: FARMER_FINISHER_WAIT_TICKS,
            escape_distance: 64.0,
            exclusion_ticks: 200,
            engage_delay: TimerSpec::new(1.0, 1.0, 0, 2),
            settle: TimerSpec::new(1.0, 1.0, 0, 2),
            search: SearchConfig::wide(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlareConfig {
    /// Label substring of the flare to stand next to.
    pub label: String,
    pub detection_radius: f64,
    pub orb_name: String,
    pub weapon_name: String,
    /// Time between orb placements, measured from the start of the last one.
    pub orb_interval_ms: u64,
    pub clicks_per_volley: u32,
    /// Pause around slot switches, the orb click, and between volleys.
    pub wait: TimerSpec,
    pub click_delay: TimerSpec,
}

impl Default for FlareConfig {
    fn default() -> Self {
        Self {
            label: "Flare".to_string(),
            detection_radius: FLARE_RADIUS,
            orb_name: "Overflux Power Orb".to_string(),
            weapon_name: "Hyperion".to_string(),
            orb_interval_ms: FLARE_ORB_INTERVAL_MS,
            clicks_per_volley: FLARE_CLICK_COUNT,
            wait: TimerSpec::new(15.0, 5.0, 10, 20),
            click_delay: TimerSpec::new(4.0, 2.0, 2, 6),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub enabled: bool,
    pub run_minutes: u64,
    pub break_min_minutes: u64,
    pub break_max_minutes: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            run_minutes: 60,
            break_min_minutes: 5,
            break_max_minutes: 15,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub input: InputConfig,
    pub fishing: FishingConfig,
    pub combat: CombatConfig,
    pub lasso: LassoConfig,
    pub distance_assist: DistanceAssistConfig,
    pub burst_farmer: BurstFarmerConfig,
    pub flare: FlareConfig,
    pub planner: PlannerConfig,
}

impl EngineConfig {
    /// Forces values into the ranges the engine trusts.
    pub fn clamp(&mut self) {
        let threshold = self
            .combat
            .cluster_threshold
            .clamp(CLUSTER_THRESHOLD_MIN, CLUSTER_THRESHOLD_MAX);
        if threshold != self.combat.cluster_threshold {
            warn!(
                requested = self.combat.cluster_threshold,
                applied = threshold,
                "cluster threshold clamped"
            );
            self.combat.cluster_threshold = threshold;
        }

        for (field, speed) in [
            ("combat.melee.rotation_speed", &mut self.combat.melee.rotation_speed),
            ("lasso.rotation_speed", &mut self.lasso.rotation_speed),
            ("distance_assist.rotation_speed", &mut self.distance_assist.rotation_speed),
            ("burst_farmer.rotation_speed", &mut self.burst_farmer.rotation_speed),
        ] {
            let clamped = if (*speed).is_finite() {
                (*speed).clamp(ROTATION_SPEED_MIN, ROTATION_SPEED_MAX)
            } else {
                ROTATION_SPEED_MIN
            };
            if clamped != *speed {
                warn!(field, requested = *speed, applied = clamped, "rotation speed clamped");
                *speed = clamped;
            }
        }

        if self.input.hold_min_ms > self.input.hold_max_ms {
            warn!("input hold bounds inverted, swapping");
            std::mem::swap(&mut self.input.hold_min_ms, &mut self.input.hold_max_ms);
        }
        if self.planner.break_min_minutes > self.planner.break_max_minutes {
            warn!("planner break bounds inverted, swapping");
            std::mem::swap(
                &mut self.planner.break_min_minutes,
                &mut self.planner.break_max_minutes,
            );
        }
    }

    pub fn clamped(mut self) -> Self {
        self.clamp();
        self
    }

    /// Checks values that would otherwise only fail when a feature is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        LabelFilter::pattern(&self.distance_assist.pattern)?;
        LabelFilter::pattern(&self.burst_farmer.pattern)?;
        if self.planner.run_minutes == 0 {
            return Err(ConfigError::OutOfRange {
                field: "planner.run_minutes",
                value: "0".to_string(),
            });
        }
        for (field, value) in [
            ("combat.detection_radius", self.combat.detection_radius),
            ("lasso.detection_radius", self.lasso.detection_radius),
            ("distance_assist.detection_radius", self.distance_assist.detection_radius),
            ("burst_farmer.detection_radius", self.burst_farmer.detection_radius),
            ("flare.detection_radius", self.flare.detection_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}
