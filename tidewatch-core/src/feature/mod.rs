//! Feature state machines and the per-tick context the scheduler hands them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::host::HostControls;
use crate::rng::Jitter;
use crate::strategy::StrategyKind;
use crate::world::WorldSnapshot;

pub mod burst_farmer;
pub mod distance_assist;
pub mod fishing;
pub mod flare;
pub mod lasso;
pub mod sea_combat;

pub use burst_farmer::BurstFarmer;
pub use distance_assist::DistanceAssist;
pub use fishing::AutoFishing;
pub use flare::FlareMacro;
pub use lasso::LassoCapture;
pub use sea_combat::SeaCreatureCombat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureId {
    AutoFishing,
    SeaCreatureCombat,
    DistanceAssist,
    BurstFarmer,
    LassoCapture,
    FlareMacro,
}

impl FeatureId {
    pub const ALL: [FeatureId; 6] = [
        Self::AutoFishing,
        Self::SeaCreatureCombat,
        Self::DistanceAssist,
        Self::BurstFarmer,
        Self::LassoCapture,
        Self::FlareMacro,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AutoFishing => "auto_fishing",
            Self::SeaCreatureCombat => "sea_creature_combat",
            Self::DistanceAssist => "distance_assist",
            Self::BurstFarmer => "burst_farmer",
            Self::LassoCapture => "lasso_capture",
            Self::FlareMacro => "flare_macro",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::AutoFishing => "Auto Fishing",
            Self::SeaCreatureCombat => "Sea Creature Combat",
            Self::DistanceAssist => "Distance Assist",
            Self::BurstFarmer => "Burst Farmer",
            Self::LassoCapture => "Lasso Capture",
            Self::FlareMacro => "Flare Macro",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::AutoFishing => "casts, waits for the bite marker, reels, and recasts",
            Self::SeaCreatureCombat => "fights clustered sea creatures with the selected strategy",
            Self::DistanceAssist => "tracks spike markers and keeps the observer at distance",
            Self::BurstFarmer => "bursts a named mob in melee range, with an optional finisher",
            Self::LassoCapture => "aims, throws, and reels a lasso at named mobs",
            Self::FlareMacro => "places a power orb on a timer and volleys the weapon near a flare",
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureId {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownFeature {
                name: value.to_string(),
            })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Seeking,
    Preparing,
    Acting,
    Confirming,
    Recovering,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Seeking => "Seeking",
            Self::Preparing => "Preparing",
            Self::Acting => "Acting",
            Self::Confirming => "Confirming",
            Self::Recovering => "Recovering",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exclusive claim on the observer's held tool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ToolLease {
    holder: Option<FeatureId>,
}

impl ToolLease {
    pub fn holder(&self) -> Option<FeatureId> {
        self.holder
    }

    /// Succeeds when free or already held by `id`.
    pub fn claim(&mut self, id: FeatureId) -> bool {
        match self.holder {
            None => {
                self.holder = Some(id);
                debug!(feature = id.as_str(), "tool lease claimed");
                true
            }
            Some(holder) => holder == id,
        }
    }

    pub fn release(&mut self, id: FeatureId) {
        if self.holder == Some(id) {
            self.holder = None;
            debug!(feature = id.as_str(), "tool lease released");
        }
    }
}

/// Everything a feature receives for one tick.
pub struct TickContext<'a> {
    pub world: &'a WorldSnapshot,
    pub host: &'a mut dyn HostControls,
    pub jitter: &'a mut dyn Jitter,
    pub lease: &'a mut ToolLease,
    /// Features enabled at the start of this tick.
    pub enabled: &'a [FeatureId],
}

impl TickContext<'_> {
    pub fn is_enabled(&self, id: FeatureId) -> bool {
        self.enabled.contains(&id)
    }

    pub fn now_ms(&self) -> u64 {
        self.world.now_ms
    }
}

pub trait Feature {
    fn id(&self) -> FeatureId;

    fn enable(&mut self);

    /// Resets to `Idle` at once, dropping the target, gate state, and any
    /// rotation tracking. Held buttons are released through `host`.
    fn disable(&mut self, host: &mut dyn HostControls);

    fn is_enabled(&self) -> bool;

    fn phase(&self) -> Phase;

    fn status_text(&self) -> String;

    fn current_target_distance(&self) -> Option<f64>;

    fn tick(&mut self, ctx: &mut TickContext<'_>);

    /// Emits deferred input releases that are due.
    fn pump_input(&mut self, now_ms: u64, host: &mut dyn HostControls);

    fn select_strategy(&mut self, _kind: StrategyKind) -> bool {
        false
    }

    fn counters(&self) -> Vec<(&'static str, u64)> {
        Vec::new()
    }
}

/// Records a phase change with a debug event.
pub(crate) fn transition(id: FeatureId, phase: &mut Phase, next: Phase) {
    if *phase != next {
        debug!(feature = id.as_str(), from = phase.as_str(), to = next.as_str(), "phase");
        *phase = next;
    }
}

pub(crate) fn status_line(enabled: bool, phase: Phase) -> String {
    if enabled {
        format!("Active - {phase}")
    } else {
        "Disabled".to_string()
    }
}

#[cfg(test)]
pub(crate) mod testkit;
