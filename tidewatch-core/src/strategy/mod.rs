//! Pluggable action strategies used by combat-style features.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::geometry::Rotation;
use crate::host::HostControls;
use crate::input::{BurstStep, ClickBurst, FireOutcome, InputDispatcher, MouseButton};
use crate::rng::Jitter;
use crate::tools::fishing_rod_slot;
use crate::world::{Observer, Tool, WorldObject, WorldSnapshot};

pub mod burst;
pub mod mage;
pub mod melee;

pub use burst::BurstStrategy;
pub use mage::MageStrategy;
pub use melee::MeleeStrategy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[serde(alias = "rcm")]
    Mage,
    Melee,
    Burst,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [Self::Mage, Self::Melee, Self::Burst];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mage => "mage",
            Self::Melee => "melee",
            Self::Burst => "burst",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mage" | "rcm" => Ok(Self::Mage),
            "melee" => Ok(Self::Melee),
            "burst" => Ok(Self::Burst),
            other => Err(ConfigError::UnknownStrategy {
                name: other.to_string(),
            }),
        }
    }
}

/// Everything a strategy may touch during one tick.
pub struct ActionContext<'a> {
    pub world: &'a WorldSnapshot,
    host: &'a mut dyn HostControls,
    dispatcher: &'a mut InputDispatcher,
    jitter: &'a mut dyn Jitter,
    selected_slot: usize,
    rotation: Rotation,
}

impl<'a> ActionContext<'a> {
    pub fn new(
        world: &'a WorldSnapshot,
        host: &'a mut dyn HostControls,
        dispatcher: &'a mut InputDispatcher,
        jitter: &'a mut dyn Jitter,
    ) -> Self {
        Self {
            world,
            host,
            dispatcher,
            jitter,
            selected_slot: world.observer.selected_slot,
            rotation: world.observer.rotation,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.world.now_ms
    }

    pub fn observer(&self) -> &'a Observer {
        &self.world.observer
    }

    /// Slot as of the last successful selection this tick.
    pub fn selected_slot(&self) -> usize {
        self.selected_slot
    }

    pub fn held_tool(&self) -> Option<&'a Tool> {
        self.world.observer.tool_in(self.selected_slot)
    }

    /// Orientation as of the last successful rotation this tick.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn select_slot(&mut self, slot: usize) -> bool {
        if slot == self.selected_slot {
            return true;
        }
        match self.host.select_slot(slot) {
            Ok(()) => {
                self.selected_slot = slot;
                true
            }
            Err(err) => {
                debug!(slot, %err, "slot selection failed");
                false
            }
        }
    }

    pub fn apply_rotation(&mut self, rotation: Rotation) -> bool {
        let rotation = rotation.normalized();
        match self.host.set_rotation(rotation) {
            Ok(()) => {
                self.rotation = rotation;
                true
            }
            Err(err) => {
                debug!(%err, "rotation failed");
                false
            }
        }
    }

    pub fn fire(&mut self, button: MouseButton) -> FireOutcome {
        let now = self.world.now_ms;
        self.dispatcher
            .fire(button, now, &mut *self.host, &mut *self.jitter)
    }

    pub fn step_burst(&mut self, burst: &mut ClickBurst) -> BurstStep {
        let now = self.world.now_ms;
        burst.step(
            &mut *self.dispatcher,
            now,
            &mut *self.host,
            &mut *self.jitter,
        )
    }

    pub fn jitter(&mut self) -> &mut dyn Jitter {
        &mut *self.jitter
    }
}

/// Time gate measured from the last successful action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cooldown {
    period_ms: u64,
    last_ms: Option<u64>,
}

impl Cooldown {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_ms: None,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn ready(&self, now_ms: u64) -> bool {
        self.last_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.period_ms)
    }

    pub fn mark(&mut self, now_ms: u64) {
        self.last_ms = Some(now_ms);
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

/// Warns once per failure streak; re-armed by [`Advisory::clear`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Advisory {
    raised: bool,
}

impl Advisory {
    pub fn raise(&mut self, source: &str, message: &str) {
        if !self.raised {
            warn!(source, "{message}");
            self.raised = true;
        }
    }

    pub fn clear(&mut self) {
        self.raised = false;
    }
}

/// Remembers the slot held before a strategy took over the hotbar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotMemory {
    previous: Option<usize>,
}

impl SlotMemory {
    pub fn capture(&mut self, ctx: &ActionContext<'_>) {
        if self.previous.is_none() {
            self.previous = Some(ctx.selected_slot());
        }
    }

    /// Returns to the captured slot if it still holds a rod, otherwise to any rod.
    pub fn restore(&mut self, ctx: &mut ActionContext<'_>) -> bool {
        let hotbar = &ctx.observer().hotbar;
        let slot = self
            .previous
            .take()
            .filter(|slot| {
                hotbar
                    .get(*slot)
                    .and_then(Option::as_ref)
                    .is_some_and(Tool::is_fishing_rod)
            })
            .or_else(|| fishing_rod_slot(hotbar));
        match slot {
            Some(slot) => ctx.select_slot(slot),
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.previous = None;
    }
}

pub trait ActionStrategy {
    fn kind(&self) -> StrategyKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn cooldown_ms(&self) -> u64;

    fn can_act(&self, now_ms: u64) -> bool;

    /// Attempts one action. `false` means nothing was dispatched.
    fn perform(&mut self, ctx: &mut ActionContext<'_>, target: Option<&WorldObject>) -> bool;

    fn enter(&mut self, ctx: &mut ActionContext<'_>, target: Option<&WorldObject>);

    fn exit(&mut self, ctx: &mut ActionContext<'_>);

    fn has_required_tool(&self, observer: &Observer) -> bool;

    /// Per-tick continuation while engaged, e.g. aim steps or burst clicks.
    fn tick(&mut self, _ctx: &mut ActionContext<'_>, _target: Option<&WorldObject>) {}

    /// An action started by `perform` is still running.
    fn is_busy(&self) -> bool {
        false
    }

    /// Drops tracking and remembered state without touching the host.
    fn abort(&mut self) {}
}

pub fn build_strategy(
    kind: StrategyKind,
    config: &crate::config::EngineConfig,
) -> Box<dyn ActionStrategy> {
    match kind {
        StrategyKind::Mage => Box::new(MageStrategy::new(&config.combat.mage)),
        StrategyKind::Melee => Box::new(MeleeStrategy::new(&config.combat.melee)),
        StrategyKind::Burst => Box::new(BurstStrategy::new(&config.burst_farmer)),
    }
}
