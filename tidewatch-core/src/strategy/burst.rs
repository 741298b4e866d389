use crate::config::BurstFarmerConfig;
use crate::constants::HOTBAR_SLOTS;
use crate::input::{BurstStep, ClickBurst, MouseButton};
use crate::tools::ToolPolicy;
use crate::world::{Observer, WorldObject};

use super::{ActionContext, ActionStrategy, Advisory, Cooldown, SlotMemory, StrategyKind};

/// Several left clicks in quick succession, one click per tick step. The
/// cooldown runs from the moment the last click of a burst goes out.
#[derive(Clone, Debug)]
pub struct BurstStrategy {
    tools: ToolPolicy,
    clicks: u32,
    gap_ticks: u32,
    cooldown: Cooldown,
    burst: Option<ClickBurst>,
    last_step_ms: Option<u64>,
    completed_at: Option<u64>,
    slots: SlotMemory,
    advisory: Advisory,
}

impl BurstStrategy {
    pub fn new(config: &BurstFarmerConfig) -> Self {
        Self {
            tools: ToolPolicy::named([config.weapon_name.to_lowercase()]),
            clicks: config.click_count.max(1),
            gap_ticks: config.click_gap_ticks.max(1),
            cooldown: Cooldown::new(config.cooldown_ms),
            burst: None,
            last_step_ms: None,
            completed_at: None,
            slots: SlotMemory::default(),
            advisory: Advisory::default(),
        }
    }

    /// Completion time of the most recent burst, consumed on read.
    pub fn take_completion(&mut self) -> Option<u64> {
        self.completed_at.take()
    }

    fn equip(&mut self, ctx: &mut ActionContext<'_>) -> bool {
        if ctx.held_tool().is_some_and(|tool| self.tools.accepts(tool)) {
            return true;
        }
        let Some(slot) = self.tools.find_slot(&ctx.observer().hotbar) else {
            self.advisory.raise("burst", "configured weapon not in hotbar");
            return false;
        };
        if slot >= HOTBAR_SLOTS || !ctx.select_slot(slot) {
            return false;
        }
        self.advisory.clear();
        true
    }

    fn advance(&mut self, ctx: &mut ActionContext<'_>) {
        let now = ctx.now_ms();
        if self.last_step_ms == Some(now) {
            return;
        }
        let Some(burst) = self.burst.as_mut() else {
            return;
        };
        self.last_step_ms = Some(now);
        if ctx.step_burst(burst) == BurstStep::Done || burst.is_done() {
            self.burst = None;
            self.cooldown.mark(now);
            self.completed_at = Some(now);
        }
    }
}

impl ActionStrategy for BurstStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Burst
    }

    fn cooldown_ms(&self) -> u64 {
        self.cooldown.period_ms()
    }

    fn can_act(&self, now_ms: u64) -> bool {
        self.burst.is_none() && self.cooldown.ready(now_ms)
    }

    fn perform(&mut self, ctx: &mut ActionContext<'_>, target: Option<&WorldObject>) -> bool {
        if target.is_none() || !self.can_act(ctx.now_ms()) || !self.equip(ctx) {
            return false;
        }
        self.burst = Some(ClickBurst::new(MouseButton::Left, self.clicks, self.gap_ticks));
        self.advance(ctx);
        true
    }

    fn enter(&mut self, ctx: &mut ActionContext<'_>, _target: Option<&WorldObject>) {
        self.slots.capture(ctx);
        self.equip(ctx);
    }

    fn exit(&mut self, ctx: &mut ActionContext<'_>) {
        self.burst = None;
        self.slots.restore(ctx);
    }

    fn has_required_tool(&self, observer: &Observer) -> bool {
        self.tools.find_slot(&observer.hotbar).is_some()
    }

    fn tick(&mut self, ctx: &mut ActionContext<'_>, _target: Option<&WorldObject>) {
        self.advance(ctx);
    }

    fn is_busy(&self) -> bool {
        self.burst.is_some()
    }

    fn abort(&mut self) {
        self.burst = None;
        self.completed_at = None;
        self.slots.clear();
    }
}
