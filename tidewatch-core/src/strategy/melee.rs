use crate::config::MeleeConfig;
use crate::input::MouseButton;
use crate::rotation::RotationController;
use crate::tools::ToolPolicy;
use crate::world::{Observer, WorldObject};

use super::{ActionContext, ActionStrategy, Advisory, Cooldown, SlotMemory, StrategyKind};

/// Left-click weapon user that keeps the target's mid-height in its sights.
#[derive(Clone, Debug)]
pub struct MeleeStrategy {
    tools: ToolPolicy,
    cooldown: Cooldown,
    rotation: RotationController,
    slots: SlotMemory,
    advisory: Advisory,
}

impl MeleeStrategy {
    pub fn new(config: &MeleeConfig) -> Self {
        Self {
            tools: config.tools.clone(),
            cooldown: Cooldown::new(config.cooldown_ms),
            rotation: RotationController::new(config.rotation_speed),
            slots: SlotMemory::default(),
            advisory: Advisory::default(),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.rotation.is_tracking()
    }

    fn equip(&mut self, ctx: &mut ActionContext<'_>) -> bool {
        if ctx.held_tool().is_some_and(|tool| self.tools.accepts(tool)) {
            return true;
        }
        let Some(slot) = self.tools.find_slot(&ctx.observer().hotbar) else {
            self.advisory.raise("melee", "no melee weapon in hotbar");
            return false;
        };
        if !ctx.select_slot(slot) {
            return false;
        }
        self.advisory.clear();
        true
    }

    fn aim(&mut self, ctx: &mut ActionContext<'_>) {
        if let Some(next) = self.rotation.step(ctx.observer().eye()) {
            ctx.apply_rotation(next);
        }
    }
}

impl ActionStrategy for MeleeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Melee
    }

    fn cooldown_ms(&self) -> u64 {
        self.cooldown.period_ms()
    }

    fn can_act(&self, now_ms: u64) -> bool {
        self.cooldown.ready(now_ms)
    }

    fn perform(&mut self, ctx: &mut ActionContext<'_>, target: Option<&WorldObject>) -> bool {
        let Some(target) = target else {
            return false;
        };
        if !self.can_act(ctx.now_ms()) || !self.equip(ctx) {
            return false;
        }
        if self.rotation.is_tracking() {
            self.rotation.retarget(target.center());
        } else {
            self.rotation.track(target.center(), ctx.rotation());
        }
        let fired = ctx.fire(MouseButton::Left).pressed();
        if fired {
            self.cooldown.mark(ctx.now_ms());
        }
        fired
    }

    fn enter(&mut self, ctx: &mut ActionContext<'_>, target: Option<&WorldObject>) {
        self.slots.capture(ctx);
        self.equip(ctx);
        if let Some(target) = target {
            self.rotation.track(target.center(), ctx.rotation());
            self.aim(ctx);
        }
    }

    fn exit(&mut self, ctx: &mut ActionContext<'_>) {
        self.rotation.stop_tracking();
        self.slots.restore(ctx);
    }

    fn has_required_tool(&self, observer: &Observer) -> bool {
        self.tools.find_slot(&observer.hotbar).is_some()
    }

    fn tick(&mut self, ctx: &mut ActionContext<'_>, target: Option<&WorldObject>) {
        if !self.rotation.is_tracking() {
            return;
        }
        if let Some(target) = target {
            self.rotation.retarget(target.center());
        }
        self.aim(ctx);
    }

    fn abort(&mut self) {
        self.rotation.stop_tracking();
        self.slots.clear();
    }
}
