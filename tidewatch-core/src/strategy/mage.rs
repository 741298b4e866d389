use crate::config::MageConfig;
use crate::constants::LOOK_DOWN_PITCH;
use crate::geometry::Rotation;
use crate::input::MouseButton;
use crate::tools::ToolPolicy;
use crate::world::{Observer, WorldObject};

use super::{ActionContext, ActionStrategy, Advisory, Cooldown, SlotMemory, StrategyKind};

/// Right-click area caster. Optionally looks straight down for the cast and
/// snaps back right after.
#[derive(Clone, Debug)]
pub struct MageStrategy {
    tools: ToolPolicy,
    look_down: bool,
    look_down_tools: Vec<String>,
    cooldown: Cooldown,
    slots: SlotMemory,
    advisory: Advisory,
}

impl MageStrategy {
    pub fn new(config: &MageConfig) -> Self {
        Self {
            tools: config.tools.clone(),
            look_down: config.look_down,
            look_down_tools: config
                .look_down_tools
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
            cooldown: Cooldown::new(config.cooldown_ms),
            slots: SlotMemory::default(),
            advisory: Advisory::default(),
        }
    }

    fn equip(&mut self, ctx: &mut ActionContext<'_>) -> bool {
        if ctx.held_tool().is_some_and(|tool| self.tools.rank(tool) == Some(0)) {
            return true;
        }
        let Some(slot) = self.tools.find_slot(&ctx.observer().hotbar) else {
            self.advisory.raise("mage", "no mage tool in hotbar");
            return false;
        };
        if !ctx.select_slot(slot) {
            return false;
        }
        self.advisory.clear();
        true
    }

    fn wants_look_down(&self, ctx: &ActionContext<'_>) -> bool {
        self.look_down
            && ctx.held_tool().is_some_and(|tool| {
                let name = tool.normalized_name();
                self.look_down_tools
                    .iter()
                    .any(|needle| name.contains(needle.as_str()))
            })
    }
}

impl ActionStrategy for MageStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Mage
    }

    fn cooldown_ms(&self) -> u64 {
        self.cooldown.period_ms()
    }

    fn can_act(&self, now_ms: u64) -> bool {
        self.cooldown.ready(now_ms)
    }

    fn perform(&mut self, ctx: &mut ActionContext<'_>, target: Option<&WorldObject>) -> bool {
        if target.is_none() || !self.can_act(ctx.now_ms()) {
            return false;
        }
        if !self.equip(ctx) {
            return false;
        }

        let saved = ctx.rotation();
        let look_down = self.wants_look_down(ctx);
        if look_down {
            ctx.apply_rotation(Rotation::new(saved.yaw, LOOK_DOWN_PITCH));
        }
        let fired = ctx.fire(MouseButton::Right).pressed();
        if look_down {
            ctx.apply_rotation(saved);
        }
        if fired {
            self.cooldown.mark(ctx.now_ms());
        }
        fired
    }

    fn enter(&mut self, ctx: &mut ActionContext<'_>, _target: Option<&WorldObject>) {
        self.slots.capture(ctx);
        self.equip(ctx);
    }

    fn exit(&mut self, ctx: &mut ActionContext<'_>) {
        self.slots.restore(ctx);
    }

    fn has_required_tool(&self, observer: &Observer) -> bool {
        self.tools.find_slot(&observer.hotbar).is_some()
    }

    fn abort(&mut self) {
        self.slots.clear();
    }
}
