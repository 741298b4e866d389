use tracing::debug;

use crate::strategy::{ActionContext, ActionStrategy, StrategyKind};
use crate::world::{ObjectId, WorldObject};

/// Owns the strategies a feature can act through and enforces the switch
/// protocol: the outgoing strategy always exits before the incoming one enters.
pub struct CombatSession {
    strategies: Vec<Box<dyn ActionStrategy>>,
    active: usize,
    target: Option<ObjectId>,
    entered_at: Option<u64>,
}

impl CombatSession {
    /// `strategies` must not be empty; the first one starts active.
    pub fn new(strategies: Vec<Box<dyn ActionStrategy>>) -> Self {
        Self {
            strategies,
            active: 0,
            target: None,
            entered_at: None,
        }
    }

    pub fn with_active(mut self, kind: StrategyKind) -> Self {
        if let Some(index) = self.index_of(kind) {
            self.active = index;
        }
        self
    }

    fn index_of(&self, kind: StrategyKind) -> Option<usize> {
        self.strategies
            .iter()
            .position(|strategy| strategy.kind() == kind)
    }

    pub fn active(&self) -> Option<&dyn ActionStrategy> {
        self.strategies.get(self.active).map(|strategy| strategy.as_ref())
    }

    pub fn active_mut(&mut self) -> Option<&mut (dyn ActionStrategy + 'static)> {
        self.strategies
            .get_mut(self.active)
            .map(|strategy| strategy.as_mut())
    }

    pub fn active_kind(&self) -> Option<StrategyKind> {
        self.active().map(|strategy| strategy.kind())
    }

    pub fn is_engaged(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<ObjectId> {
        self.target
    }

    pub fn entered_at(&self) -> Option<u64> {
        self.entered_at
    }

    pub fn engage(&mut self, ctx: &mut ActionContext<'_>, target: &WorldObject) {
        self.target = Some(target.id);
        self.entered_at = Some(ctx.now_ms());
        if let Some(strategy) = self.active_mut() {
            debug!(strategy = strategy.name(), target = target.id, "session enter");
            strategy.enter(ctx, Some(target));
        }
    }

    pub fn disengage(&mut self, ctx: &mut ActionContext<'_>) {
        if self.target.take().is_none() {
            return;
        }
        self.entered_at = None;
        if let Some(strategy) = self.active_mut() {
            debug!(strategy = strategy.name(), "session exit");
            strategy.exit(ctx);
        }
    }

    /// Drops the engagement without host calls.
    pub fn abort(&mut self) {
        self.target = None;
        self.entered_at = None;
        for strategy in &mut self.strategies {
            strategy.abort();
        }
    }

    /// Switches the active strategy. While engaged the outgoing strategy exits
    /// and the incoming one enters against `target`, even if both are the same.
    /// Otherwise only the selection changes.
    pub fn switch_to(
        &mut self,
        ctx: &mut ActionContext<'_>,
        kind: StrategyKind,
        target: Option<&WorldObject>,
    ) -> bool {
        let Some(index) = self.index_of(kind) else {
            return false;
        };
        if self.target.is_none() {
            self.active = index;
            debug!(strategy = kind.as_str(), "session strategy selected");
            return true;
        }
        if let Some(outgoing) = self.active_mut() {
            outgoing.exit(ctx);
        }
        self.active = index;
        if let Some(incoming) = self.active_mut() {
            incoming.enter(ctx, target);
        }
        debug!(strategy = kind.as_str(), "session strategy switched");
        true
    }

    pub fn perform(&mut self, ctx: &mut ActionContext<'_>, target: Option<&WorldObject>) -> bool {
        self.active_mut()
            .is_some_and(|strategy| strategy.perform(ctx, target))
    }

    pub fn tick(&mut self, ctx: &mut ActionContext<'_>, target: Option<&WorldObject>) {
        if let Some(strategy) = self.active_mut() {
            strategy.tick(ctx, target);
        }
    }

    pub fn can_act(&self, now_ms: u64) -> bool {
        self.active().is_some_and(|strategy| strategy.can_act(now_ms))
    }

    pub fn is_busy(&self) -> bool {
        self.active().is_some_and(|strategy| strategy.is_busy())
    }
}
