use tracing::info;

use crate::config::{CombatConfig, EngineConfig};
use crate::host::HostControls;
use crate::input::InputDispatcher;
use crate::label::LabelFilter;
use crate::proxy::ProxyResolver;
use crate::selector::{Exclusions, TargetCheck, TargetSelector, TrackedTarget};
use crate::session::CombatSession;
use crate::strategy::{build_strategy, ActionContext, Advisory, StrategyKind};
use crate::timer::HumanTimer;

use super::{transition, Feature, FeatureId, Phase, TickContext};

const ID: FeatureId = FeatureId::SeaCreatureCombat;

/// Fights sea creatures once enough of them have gathered, then hands the
/// hotbar back to the fishing rod.
pub struct SeaCreatureCombat {
    config: CombatConfig,
    enabled: bool,
    phase: Phase,
    selector: TargetSelector,
    exclusions: Exclusions,
    target: Option<TrackedTarget>,
    session: CombatSession,
    dispatcher: InputDispatcher,
    pending_strategy: Option<StrategyKind>,
    acting_since_ms: Option<u64>,
    recover_until_ms: u64,
    timer: HumanTimer,
    advisory: Advisory,
    kills: u64,
    attacks: u64,
    abandoned: u64,
}

impl SeaCreatureCombat {
    pub fn new(config: &EngineConfig) -> Self {
        let combat = config.combat.clone();
        let resolver = ProxyResolver::new(LabelFilter::substrings(&combat.creature_names))
            .with_radius(combat.marker_radius)
            .with_search(combat.search.to_search());
        let selector = TargetSelector::new(
            resolver,
            combat.detection_radius,
            combat.cluster_threshold,
        )
        .with_direct_types(combat.creature_types.clone());
        let session = CombatSession::new(vec![
            build_strategy(StrategyKind::Mage, config),
            build_strategy(StrategyKind::Melee, config),
        ])
        .with_active(combat.strategy);
        Self {
            config: combat,
            enabled: false,
            phase: Phase::Idle,
            selector,
            exclusions: Exclusions::default(),
            target: None,
            session,
            dispatcher: InputDispatcher::new(config.input.min_interval_ms)
                .with_hold(config.input.hold_min_ms, config.input.hold_max_ms),
            pending_strategy: None,
            acting_since_ms: None,
            recover_until_ms: 0,
            timer: HumanTimer::idle(),
            advisory: Advisory::default(),
            kills: 0,
            attacks: 0,
            abandoned: 0,
        }
    }

    pub fn kills(&self) -> u64 {
        self.kills
    }

    pub fn attacks(&self) -> u64 {
        self.attacks
    }

    pub fn active_strategy(&self) -> Option<StrategyKind> {
        self.session.active_kind()
    }

    pub fn tracked(&self) -> Option<&TrackedTarget> {
        self.target.as_ref()
    }

    pub fn is_excluded(&self, id: u64, tick: u64) -> bool {
        self.exclusions.contains(id, tick)
    }

    fn reset_state(&mut self, host: &mut dyn HostControls) {
        self.session.abort();
        self.dispatcher.reset(host);
        self.target = None;
        self.selector.reset();
        self.exclusions.clear();
        self.acting_since_ms = None;
        self.recover_until_ms = 0;
        self.timer.clear();
        self.phase = Phase::Idle;
    }

    /// Drops the target and starts the post-combat delay. The session stays
    /// entered until the delay runs out.
    fn begin_recovery(&mut self, ctx: &mut TickContext<'_>) {
        self.target = None;
        self.acting_since_ms = None;
        self.timer.clear();
        self.recover_until_ms = ctx.world.now_ms + self.config.recover_delay_ms;
        transition(ID, &mut self.phase, Phase::Recovering);
    }

    fn finish_recovery(&mut self, ctx: &mut TickContext<'_>) {
        let mut actx = ActionContext::new(
            ctx.world,
            &mut *ctx.host,
            &mut self.dispatcher,
            &mut *ctx.jitter,
        );
        self.session.disengage(&mut actx);
        ctx.lease.release(ID);
        transition(ID, &mut self.phase, Phase::Idle);
    }

    fn abandon(&mut self, ctx: &mut TickContext<'_>, target: TrackedTarget, reason: &str) {
        let until = ctx.world.tick + self.config.exclusion_ticks;
        self.exclusions.insert(target.proxy_id, until);
        self.abandoned += 1;
        info!(target = target.proxy_id, reason, "target abandoned");
        self.begin_recovery(ctx);
    }

    /// Runs the validity, escape, and timeout checks. `false` means the tick is over.
    /// A target that left the radius because it moved too far counts as escaped.
    fn guard(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let Some(mut tracked) = self.target else {
            return true;
        };
        let world = ctx.world;
        let check = self.selector.validate(world, &mut tracked);
        self.target = Some(tracked);
        if matches!(check, TargetCheck::Gone | TargetCheck::StatusLost) {
            self.kills += 1;
            info!(target = tracked.proxy_id, reason = check.as_str(), "target released");
            self.begin_recovery(ctx);
            return false;
        }
        if tracked
            .displacement(world)
            .is_some_and(|moved| moved > self.config.escape_distance)
        {
            self.abandon(ctx, tracked, "escaped");
            return false;
        }
        if !check.is_valid() {
            info!(target = tracked.proxy_id, reason = check.as_str(), "target released");
            self.begin_recovery(ctx);
            return false;
        }
        if self
            .acting_since_ms
            .is_some_and(|since| world.now_ms.saturating_sub(since) > self.config.engage_timeout_ms)
        {
            self.abandon(ctx, tracked, "engage timeout");
            return false;
        }
        true
    }

    fn seek(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let selection = self.selector.scan(world, &self.exclusions);
        let Some(candidate) = selection.target else {
            return;
        };
        let has_tool = self
            .session
            .active()
            .is_some_and(|strategy| strategy.has_required_tool(&world.observer));
        if !has_tool {
            self.advisory
                .raise(ID.as_str(), "no tool for the active strategy in hotbar");
            return;
        }
        self.advisory.clear();
        if !ctx.lease.claim(ID) {
            return;
        }
        self.target = Some(TrackedTarget::commit(candidate, world.tick));
        self.timer = HumanTimer::start(&self.config.engage_delay, &mut *ctx.jitter);
        info!(
            target = candidate.proxy_id,
            distance = candidate.distance,
            count = selection.count,
            "target committed"
        );
        transition(ID, &mut self.phase, Phase::Preparing);
    }

    fn prepare(&mut self, ctx: &mut TickContext<'_>) {
        if !self.timer.poll() {
            return;
        }
        let world = ctx.world;
        let Some(object) = self.target.and_then(|target| world.object(target.proxy_id)) else {
            return;
        };
        let mut actx =
            ActionContext::new(world, &mut *ctx.host, &mut self.dispatcher, &mut *ctx.jitter);
        self.session.engage(&mut actx, object);
        self.acting_since_ms = Some(world.now_ms);
        transition(ID, &mut self.phase, Phase::Acting);
    }

    fn act(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let object = self.target.and_then(|target| world.object(target.proxy_id));
        let mut actx =
            ActionContext::new(world, &mut *ctx.host, &mut self.dispatcher, &mut *ctx.jitter);
        self.session.tick(&mut actx, object);
        if self.session.can_act(world.now_ms) && self.session.perform(&mut actx, object) {
            self.attacks += 1;
            self.timer = HumanTimer::start(&self.config.settle, &mut *ctx.jitter);
            transition(ID, &mut self.phase, Phase::Confirming);
        }
    }

    fn confirm(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let object = self.target.and_then(|target| world.object(target.proxy_id));
        let mut actx =
            ActionContext::new(world, &mut *ctx.host, &mut self.dispatcher, &mut *ctx.jitter);
        self.session.tick(&mut actx, object);
        if self.timer.poll() {
            transition(ID, &mut self.phase, Phase::Acting);
        }
    }
}

impl Feature for SeaCreatureCombat {
    fn id(&self) -> FeatureId {
        ID
    }

    fn enable(&mut self) {
        if !self.enabled {
            self.enabled = true;
            self.phase = Phase::Idle;
            info!(feature = ID.as_str(), "enabled");
        }
    }

    fn disable(&mut self, host: &mut dyn HostControls) {
        self.enabled = false;
        self.pending_strategy = None;
        self.reset_state(host);
        info!(feature = ID.as_str(), "disabled");
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn status_text(&self) -> String {
        if !self.enabled {
            return "Disabled".to_string();
        }
        let strategy = self
            .session
            .active_kind()
            .map_or("none", StrategyKind::as_str);
        format!(
            "Active - {} [{}] kills={}",
            self.phase, strategy, self.kills
        )
    }

    fn current_target_distance(&self) -> Option<f64> {
        self.target.map(|target| target.last_distance)
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        if !self.enabled {
            return;
        }
        if self.config.require_fishing && !ctx.is_enabled(FeatureId::AutoFishing) {
            if self.phase != Phase::Idle || self.target.is_some() {
                info!("fishing stopped, standing down");
                self.reset_state(&mut *ctx.host);
                ctx.lease.release(ID);
            }
            return;
        }

        let world = ctx.world;
        self.exclusions.purge(world.tick);

        if let Some(kind) = self.pending_strategy.take() {
            let object = self.target.and_then(|target| world.object(target.proxy_id));
            let engaged_target = if self.session.is_engaged() { object } else { None };
            let mut actx =
                ActionContext::new(world, &mut *ctx.host, &mut self.dispatcher, &mut *ctx.jitter);
            self.session.switch_to(&mut actx, kind, engaged_target);
        }

        if matches!(
            self.phase,
            Phase::Preparing | Phase::Acting | Phase::Confirming
        ) && !self.guard(ctx)
        {
            return;
        }

        match self.phase {
            Phase::Idle => {
                transition(ID, &mut self.phase, Phase::Seeking);
                self.seek(ctx);
            }
            Phase::Seeking => self.seek(ctx),
            Phase::Preparing => self.prepare(ctx),
            Phase::Acting => self.act(ctx),
            Phase::Confirming => self.confirm(ctx),
            Phase::Recovering => {
                if world.now_ms >= self.recover_until_ms {
                    self.finish_recovery(ctx);
                }
            }
        }
    }

    fn pump_input(&mut self, now_ms: u64, host: &mut dyn HostControls) {
        self.dispatcher.pump(now_ms, host);
    }

    fn select_strategy(&mut self, kind: StrategyKind) -> bool {
        if !matches!(kind, StrategyKind::Mage | StrategyKind::Melee) {
            return false;
        }
        self.pending_strategy = Some(kind);
        true
    }

    fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("kills", self.kills),
            ("attacks", self.attacks),
            ("abandoned", self.abandoned),
        ]
    }
}
