use tracing::{debug, info};

use crate::config::{BurstFarmerConfig, EngineConfig};
use crate::error::ConfigError;
use crate::host::HostControls;
use crate::input::{InputDispatcher, MouseButton};
use crate::label::{decode_status, LabelFilter};
use crate::proxy::ProxyResolver;
use crate::rotation::RotationController;
use crate::selector::{Exclusions, TargetCheck, TargetSelector, TrackedTarget};
use crate::strategy::{ActionContext, ActionStrategy, Advisory, BurstStrategy};
use crate::timer::HumanTimer;
use crate::tools::named_slot;
use crate::world::WorldSnapshot;

use super::{transition, Feature, FeatureId, Phase, TickContext};

const ID: FeatureId = FeatureId::BurstFarmer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Finisher {
    SwapTo,
    WaitSwap { remaining: u32, back_to: usize },
    Click { back_to: usize },
    WaitClick { remaining: u32, back_to: usize },
    SwapBack { back_to: usize },
    Complete,
}

/// Walks up to a large target, bursts it down, and drops a finisher when its
/// status runs low.
pub struct BurstFarmer {
    config: BurstFarmerConfig,
    enabled: bool,
    phase: Phase,
    selector: TargetSelector,
    exclusions: Exclusions,
    target: Option<TrackedTarget>,
    strategy: BurstStrategy,
    rotation: RotationController,
    dispatcher: InputDispatcher,
    engaged: bool,
    check_at_ms: Option<u64>,
    timer: HumanTimer,
    finisher: Option<Finisher>,
    advisory: Advisory,
    bursts: u64,
    finishers: u64,
    kills: u64,
}

impl BurstFarmer {
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        let farmer = config.burst_farmer.clone();
        let resolver = ProxyResolver::new(LabelFilter::pattern(&farmer.pattern)?)
            .with_radius(farmer.detection_radius)
            .with_search(farmer.search.to_search());
        Ok(Self {
            selector: TargetSelector::new(resolver, farmer.detection_radius, 1),
            strategy: BurstStrategy::new(&farmer),
            rotation: RotationController::new(farmer.rotation_speed),
            config: farmer,
            enabled: false,
            phase: Phase::Idle,
            exclusions: Exclusions::default(),
            target: None,
            dispatcher: InputDispatcher::new(config.input.min_interval_ms)
                .with_hold(config.input.hold_min_ms, config.input.hold_max_ms),
            engaged: false,
            check_at_ms: None,
            timer: HumanTimer::idle(),
            finisher: None,
            advisory: Advisory::default(),
            bursts: 0,
            finishers: 0,
            kills: 0,
        })
    }

    pub fn bursts(&self) -> u64 {
        self.bursts
    }

    pub fn finishers(&self) -> u64 {
        self.finishers
    }

    pub fn kills(&self) -> u64 {
        self.kills
    }

    pub fn is_finishing(&self) -> bool {
        self.finisher.is_some()
    }

    pub fn is_excluded(&self, id: u64, tick: u64) -> bool {
        self.exclusions.contains(id, tick)
    }

    fn reset_state(&mut self, host: &mut dyn HostControls) {
        self.strategy.abort();
        self.dispatcher.reset(host);
        self.rotation.stop_tracking();
        self.selector.reset();
        self.exclusions.clear();
        self.target = None;
        self.engaged = false;
        self.check_at_ms = None;
        self.timer.clear();
        self.finisher = None;
        self.phase = Phase::Idle;
    }

    fn begin_recovery(&mut self) {
        self.target = None;
        self.check_at_ms = None;
        self.timer.clear();
        self.finisher = None;
        self.rotation.stop_tracking();
        transition(ID, &mut self.phase, Phase::Recovering);
    }

    fn guard(&mut self, world: &WorldSnapshot) -> bool {
        let Some(mut tracked) = self.target else {
            return true;
        };
        let check = self.selector.validate(world, &mut tracked);
        self.target = Some(tracked);
        if matches!(check, TargetCheck::Gone | TargetCheck::StatusLost) {
            self.kills += 1;
            info!(target = tracked.proxy_id, reason = check.as_str(), "farm target released");
            self.begin_recovery();
            return false;
        }
        if tracked
            .displacement(world)
            .is_some_and(|moved| moved > self.config.escape_distance)
        {
            self.exclusions
                .insert(tracked.proxy_id, world.tick + self.config.exclusion_ticks);
            info!(target = tracked.proxy_id, "farm target moved away");
            self.begin_recovery();
            return false;
        }
        if !check.is_valid() {
            info!(target = tracked.proxy_id, reason = check.as_str(), "farm target released");
            self.begin_recovery();
            return false;
        }
        true
    }

    fn seek(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let Some(candidate) = self.selector.scan(world, &self.exclusions).target else {
            return;
        };
        if !self.strategy.has_required_tool(&world.observer) {
            self.advisory.raise(ID.as_str(), "farming weapon not in hotbar");
            return;
        }
        self.advisory.clear();
        if !ctx.lease.claim(ID) {
            return;
        }
        self.target = Some(TrackedTarget::commit(candidate, world.tick));
        self.timer = HumanTimer::start(&self.config.engage_delay, &mut *ctx.jitter);
        info!(target = candidate.proxy_id, distance = candidate.distance, "farm target committed");
        transition(ID, &mut self.phase, Phase::Preparing);
    }

    fn prepare(&mut self, ctx: &mut TickContext<'_>) {
        if !self.timer.poll() {
            return;
        }
        let world = ctx.world;
        let Some(proxy) = self.target.and_then(|target| world.object(target.proxy_id)) else {
            return;
        };
        let mut actx =
            ActionContext::new(world, &mut *ctx.host, &mut self.dispatcher, &mut *ctx.jitter);
        self.strategy.enter(&mut actx, Some(proxy));
        self.engaged = true;
        self.rotation.track(proxy.center(), world.observer.rotation);
        transition(ID, &mut self.phase, Phase::Acting);
    }

    fn act(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let Some(tracked) = self.target else {
            return;
        };
        let proxy = world.object(tracked.proxy_id);
        if self.config.auto_aim {
            if let Some(proxy) = proxy {
                self.rotation.retarget(proxy.center());
            }
            if let Some(rotation) = self.rotation.step(world.observer.eye()) {
                if let Err(err) = ctx.host.set_rotation(rotation) {
                    debug!(%err, "rotation rejected");
                }
            }
        }

        let mut actx =
            ActionContext::new(world, &mut *ctx.host, &mut self.dispatcher, &mut *ctx.jitter);
        self.strategy.tick(&mut actx, proxy);
        let in_range = tracked.last_distance <= self.config.attack_distance;
        if in_range && self.strategy.can_act(world.now_ms) {
            self.strategy.perform(&mut actx, proxy);
        }
        if let Some(done_at) = self.strategy.take_completion() {
            self.bursts += 1;
            self.check_at_ms = Some(done_at + self.config.status_check_delay_ms);
            self.timer = HumanTimer::start(&self.config.settle, &mut *ctx.jitter);
            transition(ID, &mut self.phase, Phase::Confirming);
        }
    }

    fn confirm(&mut self, world: &WorldSnapshot) {
        let Some(check_at) = self.check_at_ms else {
            transition(ID, &mut self.phase, Phase::Acting);
            return;
        };
        if world.now_ms < check_at || !self.timer.poll() {
            return;
        }
        self.check_at_ms = None;
        let status = self
            .target
            .and_then(|target| world.object(target.marker_id))
            .and_then(|marker| marker.label.as_deref())
            .and_then(decode_status);
        let low = status.is_some_and(|status| status.current < self.config.low_status_threshold);
        if low && self.config.finisher_enabled {
            debug!(status = ?status, "status low, starting finisher");
            self.finisher = Some(Finisher::SwapTo);
            return;
        }
        transition(ID, &mut self.phase, Phase::Acting);
    }

    /// Advances the finisher by one step.
    fn finish(&mut self, ctx: &mut TickContext<'_>, step: Finisher) {
        let world = ctx.world;
        let wait = self.config.finisher_wait_ticks.max(1);
        let mut actx =
            ActionContext::new(world, &mut *ctx.host, &mut self.dispatcher, &mut *ctx.jitter);
        let next = match step {
            Finisher::SwapTo => {
                match named_slot(&world.observer.hotbar, &self.config.finisher_name) {
                    Some(slot) => {
                        let back_to = actx.selected_slot();
                        if actx.select_slot(slot) {
                            Some(Finisher::WaitSwap {
                                remaining: wait,
                                back_to,
                            })
                        } else {
                            Some(Finisher::SwapTo)
                        }
                    }
                    None => {
                        self.advisory.raise(ID.as_str(), "finisher missing from hotbar");
                        Some(Finisher::Complete)
                    }
                }
            }
            Finisher::WaitSwap { remaining, back_to } if remaining > 1 => {
                Some(Finisher::WaitSwap {
                    remaining: remaining - 1,
                    back_to,
                })
            }
            Finisher::WaitSwap { back_to, .. } => Some(Finisher::Click { back_to }),
            Finisher::Click { back_to } => {
                if actx.fire(MouseButton::Right).pressed() {
                    Some(Finisher::WaitClick {
                        remaining: wait,
                        back_to,
                    })
                } else {
                    Some(Finisher::Click { back_to })
                }
            }
            Finisher::WaitClick { remaining, back_to } if remaining > 1 => {
                Some(Finisher::WaitClick {
                    remaining: remaining - 1,
                    back_to,
                })
            }
            Finisher::WaitClick { back_to, .. } => Some(Finisher::SwapBack { back_to }),
            Finisher::SwapBack { back_to } => {
                actx.select_slot(back_to);
                Some(Finisher::Complete)
            }
            Finisher::Complete => {
                self.finishers += 1;
                info!(count = self.finishers, "finisher complete");
                None
            }
        };
        self.finisher = next;
        if next.is_none() {
            transition(ID, &mut self.phase, Phase::Acting);
        }
    }

    fn recover(&mut self, ctx: &mut TickContext<'_>) {
        if self.engaged {
            let mut actx = ActionContext::new(
                ctx.world,
                &mut *ctx.host,
                &mut self.dispatcher,
                &mut *ctx.jitter,
            );
            self.strategy.exit(&mut actx);
            self.engaged = false;
        }
        ctx.lease.release(ID);
        transition(ID, &mut self.phase, Phase::Idle);
    }
}

impl Feature for BurstFarmer {
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
        if self.finisher.is_some() {
            return "Active - finishing".to_string();
        }
        format!("Active - {} bursts={}", self.phase, self.bursts)
    }

    fn current_target_distance(&self) -> Option<f64> {
        self.target.map(|target| target.last_distance)
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        if !self.enabled {
            return;
        }
        let world = ctx.world;
        self.exclusions.purge(world.tick);

        if let Some(step) = self.finisher {
            self.finish(ctx, step);
            return;
        }

        if matches!(
            self.phase,
            Phase::Preparing | Phase::Acting | Phase::Confirming
        ) && !self.guard(world)
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
            Phase::Confirming => self.confirm(world),
            Phase::Recovering => self.recover(ctx),
        }
    }

    fn pump_input(&mut self, now_ms: u64, host: &mut dyn HostControls) {
        self.dispatcher.pump(now_ms, host);
    }

    fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("bursts", self.bursts),
            ("finishers", self.finishers),
            ("kills", self.kills),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::testkit::{creature, observer, world, Rig};
    use crate::geometry::Vec3;
    use crate::host::HostEvent;
    use crate::world::WorldObject;

    fn farmer(finisher: bool) -> BurstFarmer {
        let mut config = EngineConfig::default();
        config.burst_farmer.finisher_enabled = finisher;
        let mut feature = BurstFarmer::new(&config).expect("valid pattern");
        feature.enable();
        feature
    }

    fn bezal(label: &str) -> Vec<WorldObject> {
        let mut objects = Vec::new();
        creature(&mut objects, 700, Vec3::new(0.0, 0.0, 2.0), label);
        objects
    }

    fn presses(rig: &Rig, button: MouseButton) -> usize {
        rig.host
            .events
            .iter()
            .filter(|event| **event == HostEvent::Press(button))
            .count()
    }

    /// Ticks 0..=5: commit, engage delay, equip, three clicks ending at 250 ms.
    fn burst_once(rig: &mut Rig, feature: &mut BurstFarmer, label: &str) {
        for tick in 0..=2 {
            rig.tick(feature, &world(tick, bezal(label), observer(0)));
        }
        for tick in 3..=5 {
            rig.tick(feature, &world(tick, bezal(label), observer(3)));
        }
    }

    #[test]
    fn bursts_then_checks_status() {
        let mut feature = farmer(false);
        let mut rig = Rig::new(&[ID]);
        burst_once(&mut rig, &mut feature, "Bezal 50k/100k");
        assert_eq!(rig.host.selections(), vec![3]);
        assert_eq!(presses(&rig, MouseButton::Left), 3);
        assert_eq!(feature.bursts(), 1);
        assert_eq!(feature.phase(), Phase::Confirming);

        for tick in 6..=9 {
            rig.tick(&mut feature, &world(tick, bezal("Bezal 50k/100k"), observer(3)));
            assert_eq!(feature.phase(), Phase::Confirming);
        }
        rig.tick(&mut feature, &world(10, bezal("Bezal 50k/100k"), observer(3)));
        assert_eq!(feature.phase(), Phase::Acting);
        assert!(!feature.is_finishing());
    }

    #[test]
    fn low_status_runs_finisher_one_step_per_tick() {
        let mut feature = farmer(true);
        let mut rig = Rig::new(&[ID]);
        let label = "Bezal 5k/100k";
        burst_once(&mut rig, &mut feature, label);
        for tick in 6..=10 {
            rig.tick(&mut feature, &world(tick, bezal(label), observer(3)));
        }
        assert!(feature.is_finishing());
        assert_eq!(feature.status_text(), "Active - finishing");

        rig.tick(&mut feature, &world(11, bezal(label), observer(3)));
        assert_eq!(rig.host.selections(), vec![3, 4]);
        for tick in 12..=19 {
            rig.tick(&mut feature, &world(tick, bezal(label), observer(4)));
        }
        assert_eq!(presses(&rig, MouseButton::Right), 1);
        assert_eq!(rig.host.selections(), vec![3, 4, 3]);
        assert!(feature.is_finishing());

        rig.tick(&mut feature, &world(20, bezal(label), observer(3)));
        assert!(!feature.is_finishing());
        assert_eq!(feature.finishers(), 1);
        assert_eq!(feature.phase(), Phase::Acting);
    }

    #[test]
    fn dead_target_counts_and_releases() {
        let mut feature = farmer(false);
        let mut rig = Rig::new(&[ID]);
        burst_once(&mut rig, &mut feature, "Bezal 50k/100k");
        assert_eq!(rig.lease.holder(), Some(ID));

        rig.tick(&mut feature, &world(6, bezal("Bezal 0/100k"), observer(3)));
        assert_eq!(feature.kills(), 1);
        assert_eq!(feature.phase(), Phase::Recovering);

        rig.tick(&mut feature, &world(7, Vec::new(), observer(3)));
        assert_eq!(feature.phase(), Phase::Idle);
        assert_eq!(rig.lease.holder(), None);
        assert_eq!(rig.host.selections(), vec![3, 0]);
    }

    #[test]
    fn out_of_reach_target_is_not_attacked() {
        let mut feature = farmer(false);
        let mut rig = Rig::new(&[ID]);
        let mut far = Vec::new();
        creature(&mut far, 700, Vec3::new(0.0, 0.0, 10.0), "Bezal 50k/100k");
        for tick in 0..4 {
            rig.tick(&mut feature, &world(tick, far.clone(), observer(3)));
        }
        assert_eq!(feature.phase(), Phase::Acting);
        assert_eq!(presses(&rig, MouseButton::Left), 0);
        assert!(!rig.host.rotations().is_empty());
    }

    #[test]
    fn fleeing_target_is_excluded_for_configured_ticks() {
        let mut config = EngineConfig::default();
        config.burst_farmer.exclusion_ticks = 10;
        let mut feature = BurstFarmer::new(&config).expect("valid pattern");
        feature.enable();
        let mut rig = Rig::new(&[ID]);
        let mut near = Vec::new();
        creature(&mut near, 700, Vec3::new(0.0, 0.0, 5.0), "Bezal 50k/100k");
        rig.tick(&mut feature, &world(0, near, observer(3)));
        assert_eq!(feature.phase(), Phase::Preparing);

        let mut fled = Vec::new();
        creature(&mut fled, 700, Vec3::new(0.0, 0.0, 70.0), "Bezal 50k/100k");
        rig.tick(&mut feature, &world(1, fled, observer(3)));
        assert_eq!(feature.phase(), Phase::Recovering);
        assert_eq!(feature.kills(), 0);
        assert!(feature.is_excluded(701, 10));
        assert!(!feature.is_excluded(701, 11));
    }

    #[test]
    fn burst_start_follows_jitter() {
        let first_click = |jitter: crate::rng::SequenceJitter| {
            let mut feature = farmer(false);
            let mut rig = Rig::new(&[ID]);
            rig.jitter = jitter;
            (0..8).find(|tick| {
                rig.tick(&mut feature, &world(*tick, bezal("Bezal 50k/100k"), observer(3)));
                presses(&rig, MouseButton::Left) > 0
            })
        };
        assert_eq!(first_click(crate::rng::SequenceJitter::low()), Some(2));
        assert_eq!(first_click(crate::rng::SequenceJitter::high()), Some(4));
    }
}
