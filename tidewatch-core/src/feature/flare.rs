use tracing::{debug, info};

use crate::config::{EngineConfig, FlareConfig};
use crate::host::HostControls;
use crate::input::{BurstStep, ClickBurst, InputDispatcher, MouseButton};
use crate::label::LabelFilter;
use crate::strategy::{ActionContext, Advisory};
use crate::timer::HumanTimer;
use crate::tools::named_slot;
use crate::world::{ObjectId, Observer, WorldSnapshot};

use super::{transition, Feature, FeatureId, Phase, TickContext};

const ID: FeatureId = FeatureId::FlareMacro;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    OrbLead,
    OrbSwitch,
    OrbClick,
    OrbSettle,
    Volley,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Loadout {
    orb: usize,
    weapon: usize,
}

/// Stands next to a flare, drops a power orb on a fixed interval, and fires
/// weapon volleys in between. Every pause is drawn from a humanized timer.
pub struct FlareMacro {
    config: FlareConfig,
    enabled: bool,
    phase: Phase,
    filter: LabelFilter,
    dispatcher: InputDispatcher,
    flare: Option<ObjectId>,
    distance: Option<f64>,
    step: Step,
    timer: HumanTimer,
    volley: Option<ClickBurst>,
    orb_started_ms: u64,
    home_slot: Option<usize>,
    advisory: Advisory,
    orbs: u64,
    volleys: u64,
    clicks: u64,
    lost: u64,
}

impl FlareMacro {
    pub fn new(config: &EngineConfig) -> Self {
        let flare = config.flare.clone();
        Self {
            filter: LabelFilter::substrings([flare.label.as_str()]),
            config: flare,
            enabled: false,
            phase: Phase::Idle,
            dispatcher: InputDispatcher::new(config.input.min_interval_ms)
                .with_hold(config.input.hold_min_ms, config.input.hold_max_ms),
            flare: None,
            distance: None,
            step: Step::OrbLead,
            timer: HumanTimer::idle(),
            volley: None,
            orb_started_ms: 0,
            home_slot: None,
            advisory: Advisory::default(),
            orbs: 0,
            volleys: 0,
            clicks: 0,
            lost: 0,
        }
    }

    pub fn orbs(&self) -> u64 {
        self.orbs
    }

    pub fn volleys(&self) -> u64 {
        self.volleys
    }

    pub fn flare(&self) -> Option<ObjectId> {
        self.flare
    }

    fn loadout(&self, observer: &Observer) -> Option<Loadout> {
        Some(Loadout {
            orb: named_slot(&observer.hotbar, &self.config.orb_name)?,
            weapon: named_slot(&observer.hotbar, &self.config.weapon_name)?,
        })
    }

    /// Nearest live flare within the detection radius.
    fn find_flare(&self, world: &WorldSnapshot) -> Option<(ObjectId, f64)> {
        let origin = world.observer.position;
        world
            .objects
            .iter()
            .filter(|object| {
                object.alive
                    && object
                        .label
                        .as_deref()
                        .is_some_and(|label| self.filter.matches(label))
            })
            .map(|object| (object.id, object.position.distance(origin)))
            .filter(|(_, distance)| *distance <= self.config.detection_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn flare_distance(&self, world: &WorldSnapshot) -> Option<f64> {
        let object = world.object(self.flare?)?;
        let distance = object.position.distance(world.observer.position);
        (object.alive && distance <= self.config.detection_radius).then_some(distance)
    }

    fn reset_state(&mut self, host: &mut dyn HostControls) {
        self.dispatcher.reset(host);
        self.flare = None;
        self.distance = None;
        self.step = Step::OrbLead;
        self.timer.clear();
        self.volley = None;
        self.home_slot = None;
        self.phase = Phase::Idle;
    }

    fn start_orb(&mut self, ctx: &mut TickContext<'_>) {
        self.orb_started_ms = ctx.world.now_ms;
        self.volley = None;
        self.step = Step::OrbLead;
        self.timer = HumanTimer::start(&self.config.wait, &mut *ctx.jitter);
        transition(ID, &mut self.phase, Phase::Preparing);
    }

    fn begin_recovery(&mut self) {
        self.flare = None;
        self.distance = None;
        self.volley = None;
        self.timer.clear();
        transition(ID, &mut self.phase, Phase::Recovering);
    }

    fn seek(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let Some((flare, distance)) = self.find_flare(world) else {
            return;
        };
        let Some(kit) = self.loadout(&world.observer) else {
            self.advisory
                .raise(ID.as_str(), "power orb or weapon missing from hotbar");
            return;
        };
        self.advisory.clear();
        if !ctx.lease.claim(ID) {
            return;
        }
        self.flare = Some(flare);
        self.distance = Some(distance);
        self.home_slot = Some(world.observer.selected_slot);
        info!(flare, distance, orb_slot = kit.orb, weapon_slot = kit.weapon, "flare found");
        self.start_orb(ctx);
    }

    fn run(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let Some(distance) = self.flare_distance(world) else {
            self.lost += 1;
            info!(flare = ?self.flare, "flare lost");
            self.begin_recovery();
            return;
        };
        self.distance = Some(distance);
        let Some(kit) = self.loadout(&world.observer) else {
            self.advisory
                .raise(ID.as_str(), "power orb or weapon left the hotbar");
            self.begin_recovery();
            return;
        };

        if self.step == Step::Volley
            && world.now_ms.saturating_sub(self.orb_started_ms) >= self.config.orb_interval_ms
        {
            debug!(volleys = self.volleys, "orb interval elapsed");
            self.start_orb(ctx);
        }
        if !self.timer.poll() {
            return;
        }

        let clicks_per_volley = self.config.clicks_per_volley.max(1);
        let mut actx =
            ActionContext::new(world, &mut *ctx.host, &mut self.dispatcher, &mut *ctx.jitter);
        match self.step {
            Step::OrbLead => self.step = Step::OrbSwitch,
            Step::OrbSwitch => {
                if actx.select_slot(kit.orb) {
                    self.timer = HumanTimer::start(&self.config.wait, actx.jitter());
                    self.step = Step::OrbClick;
                }
            }
            Step::OrbClick => {
                if actx.fire(MouseButton::Right).pressed() {
                    self.orbs += 1;
                    info!(count = self.orbs, "power orb placed");
                    self.timer = HumanTimer::start(&self.config.wait, actx.jitter());
                    self.step = Step::OrbSettle;
                }
            }
            Step::OrbSettle => {
                self.step = Step::Volley;
                transition(ID, &mut self.phase, Phase::Acting);
            }
            Step::Volley => {
                if actx.selected_slot() != kit.weapon {
                    if actx.select_slot(kit.weapon) {
                        self.timer = HumanTimer::start(&self.config.wait, actx.jitter());
                    }
                    return;
                }
                let volley = self
                    .volley
                    .get_or_insert_with(|| ClickBurst::new(MouseButton::Right, clicks_per_volley, 1));
                match actx.step_burst(volley) {
                    BurstStep::Clicked => {
                        self.clicks += 1;
                        self.timer = HumanTimer::start(&self.config.click_delay, actx.jitter());
                    }
                    BurstStep::Waiting => {}
                    BurstStep::Done => {
                        self.volley = None;
                        self.volleys += 1;
                        self.timer = HumanTimer::start(&self.config.wait, actx.jitter());
                    }
                }
            }
        }
    }

    fn recover(&mut self, ctx: &mut TickContext<'_>) {
        if let Some(slot) = self.home_slot.take() {
            let mut actx = ActionContext::new(
                ctx.world,
                &mut *ctx.host,
                &mut self.dispatcher,
                &mut *ctx.jitter,
            );
            actx.select_slot(slot);
        }
        self.step = Step::OrbLead;
        ctx.lease.release(ID);
        transition(ID, &mut self.phase, Phase::Idle);
    }
}

impl Feature for FlareMacro {
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
        match self.phase {
            Phase::Idle | Phase::Seeking => "Active - looking for a flare".to_string(),
            phase => format!("Active - {} orbs={} volleys={}", phase, self.orbs, self.volleys),
        }
    }

    fn current_target_distance(&self) -> Option<f64> {
        self.distance
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        if !self.enabled {
            return;
        }
        match self.phase {
            Phase::Idle => {
                transition(ID, &mut self.phase, Phase::Seeking);
                self.seek(ctx);
            }
            Phase::Seeking => self.seek(ctx),
            Phase::Preparing | Phase::Acting | Phase::Confirming => self.run(ctx),
            Phase::Recovering => self.recover(ctx),
        }
    }

    fn pump_input(&mut self, now_ms: u64, host: &mut dyn HostControls) {
        self.dispatcher.pump(now_ms, host);
    }

    fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("orbs", self.orbs),
            ("volleys", self.volleys),
            ("clicks", self.clicks),
            ("lost", self.lost),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::testkit::{marker, observer, world, Rig};
    use crate::geometry::Vec3;
    use crate::rng::SequenceJitter;
    use crate::timer::TimerSpec;
    use crate::world::WorldObject;

    const ORB_SLOT: usize = 6;
    const WEAPON_SLOT: usize = 1;

    fn flare_macro(configure: impl FnOnce(&mut FlareConfig)) -> FlareMacro {
        let mut config = EngineConfig::default();
        configure(&mut config.flare);
        let mut feature = FlareMacro::new(&config);
        feature.enable();
        feature
    }

    fn quick(config: &mut FlareConfig) {
        config.wait = TimerSpec::fixed(1);
        config.click_delay = TimerSpec::fixed(1);
    }

    fn flare_at(x: f64) -> Vec<WorldObject> {
        vec![marker(900, Vec3::new(x, 0.0, 0.0), "✦ Flare")]
    }

    /// Ticks the range with the observer holding whatever was last selected.
    fn run_ticks(
        rig: &mut Rig,
        feature: &mut FlareMacro,
        ticks: std::ops::RangeInclusive<u64>,
        objects: &[WorldObject],
    ) {
        for tick in ticks {
            let held = rig.host.selections().last().copied().unwrap_or(0);
            rig.tick(feature, &world(tick, objects.to_vec(), observer(held)));
        }
    }

    fn right_presses(rig: &Rig) -> usize {
        rig.host
            .events
            .iter()
            .filter(|event| **event == crate::host::HostEvent::Press(MouseButton::Right))
            .count()
    }

    #[test]
    fn orb_then_one_volley() {
        let mut feature = flare_macro(quick);
        let mut rig = Rig::new(&[ID]);
        let flare = flare_at(3.0);

        run_ticks(&mut rig, &mut feature, 0..=0, &flare);
        assert_eq!(feature.phase(), Phase::Preparing);
        assert_eq!(feature.flare(), Some(900));
        assert_eq!(rig.lease.holder(), Some(ID));

        run_ticks(&mut rig, &mut feature, 1..=6, &flare);
        assert_eq!(rig.host.selections(), vec![ORB_SLOT]);
        assert_eq!(feature.orbs(), 1);

        run_ticks(&mut rig, &mut feature, 7..=16, &flare);
        assert_eq!(feature.phase(), Phase::Acting);
        assert_eq!(rig.host.selections(), vec![ORB_SLOT, WEAPON_SLOT]);
        assert_eq!(right_presses(&rig), 4);
        assert_eq!(feature.volleys(), 1);
        assert_eq!(feature.current_target_distance(), Some(3.0));
    }

    #[test]
    fn needs_both_tools() {
        let mut feature = flare_macro(quick);
        let mut rig = Rig::new(&[ID]);
        let mut bare = observer(0);
        bare.hotbar[ORB_SLOT] = None;
        for tick in 0..5 {
            rig.tick(&mut feature, &world(tick, flare_at(2.0), bare.clone()));
        }
        assert_eq!(feature.phase(), Phase::Seeking);
        assert_eq!(rig.lease.holder(), None);
        assert!(rig.host.events.is_empty());
    }

    #[test]
    fn distant_flare_is_ignored() {
        let mut feature = flare_macro(quick);
        let mut rig = Rig::new(&[ID]);
        run_ticks(&mut rig, &mut feature, 0..=3, &flare_at(6.5));
        assert_eq!(feature.phase(), Phase::Seeking);
        assert_eq!(feature.status_text(), "Active - looking for a flare");
    }

    #[test]
    fn drifting_flare_stops_and_restores_slot() {
        let mut feature = flare_macro(quick);
        let mut rig = Rig::new(&[ID]);
        run_ticks(&mut rig, &mut feature, 0..=10, &flare_at(3.0));
        assert_eq!(feature.phase(), Phase::Acting);

        run_ticks(&mut rig, &mut feature, 11..=11, &flare_at(7.0));
        assert_eq!(feature.phase(), Phase::Recovering);
        assert_eq!(feature.counters()[3], ("lost", 1));
        assert!(feature.current_target_distance().is_none());

        run_ticks(&mut rig, &mut feature, 12..=12, &[]);
        assert_eq!(feature.phase(), Phase::Idle);
        assert_eq!(rig.lease.holder(), None);
        assert_eq!(rig.host.selections().last(), Some(&0));
    }

    #[test]
    fn orb_is_placed_again_after_interval() {
        let mut feature = flare_macro(|config| {
            quick(config);
            config.orb_interval_ms = 1_000;
        });
        let mut rig = Rig::new(&[ID]);
        let flare = flare_at(2.0);
        run_ticks(&mut rig, &mut feature, 0..=19, &flare);
        assert_eq!(feature.orbs(), 1);

        run_ticks(&mut rig, &mut feature, 20..=30, &flare);
        assert_eq!(feature.orbs(), 2);
        let orb_switches = rig
            .host
            .selections()
            .iter()
            .filter(|slot| **slot == ORB_SLOT)
            .count();
        assert_eq!(orb_switches, 2);
    }

    #[test]
    fn waits_follow_jitter() {
        let first_orb = |jitter: SequenceJitter| {
            let mut feature = flare_macro(|_| {});
            let mut rig = Rig::new(&[ID]);
            rig.jitter = jitter;
            let flare = flare_at(2.0);
            (0..60).find(|tick| {
                run_ticks(&mut rig, &mut feature, *tick..=*tick, &flare);
                feature.orbs() > 0
            })
        };
        assert_eq!(first_orb(SequenceJitter::low()), Some(23));
        assert_eq!(first_orb(SequenceJitter::high()), Some(43));
    }

    #[test]
    fn disable_clears_flare() {
        let mut feature = flare_macro(quick);
        let mut rig = Rig::new(&[ID]);
        run_ticks(&mut rig, &mut feature, 0..=4, &flare_at(3.0));
        feature.disable(&mut rig.host);
        assert_eq!(feature.phase(), Phase::Idle);
        assert!(feature.flare().is_none());
        assert_eq!(feature.status_text(), "Disabled");
    }
}
