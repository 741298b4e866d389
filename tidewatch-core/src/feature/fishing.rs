use tracing::{debug, info};

use crate::config::{EngineConfig, FishingConfig};
use crate::host::HostControls;
use crate::input::{InputDispatcher, MouseButton};
use crate::strategy::Advisory;
use crate::timer::HumanTimer;
use crate::tools::fishing_rod_slot;
use crate::world::{Tool, WorldSnapshot};

use super::{status_line, transition, Feature, FeatureId, Phase, TickContext};

const ID: FeatureId = FeatureId::AutoFishing;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Cast,
    Reel { bite: bool },
}

/// Cast, wait for the bite marker, reel after a humanized delay, recast.
pub struct AutoFishing {
    config: FishingConfig,
    enabled: bool,
    phase: Phase,
    step: Step,
    timer: HumanTimer,
    waited_ticks: u32,
    dispatcher: InputDispatcher,
    last_bite_ms: Option<u64>,
    bobber_distance: Option<f64>,
    paused_by: Option<FeatureId>,
    advisory: Advisory,
    casts: u64,
    catches: u64,
}

impl AutoFishing {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.fishing.clone(),
            enabled: false,
            phase: Phase::Idle,
            step: Step::Cast,
            timer: HumanTimer::idle(),
            waited_ticks: 0,
            dispatcher: InputDispatcher::new(config.input.min_interval_ms)
                .with_hold(config.input.hold_min_ms, config.input.hold_max_ms),
            last_bite_ms: None,
            bobber_distance: None,
            paused_by: None,
            advisory: Advisory::default(),
            casts: 0,
            catches: 0,
        }
    }

    pub fn casts(&self) -> u64 {
        self.casts
    }

    pub fn catches(&self) -> u64 {
        self.catches
    }

    pub fn is_paused(&self) -> bool {
        self.paused_by.is_some()
    }

    fn reset_cycle(&mut self) {
        self.phase = Phase::Idle;
        self.step = Step::Cast;
        self.timer.clear();
        self.waited_ticks = 0;
    }

    fn bite_visible(&self, world: &WorldSnapshot) -> bool {
        world
            .markers_near(
                &self.config.bite_label,
                world.observer.position,
                self.config.bite_radius,
            )
            .next()
            .is_some()
    }

    fn act(&mut self, ctx: &mut TickContext<'_>) {
        let now = ctx.now_ms();
        if !self
            .dispatcher
            .fire(MouseButton::Right, now, &mut *ctx.host, &mut *ctx.jitter)
            .pressed()
        {
            return;
        }
        match self.step {
            Step::Cast => {
                self.casts += 1;
                self.timer = HumanTimer::ticks(self.config.cast_settle_ticks);
                self.waited_ticks = 0;
                transition(ID, &mut self.phase, Phase::Confirming);
            }
            Step::Reel { bite } => {
                if bite {
                    self.catches += 1;
                }
                let recast = self.config.recast.draw(&mut *ctx.jitter);
                let delay = if bite {
                    recast.max(self.config.post_reel_min_ticks)
                } else {
                    recast
                };
                self.timer = HumanTimer::ticks(delay);
                self.step = Step::Cast;
                transition(ID, &mut self.phase, Phase::Recovering);
            }
        }
    }

    fn confirm(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let Some(bobber) = world.observer.bobber else {
            debug!("line came back without a reel, recasting");
            self.timer = HumanTimer::start(&self.config.recast, &mut *ctx.jitter);
            transition(ID, &mut self.phase, Phase::Recovering);
            return;
        };
        self.waited_ticks += 1;

        let now = ctx.now_ms();
        let debounced = self
            .last_bite_ms
            .is_some_and(|last| now.saturating_sub(last) < self.config.bite_debounce_ms);
        if bobber.in_liquid && !debounced && self.bite_visible(world) {
            self.last_bite_ms = Some(now);
            self.step = Step::Reel { bite: true };
            self.timer = HumanTimer::start(&self.config.reel, &mut *ctx.jitter);
            transition(ID, &mut self.phase, Phase::Acting);
            return;
        }
        if self.waited_ticks >= self.config.max_wait_ticks {
            info!(waited = self.waited_ticks, "no bite, reeling in");
            self.step = Step::Reel { bite: false };
            transition(ID, &mut self.phase, Phase::Acting);
        }
    }
}

impl Feature for AutoFishing {
    fn id(&self) -> FeatureId {
        ID
    }

    fn enable(&mut self) {
        if !self.enabled {
            self.enabled = true;
            self.paused_by = None;
            self.reset_cycle();
            info!(feature = ID.as_str(), "enabled");
        }
    }

    fn disable(&mut self, host: &mut dyn HostControls) {
        self.enabled = false;
        self.paused_by = None;
        self.reset_cycle();
        self.dispatcher.reset(host);
        info!(feature = ID.as_str(), "disabled");
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn status_text(&self) -> String {
        match self.paused_by {
            Some(holder) if self.enabled => {
                format!("Paused ({} has the tool)", holder.display_name())
            }
            _ => status_line(self.enabled, self.phase),
        }
    }

    fn current_target_distance(&self) -> Option<f64> {
        self.bobber_distance
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        if !self.enabled {
            return;
        }
        let world = ctx.world;
        self.bobber_distance = world
            .observer
            .bobber
            .map(|bobber| world.observer.position.distance(bobber.position));

        if let Some(holder) = ctx.lease.holder().filter(|holder| *holder != ID) {
            if self.paused_by.is_none() {
                info!(holder = holder.as_str(), "fishing paused while tool is leased");
                self.reset_cycle();
            }
            self.paused_by = Some(holder);
            return;
        }
        if self.paused_by.take().is_some() {
            self.reset_cycle();
            self.timer = HumanTimer::start(&self.config.recast, &mut *ctx.jitter);
        }

        if !world.observer.held_tool().is_some_and(Tool::is_fishing_rod) {
            match fishing_rod_slot(&world.observer.hotbar) {
                Some(slot) => {
                    if let Err(err) = ctx.host.select_slot(slot) {
                        debug!(slot, %err, "rod selection failed");
                    }
                    self.reset_cycle();
                    transition(ID, &mut self.phase, Phase::Preparing);
                }
                None => {
                    self.advisory
                        .raise(ID.as_str(), "no fishing rod in hotbar, disabling");
                    self.disable(&mut *ctx.host);
                }
            }
            return;
        }
        self.advisory.clear();

        if !self.timer.poll() {
            return;
        }

        match self.phase {
            Phase::Idle | Phase::Preparing | Phase::Seeking => {
                if world.observer.bobber.is_some() {
                    self.waited_ticks = 0;
                    transition(ID, &mut self.phase, Phase::Confirming);
                    return;
                }
                self.step = Step::Cast;
                transition(ID, &mut self.phase, Phase::Acting);
                self.act(ctx);
            }
            Phase::Acting => self.act(ctx),
            Phase::Confirming => self.confirm(ctx),
            Phase::Recovering => transition(ID, &mut self.phase, Phase::Idle),
        }
    }

    fn pump_input(&mut self, now_ms: u64, host: &mut dyn HostControls) {
        self.dispatcher.pump(now_ms, host);
    }

    fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![("casts", self.casts), ("catches", self.catches)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::testkit::{marker, observer, world, Rig};
    use crate::feature::ToolLease;
    use crate::geometry::Vec3;
    use crate::host::HostEvent;
    use crate::world::Bobber;

    fn fishing() -> AutoFishing {
        let mut feature = AutoFishing::new(&EngineConfig::default());
        feature.enable();
        feature
    }

    #[test]
    fn casts_then_reels_on_bite_then_recasts() {
        let mut feature = fishing();
        let mut rig = Rig::new(&[ID]);
        let mut tick = 0;

        rig.tick(&mut feature, &world(tick, Vec::new(), observer(0)));
        assert_eq!(feature.phase(), Phase::Confirming);
        assert_eq!(feature.casts(), 1);
        assert_eq!(rig.host.presses(), 1);

        let mut fishing_observer = observer(0);
        fishing_observer.bobber = Some(Bobber {
            position: Vec3::new(0.0, -1.0, 6.0),
            in_liquid: true,
        });
        for _ in 0..10 {
            tick += 1;
            rig.tick(&mut feature, &world(tick, Vec::new(), fishing_observer.clone()));
        }
        assert_eq!(feature.phase(), Phase::Confirming);

        tick += 1;
        let bite = vec![marker(9, Vec3::new(0.0, 0.5, 6.0), "!!!")];
        rig.tick(&mut feature, &world(tick, bite.clone(), fishing_observer.clone()));
        assert_eq!(feature.phase(), Phase::Acting);

        for _ in 0..7 {
            tick += 1;
            rig.tick(&mut feature, &world(tick, bite.clone(), fishing_observer.clone()));
        }
        assert_eq!(feature.phase(), Phase::Recovering);
        assert_eq!(feature.catches(), 1);
        assert_eq!(rig.host.presses(), 2);

        for _ in 0..31 {
            tick += 1;
            rig.tick(&mut feature, &world(tick, Vec::new(), observer(0)));
        }
        assert_eq!(feature.phase(), Phase::Idle);
        tick += 1;
        rig.tick(&mut feature, &world(tick, Vec::new(), observer(0)));
        assert_eq!(feature.casts(), 2);
    }

    #[test]
    fn selects_rod_when_not_held() {
        let mut feature = fishing();
        let mut rig = Rig::new(&[ID]);
        rig.tick(&mut feature, &world(0, Vec::new(), observer(2)));
        assert_eq!(rig.host.events, vec![HostEvent::Select(0)]);
        assert_eq!(feature.phase(), Phase::Preparing);
    }

    #[test]
    fn disables_without_any_rod() {
        let mut feature = fishing();
        let mut rig = Rig::new(&[ID]);
        let mut bare = observer(0);
        bare.hotbar = vec![None];
        rig.tick(&mut feature, &world(0, Vec::new(), bare));
        assert!(!feature.is_enabled());
        assert_eq!(feature.status_text(), "Disabled");
    }

    #[test]
    fn pauses_while_tool_is_leased() {
        let mut feature = fishing();
        let mut rig = Rig::new(&[ID, FeatureId::SeaCreatureCombat]);
        rig.lease = ToolLease::default();
        assert!(rig.lease.claim(FeatureId::SeaCreatureCombat));
        rig.tick(&mut feature, &world(0, Vec::new(), observer(1)));
        assert!(feature.is_enabled());
        assert!(feature.is_paused());
        assert!(rig.host.events.is_empty());
        assert!(feature.status_text().starts_with("Paused"));

        rig.lease.release(FeatureId::SeaCreatureCombat);
        rig.tick(&mut feature, &world(1, Vec::new(), observer(0)));
        assert!(!feature.is_paused());
    }
}
