use tracing::{debug, info};

use crate::config::{DistanceAssistConfig, EngineConfig};
use crate::error::ConfigError;
use crate::host::HostControls;
use crate::label::LabelFilter;
use crate::proxy::ProxyResolver;
use crate::rotation::RotationController;
use crate::selector::{Exclusions, TargetCheck, TargetSelector, TrackedTarget};

use super::{transition, Feature, FeatureId, Phase, TickContext};

const ID: FeatureId = FeatureId::DistanceAssist;

/// Keeps an eye on the nearest spike and reports whether the observer stands
/// far enough away. Optionally aims at it once at distance.
pub struct DistanceAssist {
    config: DistanceAssistConfig,
    enabled: bool,
    phase: Phase,
    selector: TargetSelector,
    exclusions: Exclusions,
    target: Option<TrackedTarget>,
    rotation: RotationController,
    last_scan_ms: Option<u64>,
    too_close: bool,
    scans: u64,
    lost: u64,
}

impl DistanceAssist {
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        let assist = config.distance_assist.clone();
        let resolver = ProxyResolver::new(LabelFilter::pattern(&assist.pattern)?)
            .with_radius(assist.detection_radius)
            .with_search(assist.search.to_search());
        Ok(Self {
            selector: TargetSelector::new(resolver, assist.detection_radius, 1),
            rotation: RotationController::new(assist.rotation_speed),
            config: assist,
            enabled: false,
            phase: Phase::Idle,
            exclusions: Exclusions::default(),
            target: None,
            last_scan_ms: None,
            too_close: false,
            scans: 0,
            lost: 0,
        })
    }

    pub fn is_tracking(&self) -> bool {
        self.target.is_some()
    }

    pub fn is_too_close(&self) -> bool {
        self.target.is_some() && self.too_close
    }

    pub fn is_at_distance(&self) -> bool {
        self.target.is_some() && !self.too_close
    }

    pub fn is_excluded(&self, id: u64, tick: u64) -> bool {
        self.exclusions.contains(id, tick)
    }

    fn reset_state(&mut self) {
        self.target = None;
        self.selector.reset();
        self.exclusions.clear();
        self.rotation.stop_tracking();
        self.last_scan_ms = None;
        self.too_close = false;
        self.phase = Phase::Idle;
    }

    fn release_target(&mut self, reason: &str) {
        if let Some(target) = self.target.take() {
            info!(target = target.proxy_id, reason, "spike released");
        }
        self.lost += 1;
        self.too_close = false;
        self.rotation.stop_tracking();
        transition(ID, &mut self.phase, Phase::Recovering);
    }

    fn scan(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let due = self
            .last_scan_ms
            .map_or(true, |last| world.now_ms.saturating_sub(last) >= self.config.scan_interval_ms);
        if !due {
            return;
        }
        self.last_scan_ms = Some(world.now_ms);
        self.scans += 1;
        let Some(candidate) = self.selector.scan(world, &self.exclusions).target else {
            return;
        };
        self.target = Some(TrackedTarget::commit(candidate, world.tick));
        self.rotation
            .track(candidate.position, world.observer.rotation);
        info!(target = candidate.proxy_id, distance = candidate.distance, "spike tracked");
        transition(ID, &mut self.phase, Phase::Acting);
        self.follow(ctx);
    }

    fn follow(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let Some(mut tracked) = self.target else {
            return;
        };
        let check = self.selector.validate(world, &mut tracked);
        self.target = Some(tracked);
        if matches!(check, TargetCheck::Gone | TargetCheck::StatusLost) {
            self.release_target(check.as_str());
            return;
        }
        if tracked
            .displacement(world)
            .is_some_and(|moved| moved > self.config.escape_distance)
        {
            self.exclusions
                .insert(tracked.proxy_id, world.tick + self.config.exclusion_ticks);
            self.release_target("escaped");
            return;
        }
        if !check.is_valid() {
            self.release_target(check.as_str());
            return;
        }
        let Some(proxy) = world.object(tracked.proxy_id) else {
            return;
        };

        let too_close = tracked.last_distance < self.config.min_distance;
        if too_close != self.too_close {
            debug!(distance = tracked.last_distance, too_close, "spike distance changed");
        }
        self.too_close = too_close;

        self.rotation.retarget(proxy.center());
        if !self.config.aim_assist || too_close {
            return;
        }
        if let Some(rotation) = self.rotation.step(world.observer.eye()) {
            if let Err(err) = ctx.host.set_rotation(rotation) {
                debug!(%err, "rotation rejected");
            }
        }
    }
}

impl Feature for DistanceAssist {
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

    fn disable(&mut self, _host: &mut dyn HostControls) {
        self.enabled = false;
        self.reset_state();
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
        match self.target {
            Some(target) if self.too_close => {
                format!("Active - too close ({:.1})", target.last_distance)
            }
            Some(target) => format!("Active - at distance ({:.1})", target.last_distance),
            None => format!("Active - {}", self.phase),
        }
    }

    fn current_target_distance(&self) -> Option<f64> {
        self.target.map(|target| target.last_distance)
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        if !self.enabled {
            return;
        }
        self.exclusions.purge(ctx.world.tick);
        match self.phase {
            Phase::Idle | Phase::Seeking | Phase::Preparing => {
                if self.phase != Phase::Seeking {
                    transition(ID, &mut self.phase, Phase::Seeking);
                }
                self.scan(ctx);
            }
            Phase::Acting | Phase::Confirming => self.follow(ctx),
            Phase::Recovering => transition(ID, &mut self.phase, Phase::Idle),
        }
    }

    fn pump_input(&mut self, _now_ms: u64, _host: &mut dyn HostControls) {}

    fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![("scans", self.scans), ("lost", self.lost)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::testkit::{creature, observer, world, Rig};
    use crate::geometry::Vec3;
    use crate::world::WorldObject;

    fn assist(aim: bool) -> DistanceAssist {
        let mut config = EngineConfig::default();
        config.distance_assist.aim_assist = aim;
        let mut feature = DistanceAssist::new(&config).expect("valid pattern");
        feature.enable();
        feature
    }

    fn spike(z: f64) -> Vec<WorldObject> {
        let mut objects = Vec::new();
        creature(&mut objects, 300, Vec3::new(0.0, 0.0, z), "Spike 1,200/1,500");
        objects
    }

    #[test]
    fn rescans_only_on_interval() {
        let mut feature = assist(false);
        let mut rig = Rig::new(&[ID]);
        rig.tick(&mut feature, &world(0, Vec::new(), observer(0)));
        assert_eq!(feature.phase(), Phase::Seeking);

        rig.tick(&mut feature, &world(1, spike(20.0), observer(0)));
        assert!(!feature.is_tracking());

        rig.tick(&mut feature, &world(20, spike(20.0), observer(0)));
        assert!(feature.is_tracking());
        assert_eq!(feature.phase(), Phase::Acting);
        assert!(feature.is_at_distance());
        assert_eq!(feature.current_target_distance(), Some(20.0));
    }

    #[test]
    fn too_close_suppresses_aim() {
        let mut feature = assist(true);
        let mut rig = Rig::new(&[ID]);
        rig.tick(&mut feature, &world(0, spike(5.0), observer(0)));
        rig.tick(&mut feature, &world(1, spike(5.0), observer(0)));
        assert!(feature.is_too_close());
        assert!(rig.host.rotations().is_empty());
        assert_eq!(feature.status_text(), "Active - too close (5.0)");
    }

    #[test]
    fn aims_once_at_distance() {
        let mut feature = assist(true);
        let mut rig = Rig::new(&[ID]);
        rig.tick(&mut feature, &world(0, spike(12.0), observer(0)));
        rig.tick(&mut feature, &world(1, spike(12.0), observer(0)));
        assert!(feature.is_at_distance());
        assert!(!rig.host.rotations().is_empty());
    }

    #[test]
    fn lost_spike_returns_to_seeking() {
        let mut feature = assist(false);
        let mut rig = Rig::new(&[ID]);
        rig.tick(&mut feature, &world(0, spike(12.0), observer(0)));
        assert!(feature.is_tracking());

        rig.tick(&mut feature, &world(1, Vec::new(), observer(0)));
        assert_eq!(feature.phase(), Phase::Recovering);
        assert!(!feature.is_too_close() && !feature.is_at_distance());
        rig.tick(&mut feature, &world(2, Vec::new(), observer(0)));
        assert_eq!(feature.phase(), Phase::Idle);
    }

    #[test]
    fn spike_drifting_out_of_radius_is_excluded() {
        let mut feature = assist(false);
        let mut rig = Rig::new(&[ID]);
        rig.tick(&mut feature, &world(0, spike(5.0), observer(0)));
        assert!(feature.is_tracking());

        rig.tick(&mut feature, &world(1, spike(70.0), observer(0)));
        assert_eq!(feature.phase(), Phase::Recovering);
        assert!(feature.is_excluded(301, 200));
        assert!(!feature.is_excluded(301, 201));

        for tick in 2..30 {
            rig.tick(&mut feature, &world(tick, spike(40.0), observer(0)));
        }
        assert!(!feature.is_tracking());
    }

    #[test]
    fn bad_pattern_is_a_config_error() {
        let mut config = EngineConfig::default();
        config.distance_assist.pattern = "spike(".to_string();
        assert!(matches!(
            DistanceAssist::new(&config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
