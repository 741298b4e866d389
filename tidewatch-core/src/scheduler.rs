//! Owns every feature, ticks them in registration order, and arbitrates the
//! observer's active tool.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::feature::{
    AutoFishing, BurstFarmer, DistanceAssist, Feature, FeatureId, FlareMacro, LassoCapture,
    Phase, SeaCreatureCombat, TickContext, ToolLease,
};
use crate::host::HostControls;
use crate::planner::{PlannerAction, RunPlanner};
use crate::rng::Jitter;
use crate::strategy::StrategyKind;
use crate::world::WorldSnapshot;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureStatus {
    pub id: FeatureId,
    pub name: &'static str,
    pub enabled: bool,
    pub phase: Phase,
    pub status: String,
    pub target_distance: Option<f64>,
    pub counters: Vec<(String, u64)>,
}

pub struct Scheduler {
    features: Vec<Box<dyn Feature>>,
    lease: ToolLease,
    planner: RunPlanner,
    ticks: u64,
}

impl Scheduler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            features: Vec::new(),
            lease: ToolLease::default(),
            planner: RunPlanner::new(&config.planner),
            ticks: 0,
        }
    }

    /// Every built-in feature, all disabled, in their fixed tick order.
    pub fn with_features(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut scheduler = Self::new(config);
        scheduler.register(Box::new(AutoFishing::new(config)));
        scheduler.register(Box::new(SeaCreatureCombat::new(config)));
        scheduler.register(Box::new(DistanceAssist::new(config)?));
        scheduler.register(Box::new(BurstFarmer::new(config)?));
        scheduler.register(Box::new(LassoCapture::new(config)));
        scheduler.register(Box::new(FlareMacro::new(config)));
        Ok(scheduler)
    }

    /// Adds a feature at the end of the tick order. A second feature with the
    /// same id replaces the first in place.
    pub fn register(&mut self, feature: Box<dyn Feature>) {
        let id = feature.id();
        match self.features.iter_mut().find(|existing| existing.id() == id) {
            Some(slot) => *slot = feature,
            None => self.features.push(feature),
        }
    }

    pub fn feature(&self, id: FeatureId) -> Option<&dyn Feature> {
        self.features
            .iter()
            .find(|feature| feature.id() == id)
            .map(|feature| &**feature)
    }

    pub fn feature_mut(&mut self, id: FeatureId) -> Option<&mut (dyn Feature + 'static)> {
        self.features
            .iter_mut()
            .find(|feature| feature.id() == id)
            .map(|feature| &mut **feature)
    }

    pub fn ids(&self) -> Vec<FeatureId> {
        self.features.iter().map(|feature| feature.id()).collect()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn lease_holder(&self) -> Option<FeatureId> {
        self.lease.holder()
    }

    pub fn planner(&self) -> &RunPlanner {
        &self.planner
    }

    pub fn enable(&mut self, id: FeatureId) -> bool {
        match self.feature_mut(id) {
            Some(feature) => {
                feature.enable();
                true
            }
            None => false,
        }
    }

    /// Disables synchronously and hands the tool back if the feature held it.
    pub fn disable(&mut self, id: FeatureId, host: &mut dyn HostControls) -> bool {
        let Some(feature) = self.feature_mut(id) else {
            return false;
        };
        feature.disable(host);
        self.lease.release(id);
        true
    }

    /// Routes a strategy choice to the first feature that takes it.
    pub fn select_strategy(&mut self, kind: StrategyKind) -> bool {
        let taken = self
            .features
            .iter_mut()
            .any(|feature| feature.select_strategy(kind));
        if !taken {
            debug!(strategy = kind.as_str(), "no feature accepts strategy");
        }
        taken
    }

    pub fn is_enabled(&self, id: FeatureId) -> bool {
        self.feature(id).is_some_and(|feature| feature.is_enabled())
    }

    /// Emits due input releases. Safe to call between ticks.
    pub fn pump_input(&mut self, now_ms: u64, host: &mut dyn HostControls) {
        for feature in &mut self.features {
            feature.pump_input(now_ms, host);
        }
    }

    pub fn tick(
        &mut self,
        world: &WorldSnapshot,
        host: &mut dyn HostControls,
        jitter: &mut dyn Jitter,
    ) {
        self.pump_input(world.now_ms, host);

        let enabled: Vec<FeatureId> = self
            .features
            .iter()
            .filter(|feature| feature.is_enabled())
            .map(|feature| feature.id())
            .collect();

        for feature in &mut self.features {
            if !feature.is_enabled() {
                continue;
            }
            let id = feature.id();
            let mut ctx = TickContext {
                world,
                host: &mut *host,
                jitter: &mut *jitter,
                lease: &mut self.lease,
                enabled: &enabled,
            };
            feature.tick(&mut ctx);
            if !feature.is_enabled() {
                info!(feature = id.as_str(), "feature disabled itself");
                self.lease.release(id);
            }
        }

        match self.planner.tick(world.now_ms, jitter) {
            Some(PlannerAction::StopFeatures) => {
                self.disable(FeatureId::AutoFishing, host);
            }
            Some(PlannerAction::StartFeatures) => {
                self.enable(FeatureId::AutoFishing);
            }
            None => {}
        }
        self.ticks += 1;
    }

    pub fn statuses(&self) -> Vec<FeatureStatus> {
        self.features
            .iter()
            .map(|feature| FeatureStatus {
                id: feature.id(),
                name: feature.id().display_name(),
                enabled: feature.is_enabled(),
                phase: feature.phase(),
                status: feature.status_text(),
                target_distance: feature.current_target_distance(),
                counters: feature
                    .counters()
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::testkit::{creature, observer, world};
    use crate::geometry::Vec3;
    use crate::host::RecordingHost;
    use crate::rng::SequenceJitter;

    fn scheduler(config: &EngineConfig) -> Scheduler {
        Scheduler::with_features(config).expect("default config is valid")
    }

    #[test]
    fn features_register_in_tick_order() {
        let scheduler = scheduler(&EngineConfig::default());
        assert_eq!(scheduler.ids(), FeatureId::ALL.to_vec());
        assert!(scheduler.statuses().iter().all(|status| !status.enabled));
    }

    #[test]
    fn invalid_pattern_fails_construction() {
        let mut config = EngineConfig::default();
        config.burst_farmer.pattern = "[unclosed".to_string();
        assert!(matches!(
            Scheduler::with_features(&config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn combat_takes_the_tool_and_fishing_pauses() {
        let mut scheduler = scheduler(&EngineConfig::default());
        let mut host = RecordingHost::new();
        let mut jitter = SequenceJitter::midpoint();
        scheduler.enable(FeatureId::AutoFishing);
        scheduler.enable(FeatureId::SeaCreatureCombat);

        let mut objects = Vec::new();
        creature(
            &mut objects,
            100,
            Vec3::new(3.0, 0.0, 0.0),
            "[Lv2] Sea Walker 1,000/1,000",
        );
        scheduler.tick(&world(0, objects.clone(), observer(0)), &mut host, &mut jitter);
        assert_eq!(scheduler.lease_holder(), Some(FeatureId::SeaCreatureCombat));

        scheduler.tick(&world(1, objects, observer(0)), &mut host, &mut jitter);
        let fishing = scheduler
            .feature(FeatureId::AutoFishing)
            .map(|feature| feature.status_text());
        assert_eq!(
            fishing.as_deref(),
            Some("Paused (Sea Creature Combat has the tool)")
        );

        assert!(scheduler.disable(FeatureId::SeaCreatureCombat, &mut host));
        assert_eq!(scheduler.lease_holder(), None);
    }

    #[test]
    fn strategy_selection_reaches_combat() {
        let mut scheduler = scheduler(&EngineConfig::default());
        assert!(scheduler.select_strategy(StrategyKind::Melee));
        assert!(!scheduler.select_strategy(StrategyKind::Burst));
    }

    #[test]
    fn planner_breaks_and_resumes_fishing() {
        let mut config = EngineConfig::default();
        config.planner.enabled = true;
        config.planner.run_minutes = 1;
        config.planner.break_min_minutes = 1;
        config.planner.break_max_minutes = 1;
        let mut scheduler = scheduler(&config);
        let mut host = RecordingHost::new();
        let mut jitter = SequenceJitter::low();
        scheduler.enable(FeatureId::AutoFishing);

        scheduler.tick(&world(0, Vec::new(), observer(0)), &mut host, &mut jitter);
        assert!(scheduler.is_enabled(FeatureId::AutoFishing));

        scheduler.tick(&world(1_200, Vec::new(), observer(0)), &mut host, &mut jitter);
        assert!(!scheduler.is_enabled(FeatureId::AutoFishing));

        scheduler.tick(&world(2_400, Vec::new(), observer(0)), &mut host, &mut jitter);
        assert!(scheduler.is_enabled(FeatureId::AutoFishing));
        assert_eq!(scheduler.planner().breaks(), 1);
    }

    #[test]
    fn self_disabled_feature_gives_up_the_lease() {
        let mut scheduler = scheduler(&EngineConfig::default());
        let mut host = RecordingHost::new();
        let mut jitter = SequenceJitter::midpoint();
        scheduler.enable(FeatureId::AutoFishing);
        let mut empty = observer(0);
        empty.hotbar = vec![None; 9];
        scheduler.tick(&world(0, Vec::new(), empty), &mut host, &mut jitter);
        assert!(!scheduler.is_enabled(FeatureId::AutoFishing));
        assert_eq!(scheduler.ticks(), 1);
    }
}
