use tracing::{debug, info};

use crate::config::{EngineConfig, LassoConfig};
use crate::geometry::{Rotation, Vec3};
use crate::host::HostControls;
use crate::input::{InputDispatcher, MouseButton};
use crate::label::{contains_ignore_case, LabelFilter};
use crate::proxy::ProxyResolver;
use crate::rotation::RotationController;
use crate::selector::{Candidate, Exclusions, TrackedTarget};
use crate::strategy::{ActionContext, Advisory, SlotMemory};
use crate::timer::HumanTimer;
use crate::tools::named_slot;
use crate::world::{WorldObject, WorldSnapshot};

use super::{status_line, transition, Feature, FeatureId, Phase, TickContext};

const ID: FeatureId = FeatureId::LassoCapture;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChatSignal {
    Escaped,
    Captured,
}

fn chat_signal(line: &str) -> Option<ChatSignal> {
    if contains_ignore_case(line, "you didn't") && contains_ignore_case(line, "escaped") {
        return Some(ChatSignal::Escaped);
    }
    let caught = contains_ignore_case(line, "you caught") || contains_ignore_case(line, "you received");
    (caught && contains_ignore_case(line, "shard")).then_some(ChatSignal::Captured)
}

/// Aims at a roaming creature's marker, throws, and reels while the reel
/// indicator shows.
pub struct LassoCapture {
    config: LassoConfig,
    enabled: bool,
    phase: Phase,
    resolver: ProxyResolver,
    exclusions: Exclusions,
    target: Option<TrackedTarget>,
    rotation: RotationController,
    dispatcher: InputDispatcher,
    slots: SlotMemory,
    advisory: Advisory,
    timer: HumanTimer,
    origin: Option<Rotation>,
    acting_since_ms: Option<u64>,
    settling: bool,
    reel_pending: bool,
    hooked: bool,
    reeled: bool,
    return_ticks: u32,
    throws: u64,
    reels: u64,
    captures: u64,
    escapes: u64,
}

impl LassoCapture {
    pub fn new(config: &EngineConfig) -> Self {
        let lasso = config.lasso.clone();
        let resolver = ProxyResolver::new(LabelFilter::substrings(&lasso.names))
            .with_radius(lasso.detection_radius)
            .allow_missing_status();
        Self {
            rotation: RotationController::new(lasso.rotation_speed),
            config: lasso,
            enabled: false,
            phase: Phase::Idle,
            resolver,
            exclusions: Exclusions::default(),
            target: None,
            dispatcher: InputDispatcher::new(config.input.min_interval_ms)
                .with_hold(config.input.hold_min_ms, config.input.hold_max_ms),
            slots: SlotMemory::default(),
            advisory: Advisory::default(),
            timer: HumanTimer::idle(),
            origin: None,
            acting_since_ms: None,
            settling: false,
            reel_pending: false,
            hooked: false,
            reeled: false,
            return_ticks: 0,
            throws: 0,
            reels: 0,
            captures: 0,
            escapes: 0,
        }
    }

    pub fn captures(&self) -> u64 {
        self.captures
    }

    pub fn escapes(&self) -> u64 {
        self.escapes
    }

    pub fn throws(&self) -> u64 {
        self.throws
    }

    pub fn reels(&self) -> u64 {
        self.reels
    }

    pub fn is_excluded(&self, id: u64, tick: u64) -> bool {
        self.exclusions.contains(id, tick)
    }

    fn aim_point(&self, marker: &WorldObject) -> Vec3 {
        marker.position.offset_y(self.config.aim_offset)
    }

    fn reel_indicator_visible(&self, world: &WorldSnapshot, around: Vec3) -> bool {
        world
            .markers_near(&self.config.reel_label, around, self.config.reel_radius)
            .next()
            .is_some()
    }

    fn apply_step(&mut self, world: &WorldSnapshot, host: &mut dyn HostControls) {
        let Some(rotation) = self.rotation.step(world.observer.eye()) else {
            return;
        };
        if let Err(err) = host.set_rotation(rotation) {
            debug!(%err, "rotation rejected");
        }
    }

    fn clear_engagement(&mut self) {
        self.target = None;
        self.acting_since_ms = None;
        self.timer.clear();
        self.settling = false;
        self.reel_pending = false;
        self.hooked = false;
        self.reeled = false;
    }

    fn reset_state(&mut self, host: &mut dyn HostControls) {
        self.clear_engagement();
        self.dispatcher.reset(host);
        self.rotation.stop_tracking();
        self.exclusions.clear();
        self.slots.clear();
        self.origin = None;
        self.return_ticks = 0;
        self.phase = Phase::Idle;
    }

    fn begin_recovery(&mut self, world: &WorldSnapshot) {
        self.clear_engagement();
        self.return_ticks = 0;
        match self.origin.take() {
            Some(origin) if self.config.return_to_origin => {
                self.rotation.return_to(origin, self.rotation.current());
            }
            _ => self.rotation.stop_tracking(),
        }
        debug!(tick = world.tick, "lasso recovering");
        transition(ID, &mut self.phase, Phase::Recovering);
    }

    fn abandon(&mut self, world: &WorldSnapshot, reason: &str) {
        if let Some(target) = self.target {
            self.exclusions
                .insert(target.marker_id, world.tick + self.config.exclusion_ticks);
            info!(target = target.marker_id, reason, "lasso target abandoned");
        }
        self.escapes += 1;
        self.begin_recovery(world);
    }

    /// Chat lines, marker loss, escape and timeout. `false` ends the tick.
    fn guard(&mut self, world: &WorldSnapshot) -> bool {
        let Some(mut tracked) = self.target else {
            return true;
        };
        for line in &world.chat {
            match chat_signal(line) {
                Some(ChatSignal::Escaped) => {
                    self.abandon(world, "escaped");
                    return false;
                }
                Some(ChatSignal::Captured) => {
                    self.captures += 1;
                    info!(target = tracked.marker_id, "lasso capture");
                    self.begin_recovery(world);
                    return false;
                }
                None => {}
            }
        }
        let Some(marker) = world.object(tracked.marker_id).filter(|marker| marker.alive) else {
            info!(target = tracked.marker_id, "lasso target gone");
            self.begin_recovery(world);
            return false;
        };
        tracked.last_distance = marker.position.distance(world.observer.position);
        self.target = Some(tracked);
        if tracked
            .displacement(world)
            .is_some_and(|moved| moved > self.config.escape_distance)
        {
            self.abandon(world, "moved away");
            return false;
        }
        if self
            .acting_since_ms
            .is_some_and(|since| world.now_ms.saturating_sub(since) > self.config.timeout_ms)
        {
            self.abandon(world, "timeout");
            return false;
        }
        true
    }

    fn seek(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let origin = world.observer.position;
        let nearest = self
            .resolver
            .matching_markers(world)
            .into_iter()
            .filter(|marker| !self.exclusions.contains(marker.id, world.tick))
            .map(|marker| (marker, marker.position.distance(origin)))
            .fold(None::<(&WorldObject, f64)>, |best, (marker, distance)| match best {
                Some((_, best_distance)) if best_distance <= distance => best,
                _ => Some((marker, distance)),
            });
        let Some((marker, distance)) = nearest else {
            return;
        };

        let slot = match self.config.tool_name.as_deref() {
            Some(name) => match named_slot(&world.observer.hotbar, name) {
                Some(slot) => Some(slot),
                None => {
                    self.advisory.raise(ID.as_str(), "lasso missing from hotbar");
                    return;
                }
            },
            None => None,
        };
        self.advisory.clear();
        if !ctx.lease.claim(ID) {
            return;
        }

        let mut actx =
            ActionContext::new(world, &mut *ctx.host, &mut self.dispatcher, &mut *ctx.jitter);
        self.slots.capture(&actx);
        if let Some(slot) = slot {
            actx.select_slot(slot);
        }

        self.origin = Some(world.observer.rotation);
        let aim = self.aim_point(marker);
        self.rotation.track(aim, world.observer.rotation);
        self.target = Some(TrackedTarget::commit(
            Candidate {
                proxy_id: marker.id,
                marker_id: marker.id,
                position: marker.position,
                distance,
            },
            world.tick,
        ));
        info!(target = marker.id, distance, "lasso target committed");
        transition(ID, &mut self.phase, Phase::Preparing);
    }

    fn prepare(&mut self, ctx: &mut TickContext<'_>, ready: bool) {
        let world = ctx.world;
        let Some(marker) = self.target.and_then(|target| world.object(target.marker_id)) else {
            return;
        };
        self.rotation.retarget(self.aim_point(marker));
        if !self
            .rotation
            .converged(world.observer.eye(), self.config.converge_degrees)
        {
            self.settling = false;
            self.apply_step(world, &mut *ctx.host);
            return;
        }
        if !self.settling {
            self.settling = true;
            self.timer = HumanTimer::start(&self.config.settle, &mut *ctx.jitter);
            return;
        }
        if ready {
            self.settling = false;
            self.acting_since_ms = Some(world.now_ms);
            transition(ID, &mut self.phase, Phase::Acting);
            self.act(ctx);
        }
    }

    fn act(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        let Some(marker) = self.target.and_then(|target| world.object(target.marker_id)) else {
            return;
        };
        self.rotation.retarget(self.aim_point(marker));
        self.apply_step(world, &mut *ctx.host);
        if !self
            .dispatcher
            .fire(MouseButton::Right, world.now_ms, &mut *ctx.host, &mut *ctx.jitter)
            .pressed()
        {
            return;
        }
        if self.hooked {
            self.reels += 1;
            self.reeled = true;
        } else {
            self.throws += 1;
            if let Some(target) = self.target.as_mut() {
                target.rebase(marker.position);
            }
        }
        transition(ID, &mut self.phase, Phase::Confirming);
    }

    fn confirm(&mut self, ctx: &mut TickContext<'_>, ready: bool) {
        let world = ctx.world;
        let Some(marker) = self.target.and_then(|target| world.object(target.marker_id)) else {
            return;
        };
        self.rotation.retarget(self.aim_point(marker));
        self.apply_step(world, &mut *ctx.host);

        if !self.reel_indicator_visible(world, marker.position) {
            self.reel_pending = false;
            if self.reeled {
                debug!(target = marker.id, "reel indicator cleared");
                self.begin_recovery(world);
            }
            return;
        }
        if !self.reel_pending {
            self.reel_pending = true;
            self.timer = HumanTimer::start(&self.config.reel_delay, &mut *ctx.jitter);
            return;
        }
        if ready {
            self.reel_pending = false;
            self.hooked = true;
            transition(ID, &mut self.phase, Phase::Acting);
            self.act(ctx);
        }
    }

    fn recover(&mut self, ctx: &mut TickContext<'_>) {
        let world = ctx.world;
        self.return_ticks += 1;
        let eye = world.observer.eye();
        let settled = !self.rotation.is_tracking()
            || self.rotation.converged(eye, self.config.converge_degrees)
            || self.return_ticks > self.config.return_max_ticks;
        if !settled {
            self.apply_step(world, &mut *ctx.host);
            return;
        }
        self.rotation.stop_tracking();
        let mut actx =
            ActionContext::new(world, &mut *ctx.host, &mut self.dispatcher, &mut *ctx.jitter);
        self.slots.restore(&mut actx);
        ctx.lease.release(ID);
        transition(ID, &mut self.phase, Phase::Idle);
    }
}

impl Feature for LassoCapture {
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
        status_line(self.enabled, self.phase)
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
        let ready = self.timer.poll();

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
            Phase::Preparing => self.prepare(ctx, ready),
            Phase::Acting => self.act(ctx),
            Phase::Confirming => self.confirm(ctx, ready),
            Phase::Recovering => self.recover(ctx),
        }
    }

    fn pump_input(&mut self, now_ms: u64, host: &mut dyn HostControls) {
        self.dispatcher.pump(now_ms, host);
    }

    fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("throws", self.throws),
            ("reels", self.reels),
            ("captures", self.captures),
            ("escapes", self.escapes),
        ]
    }
}
