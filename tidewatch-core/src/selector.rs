//! Gated target selection over resolved markers.

use tracing::debug;

use crate::geometry::Vec3;
use crate::label::decode_status;
use crate::proxy::ProxyResolver;
use crate::world::{ObjectId, ObjectKind, WorldSnapshot};

/// Hysteresis over the candidate count: opens once `count >= threshold` and
/// stays open until the count drops to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClusterGate {
    active: bool,
}

impl ClusterGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feeds one tick's candidate count and reports whether selection may proceed.
    pub fn observe(&mut self, count: usize, threshold: u32) -> bool {
        if count == 0 {
            self.active = false;
            return false;
        }
        if !self.active && count < threshold as usize {
            return false;
        }
        self.active = true;
        true
    }

    pub fn reset(&mut self) {
        self.active = false;
    }
}

/// Proxies recently abandoned, ignored by selection until their expiry tick.
#[derive(Clone, Debug, Default)]
pub struct Exclusions {
    entries: Vec<(ObjectId, u64)>,
}

impl Exclusions {
    pub fn insert(&mut self, id: ObjectId, until_tick: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|(own, _)| *own == id) {
            entry.1 = entry.1.max(until_tick);
        } else {
            self.entries.push((id, until_tick));
        }
    }

    pub fn contains(&self, id: ObjectId, tick: u64) -> bool {
        self.entries
            .iter()
            .any(|(own, until)| *own == id && tick < *until)
    }

    pub fn purge(&mut self, tick: u64) {
        self.entries.retain(|(_, until)| tick < *until);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub proxy_id: ObjectId,
    pub marker_id: ObjectId,
    pub position: Vec3,
    pub distance: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selection {
    pub count: usize,
    pub target: Option<Candidate>,
}

/// The target a feature has committed to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedTarget {
    pub proxy_id: ObjectId,
    pub marker_id: ObjectId,
    pub last_distance: f64,
    pub first_seen_tick: u64,
    pub first_seen_position: Vec3,
}

impl TrackedTarget {
    pub fn commit(candidate: Candidate, tick: u64) -> Self {
        Self {
            proxy_id: candidate.proxy_id,
            marker_id: candidate.marker_id,
            last_distance: candidate.distance,
            first_seen_tick: tick,
            first_seen_position: candidate.position,
        }
    }

    /// Moves the escape anchor, e.g. when the action that pins a target lands.
    pub fn rebase(&mut self, position: Vec3) {
        self.first_seen_position = position;
    }

    /// How far the target has moved from where it was first observed.
    pub fn displacement(&self, world: &WorldSnapshot) -> Option<f64> {
        world
            .object(self.proxy_id)
            .map(|object| object.position.distance(self.first_seen_position))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetCheck {
    Valid,
    Gone,
    OutOfRange,
    StatusLost,
}

impl TargetCheck {
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Gone => "gone",
            Self::OutOfRange => "out_of_range",
            Self::StatusLost => "status_lost",
        }
    }
}

#[derive(Clone, Debug)]
pub struct TargetSelector {
    resolver: ProxyResolver,
    detection_radius: f64,
    threshold: u32,
    /// Unlabelled animate objects of these types count as direct candidates.
    direct_types: Vec<String>,
    gate: ClusterGate,
}

impl TargetSelector {
    pub fn new(resolver: ProxyResolver, detection_radius: f64, threshold: u32) -> Self {
        Self {
            resolver,
            detection_radius,
            threshold,
            direct_types: Vec::new(),
            gate: ClusterGate::new(),
        }
    }

    pub fn with_direct_types(mut self, types: Vec<String>) -> Self {
        self.direct_types = types;
        self
    }

    pub fn gate(&self) -> &ClusterGate {
        &self.gate
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn detection_radius(&self) -> f64 {
        self.detection_radius
    }

    pub fn resolver(&self) -> &ProxyResolver {
        &self.resolver
    }

    pub fn reset(&mut self) {
        self.gate.reset();
    }

    /// Resolvable candidates within the detection radius, one per proxy, in
    /// encounter order.
    pub fn candidates(&self, world: &WorldSnapshot, exclusions: &Exclusions) -> Vec<Candidate> {
        let origin = world.observer.position;
        let mut out: Vec<Candidate> = Vec::new();
        let mut push = |candidate: Candidate| {
            if candidate.distance > self.detection_radius
                || exclusions.contains(candidate.proxy_id, world.tick)
                || out.iter().any(|seen| seen.proxy_id == candidate.proxy_id)
            {
                return;
            }
            out.push(candidate);
        };

        for resolution in self.resolver.resolve_all(world) {
            push(Candidate {
                proxy_id: resolution.proxy.id,
                marker_id: resolution.marker.id,
                position: resolution.proxy.position,
                distance: resolution.proxy.position.distance(origin),
            });
        }
        if !self.direct_types.is_empty() {
            for object in &world.objects {
                if object.kind != ObjectKind::Animate
                    || !object.alive
                    || object.id == world.observer.id
                    || !self.direct_types.iter().any(|tag| object.has_type(tag))
                {
                    continue;
                }
                push(Candidate {
                    proxy_id: object.id,
                    marker_id: object.id,
                    position: object.position,
                    distance: object.position.distance(origin),
                });
            }
        }
        out
    }

    /// Counts candidates, updates the gate, and picks the nearest one when open.
    pub fn scan(&mut self, world: &WorldSnapshot, exclusions: &Exclusions) -> Selection {
        let candidates = self.candidates(world, exclusions);
        let count = candidates.len();
        let was_active = self.gate.is_active();
        let open = self.gate.observe(count, self.threshold);
        if open != was_active {
            debug!(count, threshold = self.threshold, open, "cluster gate changed");
        }
        if !open {
            return Selection {
                count,
                target: None,
            };
        }

        let mut best: Option<Candidate> = None;
        for candidate in candidates {
            if best.map_or(true, |current| candidate.distance < current.distance) {
                best = Some(candidate);
            }
        }
        Selection {
            count,
            target: best,
        }
    }

    /// Re-checks a committed target against this tick's world.
    pub fn validate(&self, world: &WorldSnapshot, target: &mut TrackedTarget) -> TargetCheck {
        let Some(proxy) = world.object(target.proxy_id) else {
            return TargetCheck::Gone;
        };
        if !proxy.alive {
            return TargetCheck::Gone;
        }
        if target.marker_id != target.proxy_id {
            let Some(marker) = world.object(target.marker_id) else {
                return TargetCheck::StatusLost;
            };
            if self.resolver.requires_live_status() {
                let live = marker
                    .label
                    .as_deref()
                    .and_then(decode_status)
                    .is_some_and(|status| status.is_live());
                if !live {
                    return TargetCheck::StatusLost;
                }
            }
        }
        let distance = proxy.position.distance(world.observer.position);
        target.last_distance = distance;
        if distance > self.detection_radius {
            return TargetCheck::OutOfRange;
        }
        TargetCheck::Valid
    }
}
