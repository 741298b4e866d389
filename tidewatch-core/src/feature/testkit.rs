use crate::feature::{Feature, FeatureId, TickContext, ToolLease};
use crate::geometry::{Rotation, Vec3};
use crate::host::RecordingHost;
use crate::rng::SequenceJitter;
use crate::world::{ObjectKind, Observer, Tool, WorldObject, WorldSnapshot};

pub struct Rig {
    pub host: RecordingHost,
    pub jitter: SequenceJitter,
    pub lease: ToolLease,
    pub enabled: Vec<FeatureId>,
}

impl Rig {
    pub fn new(enabled: &[FeatureId]) -> Self {
        Self {
            host: RecordingHost::new(),
            jitter: SequenceJitter::midpoint(),
            lease: ToolLease::default(),
            enabled: enabled.to_vec(),
        }
    }

    pub fn tick(&mut self, feature: &mut dyn Feature, world: &WorldSnapshot) {
        feature.pump_input(world.now_ms, &mut self.host);
        let mut ctx = TickContext {
            world,
            host: &mut self.host,
            jitter: &mut self.jitter,
            lease: &mut self.lease,
            enabled: &self.enabled,
        };
        feature.tick(&mut ctx);
    }
}

pub fn hotbar() -> Vec<Option<Tool>> {
    vec![
        Some(Tool::new("Rod of the Sea", Some("fishing_rod"))),
        Some(Tool::new("Hyperion", Some("sword"))),
        Some(Tool::new("Flaming Katana", Some("sword"))),
        Some(Tool::new("Prime Huntaxe", Some("axe"))),
        Some(Tool::new("Black Hole", None)),
        Some(Tool::new("Lasso", None)),
        Some(Tool::new("Overflux Power Orb", None)),
    ]
}

pub fn observer(slot: usize) -> Observer {
    Observer {
        id: 0,
        name: "Angler".to_string(),
        position: Vec3::ZERO,
        eye_height: 1.62,
        rotation: Rotation::default(),
        selected_slot: slot,
        hotbar: hotbar(),
        bobber: None,
    }
}

pub fn world(tick: u64, objects: Vec<WorldObject>, observer: Observer) -> WorldSnapshot {
    WorldSnapshot {
        tick,
        now_ms: tick * 50,
        objects,
        observer,
        chat: Vec::new(),
    }
}

/// Pushes a labelled creature: marker `id` floating over body `id + 1`.
pub fn creature(objects: &mut Vec<WorldObject>, id: u64, at: Vec3, label: &str) {
    objects.push(marker(id, at.offset_y(2.0), label));
    objects.push(WorldObject {
        id: id + 1,
        kind: ObjectKind::Animate,
        position: at,
        half_width: 0.3,
        height: 1.8,
        label: None,
        type_tag: Some("zombie".to_string()),
        alive: true,
    });
}

pub fn marker(id: u64, at: Vec3, label: &str) -> WorldObject {
    WorldObject {
        id,
        kind: ObjectKind::Marker,
        position: at,
        half_width: 0.25,
        height: 0.5,
        label: Some(label.to_string()),
        type_tag: Some("armor_stand".to_string()),
        alive: true,
    }
}
