//! Deterministic stand-in for the game client: produces snapshots and reacts
//! to the engine's inputs.

use serde::Serialize;
use tidewatch_core::error::HostError;
use tidewatch_core::geometry::{Rotation, Vec3};
use tidewatch_core::world::Bobber;
use tidewatch_core::{
    constants::{HOTBAR_SLOTS, TICK_MS},
    HostControls, Jitter, MouseButton, ObjectId, ObjectKind, Observer, SeededRng, WorldObject,
    WorldSnapshot,
};

use crate::scenario::{CombatSetup, FishingSetup, LassoSetup, Scenario, Spawn, SpawnKind};

const OBSERVER_ID: ObjectId = 1;
const BITE_MARKER_ID: ObjectId = 2;
const REEL_INDICATOR_ID: ObjectId = 3;
const FIRST_CREATURE_ID: ObjectId = 100;
const BODY_HEIGHT: f64 = 1.8;
const BODY_HALF_WIDTH: f64 = 0.3;
const CAST_DISTANCE: f64 = 6.0;
const LASSO_SLACK: f64 = 5.0;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub presses: u64,
    pub releases: u64,
    pub selections: u64,
    pub rotations: u64,
    pub casts: u64,
    pub catches: u64,
    pub missed_bites: u64,
    pub creatures_spawned: u64,
    pub kills: u64,
    pub captures: u64,
    pub escapes: u64,
    pub finishers: u64,
    pub orbs: u64,
}

#[derive(Clone, Debug)]
struct Creature {
    body_id: ObjectId,
    marker_id: ObjectId,
    kind: SpawnKind,
    name: String,
    position: Vec3,
    velocity: Vec3,
    current: f64,
    max: Option<f64>,
    type_tag: Option<String>,
}

impl Creature {
    fn marker_position(&self) -> Vec3 {
        match self.kind {
            SpawnKind::Marker => self.position,
            _ => self.position.offset_y(BODY_HEIGHT + 0.3),
        }
    }

    fn label(&self) -> String {
        match self.max {
            Some(max) => format!(
                "{} {}/{}",
                self.name,
                format_amount(self.current),
                format_amount(max)
            ),
            None => self.name.clone(),
        }
    }

    fn takes_damage(&self) -> bool {
        self.kind == SpawnKind::Creature && self.max.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bite {
    Idle,
    Waiting { at: u64 },
    Biting { until: u64 },
}

#[derive(Clone, Copy, Debug)]
struct Hook {
    body_id: ObjectId,
    reels_left: u32,
    indicator_at: u64,
}

pub struct SimWorld {
    tick: u64,
    observer: Observer,
    creatures: Vec<Creature>,
    pending: Vec<Spawn>,
    next_id: ObjectId,
    rng: SeededRng,
    fishing: FishingSetup,
    combat: CombatSetup,
    lasso: LassoSetup,
    bite: Bite,
    hook: Option<Hook>,
    inbox: Vec<String>,
    outbox: Vec<String>,
    stats: SimStats,
}

impl SimWorld {
    pub fn new(scenario: &Scenario, seed: u32) -> Self {
        let setup = &scenario.observer;
        let mut pending = scenario.spawns.clone();
        pending.sort_by_key(|spawn| spawn.tick);
        let mut world = Self {
            tick: 0,
            observer: Observer {
                id: OBSERVER_ID,
                name: setup.name.clone(),
                position: setup.position,
                eye_height: setup.eye_height,
                rotation: Rotation::new(setup.yaw, setup.pitch).normalized(),
                selected_slot: setup.selected_slot,
                hotbar: setup.hotbar.clone(),
                bobber: None,
            },
            creatures: Vec::new(),
            pending,
            next_id: FIRST_CREATURE_ID,
            rng: SeededRng::new(seed),
            fishing: scenario.fishing.clone(),
            combat: scenario.combat.clone(),
            lasso: scenario.lasso.clone(),
            bite: Bite::Idle,
            hook: None,
            inbox: Vec::new(),
            outbox: Vec::new(),
            stats: SimStats::default(),
        };
        world.spawn_due();
        world
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn now_ms(&self) -> u64 {
        self.tick * TICK_MS
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn creature_count(&self) -> usize {
        self.creatures.len()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let mut objects = Vec::with_capacity(self.creatures.len() * 2 + 2);
        for creature in &self.creatures {
            if creature.kind != SpawnKind::Marker {
                objects.push(WorldObject {
                    id: creature.body_id,
                    kind: ObjectKind::Animate,
                    position: creature.position,
                    half_width: BODY_HALF_WIDTH,
                    height: BODY_HEIGHT,
                    label: None,
                    type_tag: creature.type_tag.clone(),
                    alive: true,
                });
            }
            objects.push(marker(
                creature.marker_id,
                creature.marker_position(),
                creature.label(),
            ));
        }
        if let (Bite::Biting { .. }, Some(bobber)) = (self.bite, self.observer.bobber) {
            objects.push(marker(
                BITE_MARKER_ID,
                bobber.position.offset_y(0.6),
                "!!!".to_string(),
            ));
        }
        if let Some(hook) = self.hook.filter(|hook| self.tick >= hook.indicator_at) {
            if let Some(creature) = self.creature(hook.body_id) {
                objects.push(marker(
                    REEL_INDICATOR_ID,
                    creature.marker_position().offset_y(0.4),
                    "REEL!".to_string(),
                ));
            }
        }
        WorldSnapshot {
            tick: self.tick,
            now_ms: self.now_ms(),
            objects,
            observer: self.observer.clone(),
            chat: self.inbox.clone(),
        }
    }

    /// Moves the world one tick forward.
    pub fn advance(&mut self) {
        self.tick += 1;
        for creature in &mut self.creatures {
            creature.position = creature.position.add(creature.velocity);
        }
        self.inbox = std::mem::take(&mut self.outbox);
        self.advance_bite();
        self.check_hook();
        self.spawn_due();
    }

    fn creature(&self, body_id: ObjectId) -> Option<&Creature> {
        self.creatures
            .iter()
            .find(|creature| creature.body_id == body_id)
    }

    fn allocate(&mut self) -> (ObjectId, ObjectId) {
        let ids = (self.next_id, self.next_id + 1);
        self.next_id += 2;
        ids
    }

    fn spawn_due(&mut self) {
        let split = self
            .pending
            .iter()
            .position(|spawn| spawn.tick > self.tick)
            .unwrap_or(self.pending.len());
        let due: Vec<Spawn> = self.pending.drain(..split).collect();
        for spawn in due {
            for copy in 0..spawn.count.max(1) {
                let position = spawn.position.add(spawn.spacing.scale(f64::from(copy)));
                self.spawn(&spawn, position);
            }
        }
    }

    fn spawn(&mut self, spawn: &Spawn, position: Vec3) {
        let (body_id, marker_id) = self.allocate();
        let max = match spawn.kind {
            SpawnKind::Creature => spawn.max_status,
            SpawnKind::Lasso | SpawnKind::Marker => None,
        };
        self.creatures.push(Creature {
            body_id,
            marker_id,
            kind: spawn.kind,
            name: spawn.name.clone(),
            position,
            velocity: spawn.velocity,
            current: max.unwrap_or(0.0),
            max,
            type_tag: spawn.type_tag.clone(),
        });
        self.stats.creatures_spawned += 1;
    }

    fn advance_bite(&mut self) {
        match self.bite {
            Bite::Waiting { at } if self.tick >= at => {
                self.bite = Bite::Biting {
                    until: self.tick + self.fishing.bite_window_ticks.max(1),
                };
            }
            Bite::Biting { until } if self.tick >= until => {
                self.stats.missed_bites += 1;
                self.schedule_bite();
            }
            _ => {}
        }
    }

    fn schedule_bite(&mut self) {
        let wait = self
            .rng
            .range_inclusive(self.fishing.bite_min_ticks, self.fishing.bite_max_ticks);
        self.bite = Bite::Waiting {
            at: self.tick + wait.max(1),
        };
    }

    fn check_hook(&mut self) {
        let Some(hook) = self.hook else {
            return;
        };
        let observer = self.observer.position;
        let escaped = match self.creature(hook.body_id) {
            Some(creature) => creature.position.distance(observer) > self.lasso.reach + LASSO_SLACK,
            None => true,
        };
        if escaped {
            let name = self
                .creature(hook.body_id)
                .map_or_else(|| "creature".to_string(), |creature| creature.name.clone());
            self.outbox
                .push(format!("You didn't reel it in fast enough, the {name} escaped!"));
            self.stats.escapes += 1;
            self.hook = None;
        }
    }

    fn use_rod(&mut self) {
        if self.observer.bobber.is_none() {
            let facing = self.observer.rotation.direction();
            let horizontal = Vec3::new(facing.x, 0.0, facing.z);
            let length = Vec3::ZERO.horizontal_distance(facing);
            let reach = if length > f64::EPSILON {
                horizontal.scale(CAST_DISTANCE / length)
            } else {
                Vec3::new(0.0, 0.0, CAST_DISTANCE)
            };
            self.observer.bobber = Some(Bobber {
                position: self.observer.position.add(reach).offset_y(-0.5),
                in_liquid: true,
            });
            self.stats.casts += 1;
            self.schedule_bite();
            return;
        }

        if matches!(self.bite, Bite::Biting { .. }) {
            self.stats.catches += 1;
            if self.rng.unit() < self.fishing.creature_chance {
                let spawn = Spawn {
                    name: self.fishing.creature_name.clone(),
                    max_status: Some(self.fishing.creature_status),
                    ..Spawn::default()
                };
                let position = self.observer.position.add(self.fishing.creature_offset);
                self.spawn(&spawn, position);
            }
        }
        self.observer.bobber = None;
        self.bite = Bite::Idle;
    }

    fn use_lasso(&mut self) {
        let delay = self.lasso.indicator_delay_ticks.max(1);
        match self.hook {
            None => {
                let observer = self.observer.position;
                let reach = self.lasso.reach;
                let target = self
                    .creatures
                    .iter()
                    .filter(|creature| creature.kind == SpawnKind::Lasso)
                    .map(|creature| (creature.body_id, creature.position.distance(observer)))
                    .filter(|(_, distance)| *distance <= reach)
                    .min_by(|a, b| a.1.total_cmp(&b.1));
                if let Some((body_id, _)) = target {
                    self.hook = Some(Hook {
                        body_id,
                        reels_left: self.lasso.reels_needed.max(1),
                        indicator_at: self.tick + delay,
                    });
                }
            }
            Some(mut hook) if self.tick >= hook.indicator_at => {
                hook.reels_left -= 1;
                if hook.reels_left > 0 {
                    hook.indicator_at = self.tick + delay;
                    self.hook = Some(hook);
                    return;
                }
                self.hook = None;
                if let Some(index) = self
                    .creatures
                    .iter()
                    .position(|creature| creature.body_id == hook.body_id)
                {
                    let creature = self.creatures.remove(index);
                    self.outbox
                        .push(format!("You caught a {} Shard!", creature.name));
                    self.stats.captures += 1;
                }
            }
            Some(_) => {}
        }
    }

    fn damage_within(&mut self, radius: f64, amount: f64) {
        let observer = self.observer.position;
        for creature in &mut self.creatures {
            if creature.takes_damage() && creature.position.distance(observer) <= radius {
                creature.current -= amount;
            }
        }
        self.remove_dead();
    }

    fn damage_nearest(&mut self, reach: f64, amount: f64) {
        let observer = self.observer.position;
        let nearest = self
            .creatures
            .iter_mut()
            .filter(|creature| creature.takes_damage())
            .map(|creature| {
                let distance = creature.position.distance(observer);
                (creature, distance)
            })
            .filter(|(_, distance)| *distance <= reach)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((creature, _)) = nearest {
            creature.current -= amount;
        }
        self.remove_dead();
    }

    fn remove_dead(&mut self) {
        let before = self.creatures.len();
        self.creatures
            .retain(|creature| !creature.takes_damage() || creature.current > 0.0);
        self.stats.kills += (before - self.creatures.len()) as u64;
    }
}

impl HostControls for SimWorld {
    fn select_slot(&mut self, slot: usize) -> Result<(), HostError> {
        if slot >= HOTBAR_SLOTS {
            return Err(HostError::SlotOutOfRange {
                slot,
                slots: HOTBAR_SLOTS,
            });
        }
        self.observer.selected_slot = slot;
        self.stats.selections += 1;
        Ok(())
    }

    fn set_rotation(&mut self, rotation: Rotation) -> Result<(), HostError> {
        self.observer.rotation = rotation.normalized();
        self.stats.rotations += 1;
        Ok(())
    }

    fn press(&mut self, button: MouseButton) -> Result<(), HostError> {
        self.stats.presses += 1;
        let Some(tool) = self.observer.held_tool().cloned() else {
            return Ok(());
        };
        let name = tool.normalized_name();
        match button {
            MouseButton::Right if tool.is_fishing_rod() => self.use_rod(),
            MouseButton::Right if name.contains("lasso") => self.use_lasso(),
            MouseButton::Right if name.contains("power orb") => self.stats.orbs += 1,
            MouseButton::Right if name.contains("black hole") => {
                self.stats.finishers += 1;
                self.damage_within(self.combat.finisher_radius, self.combat.finisher_damage);
            }
            MouseButton::Right => {
                self.damage_within(self.combat.area_radius, self.combat.area_damage)
            }
            MouseButton::Left if !tool.is_fishing_rod() => {
                self.damage_nearest(self.combat.melee_reach, self.combat.melee_damage)
            }
            MouseButton::Left => {}
        }
        Ok(())
    }

    fn release(&mut self, _button: MouseButton) -> Result<(), HostError> {
        self.stats.releases += 1;
        Ok(())
    }
}

fn marker(id: ObjectId, position: Vec3, label: String) -> WorldObject {
    WorldObject {
        id,
        kind: ObjectKind::Marker,
        position,
        half_width: 0.25,
        height: 0.5,
        label: Some(label),
        type_tag: Some("armor_stand".to_string()),
        alive: true,
    }
}

/// Whole number with thousands separators, e.g. `12,500`.
pub fn format_amount(value: f64) -> String {
    let whole = value.max(0.0).round() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidewatch_core::label::decode_status;

    fn scenario_with(spawns: Vec<Spawn>) -> Scenario {
        Scenario {
            spawns,
            ..Scenario::default()
        }
    }

    #[test]
    fn amounts_carry_separators() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.0), "999");
        assert_eq!(format_amount(12_500.0), "12,500");
        assert_eq!(format_amount(1_000_000.0), "1,000,000");
        assert_eq!(format_amount(-5.0), "0");
    }

    #[test]
    fn creature_labels_decode() {
        let world = SimWorld::new(&scenario_with(vec![Spawn::default()]), 7);
        let snapshot = world.snapshot();
        let label = snapshot
            .objects
            .iter()
            .find_map(|object| object.label.clone())
            .unwrap_or_default();
        assert_eq!(label, "Sea Walker 1,000/1,000");
        let status = decode_status(&label).expect("status");
        assert_eq!(status.current, 1_000.0);
    }

    #[test]
    fn cast_then_bite_then_reel_counts_catch() -> Result<(), HostError> {
        let mut scenario = scenario_with(Vec::new());
        scenario.fishing.bite_min_ticks = 2;
        scenario.fishing.bite_max_ticks = 2;
        let mut world = SimWorld::new(&scenario, 1);

        world.press(MouseButton::Right)?;
        assert!(world.observer().bobber.is_some());
        world.advance();
        world.advance();
        assert!(world
            .snapshot()
            .objects
            .iter()
            .any(|object| object.label.as_deref() == Some("!!!")));
        world.press(MouseButton::Right)?;
        assert_eq!(world.stats().catches, 1);
        assert!(world.observer().bobber.is_none());
        Ok(())
    }

    #[test]
    fn area_attack_kills_cluster() -> Result<(), HostError> {
        let spawn = Spawn {
            count: 3,
            max_status: Some(500.0),
            ..Spawn::default()
        };
        let mut world = SimWorld::new(&scenario_with(vec![spawn]), 1);
        world.select_slot(1)?;
        world.press(MouseButton::Right)?;
        assert_eq!(world.stats().kills, 3);
        assert_eq!(world.creature_count(), 0);
        Ok(())
    }

    #[test]
    fn lasso_capture_posts_chat_next_tick() -> Result<(), HostError> {
        let spawn = Spawn {
            kind: SpawnKind::Lasso,
            name: "Zee".to_string(),
            position: Vec3::new(0.0, 0.0, 8.0),
            max_status: None,
            ..Spawn::default()
        };
        let mut scenario = scenario_with(vec![spawn]);
        scenario.lasso.reels_needed = 1;
        scenario.lasso.indicator_delay_ticks = 1;
        let mut world = SimWorld::new(&scenario, 1);
        world.select_slot(5)?;
        world.press(MouseButton::Right)?;
        world.advance();
        assert!(world
            .snapshot()
            .objects
            .iter()
            .any(|object| object.label.as_deref() == Some("REEL!")));
        world.press(MouseButton::Right)?;
        world.advance();
        assert_eq!(world.stats().captures, 1);
        assert_eq!(world.snapshot().chat, vec!["You caught a Zee Shard!".to_string()]);
        Ok(())
    }

    #[test]
    fn orb_is_placed_without_damage() -> Result<(), HostError> {
        let mut world = SimWorld::new(&scenario_with(vec![Spawn::default()]), 1);
        world.select_slot(6)?;
        world.press(MouseButton::Right)?;
        assert_eq!(world.stats().orbs, 1);
        assert_eq!(world.stats().kills, 0);
        assert_eq!(world.creature_count(), 1);
        Ok(())
    }

    #[test]
    fn select_out_of_range_fails() {
        let mut world = SimWorld::new(&Scenario::default(), 1);
        assert!(world.select_slot(HOTBAR_SLOTS).is_err());
    }
}
