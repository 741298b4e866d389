use serde::{Deserialize, Serialize};

use crate::geometry::{Aabb, Rotation, Vec3};
use crate::label::strip_formatting;

pub type ObjectId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Floating text label; carries no hit box of its own that matters.
    Marker,
    Animate,
    Inanimate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub position: Vec3,
    pub half_width: f64,
    pub height: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub type_tag: Option<String>,
    pub alive: bool,
}

impl WorldObject {
    pub fn bounds(&self) -> Aabb {
        Aabb::around(self.position, self.half_width, self.height)
    }

    pub fn center(&self) -> Vec3 {
        self.position.offset_y(self.height * 0.5)
    }

    pub fn is_marker(&self) -> bool {
        self.kind == ObjectKind::Marker
    }

    pub fn has_type(&self, tag: &str) -> bool {
        self.type_tag
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(tag))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
}

impl Tool {
    pub fn new(name: impl Into<String>, kind: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind: kind.map(str::to_string),
        }
    }

    /// Display name without formatting codes, lowercased for matching.
    pub fn normalized_name(&self) -> String {
        strip_formatting(&self.name).to_lowercase()
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(kind))
    }

    pub fn is_fishing_rod(&self) -> bool {
        self.is_kind("fishing_rod") || self.normalized_name().contains("rod")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bobber {
    pub position: Vec3,
    pub in_liquid: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    pub id: ObjectId,
    pub name: String,
    pub position: Vec3,
    pub eye_height: f64,
    pub rotation: Rotation,
    pub selected_slot: usize,
    pub hotbar: Vec<Option<Tool>>,
    #[serde(default)]
    pub bobber: Option<Bobber>,
}

impl Observer {
    pub fn eye(&self) -> Vec3 {
        self.position.offset_y(self.eye_height)
    }

    pub fn tool_in(&self, slot: usize) -> Option<&Tool> {
        self.hotbar.get(slot).and_then(Option::as_ref)
    }

    pub fn held_tool(&self) -> Option<&Tool> {
        self.tool_in(self.selected_slot)
    }
}

/// Read-only view of the world for one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub now_ms: u64,
    pub objects: Vec<WorldObject>,
    pub observer: Observer,
    /// Chat lines received since the previous tick.
    #[serde(default)]
    pub chat: Vec<String>,
}

impl WorldSnapshot {
    pub fn object(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    pub fn markers(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.iter().filter(|object| object.is_marker())
    }

    /// Markers whose label contains `needle` (case-insensitive) within `radius`
    /// of `around`.
    pub fn markers_near<'a>(
        &'a self,
        needle: &'a str,
        around: Vec3,
        radius: f64,
    ) -> impl Iterator<Item = &'a WorldObject> + 'a {
        self.markers().filter(move |marker| {
            marker.position.distance(around) <= radius
                && marker
                    .label
                    .as_deref()
                    .is_some_and(|label| crate::label::contains_ignore_case(label, needle))
        })
    }
}
