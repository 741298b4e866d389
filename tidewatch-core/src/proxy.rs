//! Marker to proxy resolution.
//!
//! A marker is a floating label hovering over the thing that can actually be
//! interacted with. Resolution keeps markers whose label matches the filter and
//! carries a live status, then looks for the nearest animate object inside the
//! marker's bounds expanded by a search margin.

use crate::constants::{MARKER_RADIUS, PROXY_MARGIN_HORIZONTAL, PROXY_MARGIN_VERTICAL};
use crate::label::{contains_ignore_case, decode_status, LabelFilter, StatusValue};
use crate::world::{ObjectKind, WorldObject, WorldSnapshot};

#[derive(Clone, Debug, PartialEq)]
pub struct ProxySearch {
    pub horizontal_margin: f64,
    pub vertical_margin: f64,
    /// Type tag tried first before falling back to any animate object.
    pub preferred_type: Option<String>,
}

impl Default for ProxySearch {
    fn default() -> Self {
        Self {
            horizontal_margin: PROXY_MARGIN_HORIZONTAL,
            vertical_margin: PROXY_MARGIN_VERTICAL,
            preferred_type: None,
        }
    }
}

/// One marker paired with the object it stands for.
#[derive(Clone, Copy, Debug)]
pub struct Resolution<'w> {
    pub marker: &'w WorldObject,
    pub proxy: &'w WorldObject,
    pub status: Option<StatusValue>,
}

#[derive(Clone, Debug)]
pub struct ProxyResolver {
    filter: LabelFilter,
    radius: f64,
    search: ProxySearch,
    require_live_status: bool,
}

impl ProxyResolver {
    pub fn new(filter: LabelFilter) -> Self {
        Self {
            filter,
            radius: MARKER_RADIUS,
            search: ProxySearch::default(),
            require_live_status: true,
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_search(mut self, search: ProxySearch) -> Self {
        self.search = search;
        self
    }

    /// Markers without a decodable status are kept too. Used for labels that
    /// never show one.
    pub fn allow_missing_status(mut self) -> Self {
        self.require_live_status = false;
        self
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn requires_live_status(&self) -> bool {
        self.require_live_status
    }

    /// Checks a single marker against the filter, observer exclusion, and status rules.
    pub fn accepts_marker(&self, world: &WorldSnapshot, marker: &WorldObject) -> bool {
        if !marker.is_marker() || !marker.alive {
            return false;
        }
        let Some(label) = marker.label.as_deref() else {
            return false;
        };
        if !world.observer.name.is_empty() && contains_ignore_case(label, &world.observer.name) {
            return false;
        }
        if !self.filter.matches(label) {
            return false;
        }
        !self.require_live_status || decode_status(label).is_some_and(|status| status.is_live())
    }

    /// Markers within the resolver radius that pass every label rule.
    pub fn matching_markers<'w>(&self, world: &'w WorldSnapshot) -> Vec<&'w WorldObject> {
        let origin = world.observer.position;
        world
            .markers()
            .filter(|marker| marker.position.distance(origin) <= self.radius)
            .filter(|marker| self.accepts_marker(world, marker))
            .collect()
    }

    /// Nearest animate object inside the marker's expanded bounds.
    pub fn resolve_marker<'w>(
        &self,
        world: &'w WorldSnapshot,
        marker: &WorldObject,
    ) -> Option<&'w WorldObject> {
        let area = marker
            .bounds()
            .expand(self.search.horizontal_margin, self.search.vertical_margin);
        let observer_id = world.observer.id;
        let candidates = || {
            world.objects.iter().filter(move |object| {
                object.id != marker.id
                    && object.id != observer_id
                    && object.kind == ObjectKind::Animate
                    && object.alive
                    && object.bounds().intersects(&area)
            })
        };

        if let Some(preferred) = self.search.preferred_type.as_deref() {
            let hit = nearest_to(
                candidates().filter(|object| object.has_type(preferred)),
                marker,
            );
            if hit.is_some() {
                return hit;
            }
        }
        nearest_to(candidates(), marker)
    }

    /// Every marker that resolves, one entry per marker.
    pub fn resolve_all<'w>(&self, world: &'w WorldSnapshot) -> Vec<Resolution<'w>> {
        self.matching_markers(world)
            .into_iter()
            .filter_map(|marker| {
                let proxy = self.resolve_marker(world, marker)?;
                let status = marker.label.as_deref().and_then(decode_status);
                Some(Resolution {
                    marker,
                    proxy,
                    status,
                })
            })
            .collect()
    }

    /// The resolution whose proxy is nearest to the observer.
    pub fn resolve<'w>(&self, world: &'w WorldSnapshot) -> Option<Resolution<'w>> {
        let origin = world.observer.position;
        let mut best: Option<(f64, Resolution<'w>)> = None;
        for resolution in self.resolve_all(world) {
            let distance = resolution.proxy.position.distance(origin);
            if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                best = Some((distance, resolution));
            }
        }
        best.map(|(_, resolution)| resolution)
    }
}

fn nearest_to<'w>(
    objects: impl Iterator<Item = &'w WorldObject>,
    marker: &WorldObject,
) -> Option<&'w WorldObject> {
    let mut best: Option<(f64, &'w WorldObject)> = None;
    for object in objects {
        let distance = object.position.distance(marker.position);
        if best.map_or(true, |(d, _)| distance < d) {
            best = Some((distance, object));
        }
    }
    best.map(|(_, object)| object)
}
