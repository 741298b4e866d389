//! Hotbar tool matching.

use serde::{Deserialize, Serialize};

use crate::constants::HOTBAR_SLOTS;
use crate::world::Tool;

/// Which tools a strategy may use, and in what order of preference.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPolicy {
    /// Name substrings in priority order; the first one present wins.
    pub priority: Vec<String>,
    /// Further acceptable name substrings without ordering.
    pub allowed: Vec<String>,
    /// Acceptable tool kinds (e.g. `sword`) when no name matches.
    pub allowed_kinds: Vec<String>,
    /// Name substrings that disqualify a tool regardless of the rest.
    pub excluded: Vec<String>,
}

impl ToolPolicy {
    pub fn named<I, S>(priority: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            priority: priority.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excluded
            .iter()
            .any(|needle| name.contains(needle.to_lowercase().as_str()))
    }

    /// Index of the first priority entry the tool matches.
    pub fn rank(&self, tool: &Tool) -> Option<usize> {
        let name = tool.normalized_name();
        if self.is_excluded(&name) {
            return None;
        }
        self.priority
            .iter()
            .position(|needle| name.contains(needle.to_lowercase().as_str()))
    }

    pub fn accepts(&self, tool: &Tool) -> bool {
        let name = tool.normalized_name();
        if self.is_excluded(&name) {
            return false;
        }
        self.priority
            .iter()
            .chain(self.allowed.iter())
            .any(|needle| name.contains(needle.to_lowercase().as_str()))
            || self.allowed_kinds.iter().any(|kind| tool.is_kind(kind))
    }

    /// Best hotbar slot: priority order first, then the first acceptable tool.
    pub fn find_slot(&self, hotbar: &[Option<Tool>]) -> Option<usize> {
        let slots = || {
            hotbar
                .iter()
                .take(HOTBAR_SLOTS)
                .enumerate()
                .filter_map(|(slot, tool)| tool.as_ref().map(|tool| (slot, tool)))
        };
        let ranked = slots()
            .filter_map(|(slot, tool)| self.rank(tool).map(|rank| (rank, slot)))
            .min_by_key(|(rank, slot)| (*rank, *slot));
        if let Some((_, slot)) = ranked {
            return Some(slot);
        }
        slots()
            .find(|(_, tool)| self.accepts(tool))
            .map(|(slot, _)| slot)
    }
}

pub fn fishing_rod_slot(hotbar: &[Option<Tool>]) -> Option<usize> {
    hotbar
        .iter()
        .take(HOTBAR_SLOTS)
        .position(|tool| tool.as_ref().is_some_and(Tool::is_fishing_rod))
}

pub fn named_slot(hotbar: &[Option<Tool>], name: &str) -> Option<usize> {
    let needle = name.to_lowercase();
    hotbar.iter().take(HOTBAR_SLOTS).position(|tool| {
        tool.as_ref()
            .is_some_and(|tool| tool.normalized_name().contains(needle.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotbar(names: &[(&str, Option<&str>)]) -> Vec<Option<Tool>> {
        names
            .iter()
            .map(|(name, kind)| {
                if name.is_empty() {
                    None
                } else {
                    Some(Tool::new(*name, *kind))
                }
            })
            .collect()
    }

    #[test]
    fn priority_beats_slot_order() {
        let policy = ToolPolicy::named(["hyperion", "fire veil"]);
        let bar = hotbar(&[
            ("Fishing Rod", Some("fishing_rod")),
            ("Fire Veil Wand", None),
            ("\u{a7}6Heroic Hyperion", Some("sword")),
        ]);
        assert_eq!(policy.find_slot(&bar), Some(2));
    }

    #[test]
    fn kinds_are_a_fallback_and_exclusions_win() {
        let policy = ToolPolicy {
            allowed: vec!["katana".to_string()],
            allowed_kinds: vec!["sword".to_string()],
            excluded: vec!["hyperion".to_string()],
            ..ToolPolicy::default()
        };
        let bar = hotbar(&[("Hyperion", Some("sword")), ("", None), ("Iron Sword", Some("sword"))]);
        assert_eq!(policy.find_slot(&bar), Some(2));
        assert!(!policy.accepts(&Tool::new("Hyperion", Some("sword"))));
        assert!(policy.accepts(&Tool::new("Volcanic Katana", None)));
    }

    #[test]
    fn finds_rods_and_named_tools() {
        let bar = hotbar(&[("Hyperion", None), ("Rod of the Sea", None), ("Prime Huntaxe", None)]);
        assert_eq!(fishing_rod_slot(&bar), Some(1));
        assert_eq!(named_slot(&bar, "Prime Huntaxe"), Some(2));
        assert_eq!(named_slot(&bar, "Black Hole"), None);
    }
}
