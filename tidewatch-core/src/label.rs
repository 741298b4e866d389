//! Pure helpers for reading marker labels: formatting removal, status
//! decoding (`12.5k/20k`), and configurable label filters.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;

static STATUS_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"([0-9][0-9,]*(?:\.[0-9]+)?[kKmM]?)\s*/\s*([0-9][0-9,]*(?:\.[0-9]+)?[kKmM]?)").ok()
});

const FORMAT_PREFIX: char = '\u{a7}';

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusValue {
    pub current: f64,
    pub max: f64,
}

impl StatusValue {
    pub fn is_live(&self) -> bool {
        self.current > 0.0
    }

    pub fn fraction(&self) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        self.current / self.max
    }
}

/// Removes `§x` formatting codes.
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == FORMAT_PREFIX {
            chars.next();
            continue;
        }
        out.push(ch);
    }
    out
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Parses `1,250`, `12.5k`, or `3M` into a number. `None` for anything else.
pub fn parse_abbreviated(token: &str) -> Option<f64> {
    let cleaned: String = token.trim().chars().filter(|ch| *ch != ',').collect();
    let (digits, multiplier) = match cleaned.chars().last()? {
        'k' | 'K' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'm' | 'M' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<f64>().ok()? * multiplier;
    value.is_finite().then_some(value)
}

/// Decodes the first `current/max` pair found in a label.
pub fn decode_status(label: &str) -> Option<StatusValue> {
    let plain = strip_formatting(label);
    let pattern = STATUS_PATTERN.as_ref()?;
    let captures = pattern.captures(&plain)?;
    let current = parse_abbreviated(captures.get(1)?.as_str())?;
    let max = parse_abbreviated(captures.get(2)?.as_str())?;
    Some(StatusValue { current, max })
}

/// Selects which marker labels a feature cares about.
#[derive(Clone, Debug)]
pub enum LabelFilter {
    /// Matches when any of the substrings appears (case-insensitive).
    Substrings(Vec<String>),
    Pattern(Regex),
}

impl LabelFilter {
    pub fn substrings<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Substrings(
            needles
                .into_iter()
                .map(|needle| needle.as_ref().to_lowercase())
                .filter(|needle| !needle.is_empty())
                .collect(),
        )
    }

    /// Case-insensitive regular expression filter.
    pub fn pattern(source: &str) -> Result<Self, ConfigError> {
        let compiled = Regex::new(&format!("(?i){source}")).map_err(|err| {
            ConfigError::InvalidPattern {
                pattern: source.to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self::Pattern(compiled))
    }

    pub fn matches(&self, label: &str) -> bool {
        let plain = strip_formatting(label);
        match self {
            Self::Substrings(needles) => {
                let lowered = plain.to_lowercase();
                needles.iter().any(|needle| lowered.contains(needle.as_str()))
            }
            Self::Pattern(regex) => regex.is_match(&plain),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_abbreviated_status() {
        let status = decode_status("[Lv90] Water Hydra 12.5k/20k\u{2764}").expect("status");
        assert_eq!(status.current, 12_500.0);
        assert_eq!(status.max, 20_000.0);
    }

    #[test]
    fn decodes_plain_status() {
        let status = decode_status("Spike 300/300").expect("status");
        assert_eq!(status.current, 300.0);
        assert_eq!(status.max, 300.0);
        assert!(status.is_live());
    }

    #[test]
    fn unparseable_status_is_absent() {
        assert_eq!(decode_status("abc"), None);
        assert_eq!(decode_status("Sea Walker"), None);
    }

    #[test]
    fn strips_formatting_before_decoding() {
        let status = decode_status("\u{a7}c\u{a7}lBezal \u{a7}a1,250,000\u{a7}f/\u{a7}a2.5M").expect("status");
        assert_eq!(status.current, 1_250_000.0);
        assert_eq!(status.max, 2_500_000.0);
        assert_eq!(strip_formatting("\u{a7}6Hyperion"), "Hyperion");
    }

    #[test]
    fn zero_current_is_not_live() {
        let status = decode_status("Foo 0/500").expect("status");
        assert!(!status.is_live());
    }

    #[test]
    fn parse_abbreviated_rejects_garbage() {
        assert_eq!(parse_abbreviated("k"), None);
        assert_eq!(parse_abbreviated(""), None);
        assert_eq!(parse_abbreviated("1.5m"), Some(1_500_000.0));
    }

    #[test]
    fn filters_match_case_insensitively() {
        let names = LabelFilter::substrings(["Sea Walker", "squid"]);
        assert!(names.matches("[Lv2] sea walker 100/100"));
        assert!(!names.matches("Guardian"));

        let pattern = LabelFilter::pattern(r"spike.*\d+/\d+").expect("pattern");
        assert!(pattern.matches("\u{a7}cSPIKE 30/30"));
        assert!(!pattern.matches("Spike"));
        assert!(LabelFilter::pattern("(").is_err());
    }
}
