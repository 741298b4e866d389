use std::fmt;

/// Failure reported by the host when an actuation request cannot be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostError {
    SlotOutOfRange { slot: usize, slots: usize },
    InputRejected { reason: String },
    Unavailable,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotOutOfRange { slot, slots } => {
                write!(f, "slot {slot} out of range (hotbar has {slots} slots)")
            }
            Self::InputRejected { reason } => write!(f, "input rejected: {reason}"),
            Self::Unavailable => write!(f, "host unavailable"),
        }
    }
}

impl std::error::Error for HostError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    InvalidPattern { pattern: String, reason: String },
    UnknownStrategy { name: String },
    UnknownFeature { name: String },
    OutOfRange { field: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "invalid label pattern '{pattern}': {reason}")
            }
            Self::UnknownStrategy { name } => write!(f, "unknown strategy '{name}'"),
            Self::UnknownFeature { name } => write!(f, "unknown feature '{name}'"),
            Self::OutOfRange { field, value } => {
                write!(f, "config field {field} out of range: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
