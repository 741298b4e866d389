pub mod config;
pub mod constants;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod host;
pub mod input;
pub mod label;
pub mod planner;
pub mod proxy;
pub mod rng;
pub mod rotation;
pub mod scheduler;
pub mod selector;
pub mod session;
pub mod strategy;
pub mod timer;
pub mod tools;
pub mod world;

pub use config::EngineConfig;
pub use error::{ConfigError, HostError};
pub use feature::{Feature, FeatureId, Phase, TickContext, ToolLease};
pub use host::HostControls;
pub use input::MouseButton;
pub use rng::{Jitter, SeededRng, SequenceJitter};
pub use scheduler::{FeatureStatus, Scheduler};
pub use world::{ObjectId, ObjectKind, Observer, Tool, WorldObject, WorldSnapshot};
