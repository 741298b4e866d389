//! Run/break session planner: fishes for a fixed stretch, then pauses for a
//! random break, and repeats.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PlannerConfig;
use crate::rng::Jitter;

const MINUTE_MS: u64 = 60_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerState {
    #[default]
    Stopped,
    Running,
    OnBreak,
}

impl PlannerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::OnBreak => "on_break",
        }
    }
}

/// What the scheduler should do to the fishing feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlannerAction {
    StartFeatures,
    StopFeatures,
}

#[derive(Clone, Debug)]
pub struct RunPlanner {
    config: PlannerConfig,
    state: PlannerState,
    deadline_ms: u64,
    breaks: u64,
}

impl RunPlanner {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            config: config.clone(),
            state: PlannerState::Stopped,
            deadline_ms: 0,
            breaks: 0,
        }
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    pub fn breaks(&self) -> u64 {
        self.breaks
    }

    pub fn start(&mut self, now_ms: u64) {
        self.state = PlannerState::Running;
        self.deadline_ms = now_ms + self.run_ms();
        info!(run_minutes = self.config.run_minutes, "planner running");
    }

    fn run_ms(&self) -> u64 {
        self.config.run_minutes.max(1) * MINUTE_MS
    }

    fn break_ms(&self, jitter: &mut dyn Jitter) -> u64 {
        let (low, high) = if self.config.break_min_minutes <= self.config.break_max_minutes {
            (self.config.break_min_minutes, self.config.break_max_minutes)
        } else {
            (self.config.break_max_minutes, self.config.break_min_minutes)
        };
        jitter.range_inclusive(low, high) * MINUTE_MS
    }

    /// Advances the schedule. An armed planner starts itself on the first tick.
    pub fn tick(&mut self, now_ms: u64, jitter: &mut dyn Jitter) -> Option<PlannerAction> {
        match self.state {
            PlannerState::Stopped => {
                if self.config.enabled {
                    self.start(now_ms);
                }
                None
            }
            PlannerState::Running if now_ms >= self.deadline_ms => {
                let pause = self.break_ms(jitter);
                self.state = PlannerState::OnBreak;
                self.deadline_ms = now_ms + pause;
                self.breaks += 1;
                info!(break_ms = pause, "planner break");
                Some(PlannerAction::StopFeatures)
            }
            PlannerState::OnBreak if now_ms >= self.deadline_ms => {
                self.start(now_ms);
                Some(PlannerAction::StartFeatures)
            }
            PlannerState::Running | PlannerState::OnBreak => None,
        }
    }

    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        match self.state {
            PlannerState::Stopped => None,
            _ => Some(self.deadline_ms.saturating_sub(now_ms)),
        }
    }

    pub fn status_text(&self, now_ms: u64) -> String {
        let Some(remaining) = self.remaining_ms(now_ms) else {
            return "Stopped".to_string();
        };
        let seconds = remaining / 1_000;
        let clock = format!("{:02}:{:02}", seconds / 60, seconds % 60);
        match self.state {
            PlannerState::OnBreak => format!("On break ({clock} remaining)"),
            _ => format!("Running ({clock} remaining)"),
        }
    }
}
