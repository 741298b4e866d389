use serde::{Deserialize, Serialize};

use crate::rng::Jitter;

/// Distribution for a humanized delay in ticks: `base` plus a uniform offset in
/// `[-variance, +variance]`, rounded and clamped to `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimerSpec {
    pub base: f64,
    pub variance: f64,
    pub min: u32,
    pub max: u32,
}

impl TimerSpec {
    pub const fn new(base: f64, variance: f64, min: u32, max: u32) -> Self {
        Self {
            base,
            variance,
            min,
            max,
        }
    }

    /// Variance expressed as a fraction of the base.
    pub fn proportional(base: u32, fraction: f64, min: u32, max: u32) -> Self {
        let base = f64::from(base);
        Self::new(base, base * fraction, min, max)
    }

    pub const fn fixed(ticks: u32) -> Self {
        Self::new(ticks as f64, 0.0, ticks, ticks)
    }

    pub fn draw(&self, jitter: &mut dyn Jitter) -> u32 {
        let offset = (jitter.unit() * 2.0 - 1.0) * self.variance;
        let value = (self.base + offset).round();
        let (low, high) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if !value.is_finite() || value <= f64::from(low) {
            return low;
        }
        if value >= f64::from(high) {
            return high;
        }
        value as u32
    }
}

/// Countdown in ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HumanTimer {
    remaining: u32,
}

impl HumanTimer {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn ticks(remaining: u32) -> Self {
        Self { remaining }
    }

    pub fn start(spec: &TimerSpec, jitter: &mut dyn Jitter) -> Self {
        Self::ticks(spec.draw(jitter))
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }

    /// Consumes one tick of delay. Returns `true` once nothing is left to wait,
    /// so a timer of `n` holds the caller back for exactly `n` ticks.
    pub fn poll(&mut self) -> bool {
        if self.remaining == 0 {
            return true;
        }
        self.remaining -= 1;
        false
    }

    pub fn clear(&mut self) {
        self.remaining = 0;
    }
}
