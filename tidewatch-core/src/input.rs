//! Rate-limited click dispatch with deferred release.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{HOLD_MAX_MS, HOLD_MIN_MS};
use crate::host::HostControls;
use crate::rng::Jitter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
}

impl MouseButton {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FireOutcome {
    Pressed,
    RateLimited,
    Failed,
}

impl FireOutcome {
    pub fn pressed(self) -> bool {
        self == Self::Pressed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingRelease {
    button: MouseButton,
    due_ms: u64,
}

/// Presses immediately and releases after a randomized hold. The release is
/// emitted by [`InputDispatcher::pump`], which the host calls at a finer step
/// than the tick.
#[derive(Clone, Debug)]
pub struct InputDispatcher {
    min_interval_ms: u64,
    hold_min_ms: u64,
    hold_max_ms: u64,
    last_fired_ms: Option<u64>,
    pending: Option<PendingRelease>,
}

impl InputDispatcher {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            hold_min_ms: HOLD_MIN_MS,
            hold_max_ms: HOLD_MAX_MS,
            last_fired_ms: None,
            pending: None,
        }
    }

    pub fn with_hold(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.hold_min_ms = min_ms.min(max_ms);
        self.hold_max_ms = max_ms.max(min_ms);
        self
    }

    pub fn last_fired_ms(&self) -> Option<u64> {
        self.last_fired_ms
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn ready(&self, now_ms: u64) -> bool {
        self.last_fired_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.min_interval_ms)
    }

    pub fn fire(
        &mut self,
        button: MouseButton,
        now_ms: u64,
        host: &mut dyn HostControls,
        jitter: &mut dyn Jitter,
    ) -> FireOutcome {
        if !self.ready(now_ms) {
            debug!(button = button.as_str(), now_ms, "input dropped by rate limit");
            return FireOutcome::RateLimited;
        }
        self.flush(host);
        if let Err(err) = host.press(button) {
            debug!(button = button.as_str(), %err, "press failed");
            return FireOutcome::Failed;
        }
        let hold = jitter.range_inclusive(self.hold_min_ms, self.hold_max_ms);
        self.pending = Some(PendingRelease {
            button,
            due_ms: now_ms + hold,
        });
        self.last_fired_ms = Some(now_ms);
        FireOutcome::Pressed
    }

    /// Emits the scheduled release once it is due. Returns `true` if one went out.
    pub fn pump(&mut self, now_ms: u64, host: &mut dyn HostControls) -> bool {
        match self.pending {
            Some(pending) if pending.due_ms <= now_ms => {
                self.pending = None;
                if let Err(err) = host.release(pending.button) {
                    debug!(button = pending.button.as_str(), %err, "release failed");
                }
                true
            }
            _ => false,
        }
    }

    /// Releases any held button right away.
    pub fn flush(&mut self, host: &mut dyn HostControls) {
        if let Some(pending) = self.pending.take() {
            if let Err(err) = host.release(pending.button) {
                debug!(button = pending.button.as_str(), %err, "release failed");
            }
        }
    }

    pub fn reset(&mut self, host: &mut dyn HostControls) {
        self.flush(host);
        self.last_fired_ms = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BurstStep {
    Clicked,
    Waiting,
    Done,
}

/// A fixed number of clicks spread over ticks. Each call to [`ClickBurst::step`]
/// is one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClickBurst {
    button: MouseButton,
    remaining: u32,
    gap_ticks: u32,
    wait: u32,
    fired: u32,
}

impl ClickBurst {
    /// `gap_ticks` is the spacing between consecutive clicks, at least one tick.
    pub fn new(button: MouseButton, count: u32, gap_ticks: u32) -> Self {
        Self {
            button,
            remaining: count,
            gap_ticks: gap_ticks.max(1),
            wait: 0,
            fired: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }

    pub fn fired(&self) -> u32 {
        self.fired
    }

    pub fn step(
        &mut self,
        dispatcher: &mut InputDispatcher,
        now_ms: u64,
        host: &mut dyn HostControls,
        jitter: &mut dyn Jitter,
    ) -> BurstStep {
        if self.remaining == 0 {
            return BurstStep::Done;
        }
        if self.wait > 0 {
            self.wait -= 1;
            return BurstStep::Waiting;
        }
        if !dispatcher.fire(self.button, now_ms, host, jitter).pressed() {
            return BurstStep::Waiting;
        }
        self.remaining -= 1;
        self.fired += 1;
        self.wait = self.gap_ticks - 1;
        BurstStep::Clicked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostEvent, RecordingHost};
    use crate::rng::SequenceJitter;

    #[test]
    fn fire_is_rate_limited() {
        let mut host = RecordingHost::new();
        let mut jitter = SequenceJitter::low();
        let mut dispatcher = InputDispatcher::new(100);
        assert_eq!(
            dispatcher.fire(MouseButton::Right, 1_000, &mut host, &mut jitter),
            FireOutcome::Pressed
        );
        assert_eq!(
            dispatcher.fire(MouseButton::Right, 1_050, &mut host, &mut jitter),
            FireOutcome::RateLimited
        );
        assert_eq!(
            dispatcher.fire(MouseButton::Right, 1_100, &mut host, &mut jitter),
            FireOutcome::Pressed
        );
        assert_eq!(host.presses(), 2);
    }

    #[test]
    fn release_is_deferred_until_pumped() {
        let mut host = RecordingHost::new();
        let mut jitter = SequenceJitter::low();
        let mut dispatcher = InputDispatcher::new(0);
        dispatcher.fire(MouseButton::Left, 0, &mut host, &mut jitter);
        assert_eq!(host.events, vec![HostEvent::Press(MouseButton::Left)]);
        assert!(!dispatcher.pump(5, &mut host));
        assert!(dispatcher.pump(10, &mut host));
        assert_eq!(host.releases(), 1);
        assert!(!dispatcher.has_pending());
    }

    #[test]
    fn hold_stays_within_bounds() {
        let mut host = RecordingHost::new();
        let mut jitter = SequenceJitter::high();
        let mut dispatcher = InputDispatcher::new(0);
        dispatcher.fire(MouseButton::Left, 0, &mut host, &mut jitter);
        assert!(!dispatcher.pump(9, &mut host));
        assert!(dispatcher.pump(30, &mut host));
    }

    #[test]
    fn failures_are_swallowed() {
        let mut host = RecordingHost {
            reject_input: true,
            ..RecordingHost::default()
        };
        let mut jitter = SequenceJitter::low();
        let mut dispatcher = InputDispatcher::new(100);
        assert_eq!(
            dispatcher.fire(MouseButton::Left, 0, &mut host, &mut jitter),
            FireOutcome::Failed
        );
        assert!(dispatcher.ready(1));
        assert!(host.events.is_empty());
    }

    #[test]
    fn next_press_flushes_outstanding_release() {
        let mut host = RecordingHost::new();
        let mut jitter = SequenceJitter::high();
        let mut dispatcher = InputDispatcher::new(0);
        dispatcher.fire(MouseButton::Left, 0, &mut host, &mut jitter);
        dispatcher.fire(MouseButton::Right, 5, &mut host, &mut jitter);
        assert_eq!(
            host.events,
            vec![
                HostEvent::Press(MouseButton::Left),
                HostEvent::Release(MouseButton::Left),
                HostEvent::Press(MouseButton::Right),
            ]
        );
    }

    #[test]
    fn burst_spaces_clicks() {
        let mut host = RecordingHost::new();
        let mut jitter = SequenceJitter::low();
        let mut dispatcher = InputDispatcher::new(0);
        let mut burst = ClickBurst::new(MouseButton::Left, 3, 2);
        let mut steps = Vec::new();
        for tick in 0..7u64 {
            let now = tick * 50;
            dispatcher.pump(now, &mut host);
            steps.push(burst.step(&mut dispatcher, now, &mut host, &mut jitter));
        }
        assert_eq!(
            steps,
            vec![
                BurstStep::Clicked,
                BurstStep::Waiting,
                BurstStep::Clicked,
                BurstStep::Waiting,
                BurstStep::Clicked,
                BurstStep::Done,
                BurstStep::Done,
            ]
        );
        assert_eq!(burst.fired(), 3);
        assert_eq!(host.presses(), 3);
    }
}
