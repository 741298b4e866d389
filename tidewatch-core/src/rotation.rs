use crate::constants::{PITCH_MAX, PITCH_MIN, ROTATION_SPEED_MAX, ROTATION_SPEED_MIN};
use crate::geometry::{aim_angles, shortest_yaw_delta, wrap_degrees, Rotation, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
enum AimGoal {
    Point(Vec3),
    Orientation(Rotation),
}

/// Eases the observer's orientation toward a point or a saved orientation,
/// closing a fixed fraction of the remaining angle every tick.
#[derive(Clone, Debug)]
pub struct RotationController {
    current: Rotation,
    goal: Option<AimGoal>,
    speed: f64,
}

impl RotationController {
    pub fn new(speed: f64) -> Self {
        Self {
            current: Rotation::default(),
            goal: None,
            speed: clamp_speed(speed),
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn current(&self) -> Rotation {
        self.current
    }

    pub fn is_tracking(&self) -> bool {
        self.goal.is_some()
    }

    /// Starts following `point`, taking `from` as the starting orientation.
    pub fn track(&mut self, point: Vec3, from: Rotation) {
        self.current = from.normalized();
        self.goal = Some(AimGoal::Point(point));
    }

    /// Moves the followed point without resetting the interpolation.
    pub fn retarget(&mut self, point: Vec3) {
        self.goal = Some(AimGoal::Point(point));
    }

    /// Eases back toward a saved orientation.
    pub fn return_to(&mut self, origin: Rotation, from: Rotation) {
        self.current = from.normalized();
        self.goal = Some(AimGoal::Orientation(origin.normalized()));
    }

    /// Leaves the orientation where it is.
    pub fn stop_tracking(&mut self) {
        self.goal = None;
    }

    fn desired(&self, eye: Vec3) -> Option<Rotation> {
        match self.goal? {
            AimGoal::Point(point) => aim_angles(eye, point),
            AimGoal::Orientation(rotation) => Some(rotation),
        }
    }

    /// Remaining `(yaw, pitch)` difference to the goal.
    pub fn remaining(&self, eye: Vec3) -> Option<(f64, f64)> {
        let desired = self.desired(eye)?;
        Some((
            shortest_yaw_delta(self.current.yaw, desired.yaw),
            desired.pitch - self.current.pitch,
        ))
    }

    pub fn converged(&self, eye: Vec3, epsilon: f64) -> bool {
        self.remaining(eye)
            .is_some_and(|(yaw, pitch)| yaw.abs() < epsilon && pitch.abs() < epsilon)
    }

    /// Advances one tick. Returns the new orientation to apply, or `None` when
    /// idle or the goal is degenerate.
    pub fn step(&mut self, eye: Vec3) -> Option<Rotation> {
        let (yaw_diff, pitch_diff) = self.remaining(eye)?;
        self.current = Rotation {
            yaw: wrap_degrees(self.current.yaw + yaw_diff * self.speed),
            pitch: (self.current.pitch + pitch_diff * self.speed).clamp(PITCH_MIN, PITCH_MAX),
        };
        Some(self.current)
    }
}

fn clamp_speed(speed: f64) -> f64 {
    if !speed.is_finite() {
        return ROTATION_SPEED_MIN;
    }
    speed.clamp(ROTATION_SPEED_MIN, ROTATION_SPEED_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_toward_point() {
        let mut controller = RotationController::new(0.3);
        let eye = Vec3::new(0.0, 1.62, 0.0);
        controller.track(Vec3::new(-5.0, 1.62, 0.0), Rotation::default());
        let mut last_gap = f64::MAX;
        for _ in 0..40 {
            controller.step(eye).expect("step");
            let (yaw, _) = controller.remaining(eye).expect("remaining");
            assert!(yaw.abs() <= last_gap);
            last_gap = yaw.abs();
        }
        assert!(controller.converged(eye, 0.01));
        assert!((controller.current().yaw - 90.0).abs() < 0.01);
    }

    #[test]
    fn takes_the_short_way_round() {
        let mut controller = RotationController::new(0.5);
        let eye = Vec3::ZERO;
        controller.return_to(Rotation::new(-170.0, 0.0), Rotation::new(170.0, 0.0));
        let next = controller.step(eye).expect("step");
        assert!((next.yaw - 180.0).abs() < 1e-9);
        let next = controller.step(eye).expect("step");
        assert!((next.yaw + 175.0).abs() < 1e-9);
    }

    #[test]
    fn stop_tracking_keeps_orientation() {
        let mut controller = RotationController::new(1.0);
        controller.track(Vec3::new(0.0, 0.0, 5.0), Rotation::new(45.0, 10.0));
        let applied = controller.step(Vec3::ZERO).expect("step");
        controller.stop_tracking();
        assert!(controller.step(Vec3::ZERO).is_none());
        assert_eq!(controller.current(), applied);
    }

    #[test]
    fn speed_is_clamped() {
        assert_eq!(RotationController::new(5.0).speed(), 1.0);
        assert_eq!(RotationController::new(0.0).speed(), 0.1);
        assert_eq!(RotationController::new(f64::NAN).speed(), 0.1);
    }

    #[test]
    fn degenerate_target_is_not_reaimed() {
        let mut controller = RotationController::new(0.3);
        controller.track(Vec3::new(0.0, 10.0, 0.05), Rotation::new(30.0, 0.0));
        assert!(controller.step(Vec3::ZERO).is_none());
        assert_eq!(controller.current().yaw, 30.0);
    }
}
