use serde::{Deserialize, Serialize};

use crate::constants::{DEGENERATE_HORIZONTAL, PITCH_MAX, PITCH_MIN};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, factor: f64) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn offset_y(self, dy: f64) -> Vec3 {
        Vec3::new(self.x, self.y + dy, self.z)
    }

    pub fn distance(self, other: Vec3) -> f64 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(self, other: Vec3) -> f64 {
        let d = self.sub(other);
        d.x * d.x + d.y * d.y + d.z * d.z
    }

    pub fn horizontal_distance(self, other: Vec3) -> f64 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Orientation in degrees. Yaw lives in `(-180, 180]`, pitch in `[-90, 90]`
/// with positive pitch looking down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub yaw: f64,
    pub pitch: f64,
}

impl Rotation {
    pub fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }

    /// Wraps yaw and clamps pitch into their canonical ranges.
    pub fn normalized(self) -> Self {
        Self {
            yaw: wrap_degrees(self.yaw),
            pitch: self.pitch.clamp(PITCH_MIN, PITCH_MAX),
        }
    }

    /// Unit facing vector for this orientation.
    pub fn direction(self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        Vec3::new(-yaw.sin() * pitch.cos(), -pitch.sin(), yaw.cos() * pitch.cos())
    }
}

/// Axis-aligned box anchored at an object's feet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn around(position: Vec3, half_width: f64, height: f64) -> Self {
        Self {
            min: Vec3::new(position.x - half_width, position.y, position.z - half_width),
            max: Vec3::new(
                position.x + half_width,
                position.y + height,
                position.z + half_width,
            ),
        }
    }

    pub fn expand(self, horizontal: f64, vertical: f64) -> Self {
        Self {
            min: Vec3::new(
                self.min.x - horizontal,
                self.min.y - vertical,
                self.min.z - horizontal,
            ),
            max: Vec3::new(
                self.max.x + horizontal,
                self.max.y + vertical,
                self.max.z + horizontal,
            ),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// Wraps any angle in degrees into `(-180, 180]`.
pub fn wrap_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let mut wrapped = degrees % 360.0;
    if wrapped <= -180.0 {
        wrapped += 360.0;
    } else if wrapped > 180.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Signed shortest-path yaw change from `from` to `to`.
pub fn shortest_yaw_delta(from: f64, to: f64) -> f64 {
    wrap_degrees(to - from)
}

/// Orientation an eye at `eye` needs to look at `point`. `None` when the point
/// is almost straight above or below, where yaw is undefined.
pub fn aim_angles(eye: Vec3, point: Vec3) -> Option<Rotation> {
    let dx = point.x - eye.x;
    let dy = point.y - eye.y;
    let dz = point.z - eye.z;
    let horizontal = (dx * dx + dz * dz).sqrt();
    if horizontal < DEGENERATE_HORIZONTAL {
        return None;
    }
    let yaw = dz.atan2(dx).to_degrees() - 90.0;
    let pitch = -dy.atan2(horizontal).to_degrees();
    Some(Rotation::new(yaw, pitch).normalized())
}
