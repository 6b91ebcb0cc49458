//! # whistle-types
//!
//! Shared geometry and wire structures for the direction whistle tester.
//!
//! These types are used by:
//! - `tester`: validating inbound SPL standard messages and scoring whistle reports
//! - `whistle-simulator`: encoding whistle reports the way a robot team would
//!
//! ## Coordinate Conventions
//!
//! - **Field frame**: origin at the field center, X towards the opponent goal, Y to the left
//! - All lengths in meters, all angles in radians unless a name says otherwise
//! - Angles are kept normalized to [-π, π)

use std::f32::consts::PI;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

pub mod spl_message;

pub use spl_message::{decode_whistle_report, MessageRejection, SplStandardMessage};

// ── Angles ────────────────────────────────────────────────────────────────────

/// Normalizes an angle to [-π, π).
pub fn normalize_angle(angle: f32) -> f32 {
    if (-PI..PI).contains(&angle) {
        return angle;
    }
    let wrapped = angle - (angle / (2.0 * PI)).trunc() * 2.0 * PI;
    if wrapped >= PI {
        wrapped - 2.0 * PI
    } else if wrapped < -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

// ── 2D Vector ─────────────────────────────────────────────────────────────────

/// 2D vector (meters, field frame)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2D {
    pub x: f32,
    pub y: f32,
}

impl Vector2D {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length
    pub fn norm(&self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn squared_norm(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Polar angle, `atan2(y, x)`
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Unit vector at `angle` scaled to `length`
    pub fn polar(length: f32, angle: f32) -> Self {
        Self::new(length * angle.cos(), length * angle.sin())
    }
}

impl Sub for Vector2D {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add for Vector2D {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Mul<f32> for Vector2D {
    type Output = Self;
    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s)
    }
}

impl Neg for Vector2D {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

// ── 2D Pose ───────────────────────────────────────────────────────────────────

/// Robot pose on the field. `rotation` is always normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pose2D {
    pub rotation: f32,
    pub translation: Vector2D,
}

impl Pose2D {
    pub fn new(rotation: f32, x: f32, y: f32) -> Self {
        Self {
            rotation: normalize_angle(rotation),
            translation: Vector2D::new(x, y),
        }
    }

    /// Builds a pose from a heading in degrees, as found in the pose config files.
    pub fn from_degrees(rotation_deg: f32, x: f32, y: f32) -> Self {
        Self::new(rotation_deg.to_radians(), x, y)
    }
}

// ── Field ─────────────────────────────────────────────────────────────────────

/// Half length of the field (meters); |x| below this is on the field
pub const FIELD_HALF_LENGTH: f32 = 5.2;
/// Half width of the field (meters); |y| below this is on the field
pub const FIELD_HALF_WIDTH: f32 = 3.7;

/// Whether `location` lies on the field whose center is the origin.
pub fn is_on_field(location: Vector2D) -> bool {
    location.x.abs() < FIELD_HALF_LENGTH && location.y.abs() < FIELD_HALF_WIDTH
}

// ── Whistle Report ────────────────────────────────────────────────────────────

/// A team's claim about where the whistle was blown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WhistleReport {
    /// Whether the whistle was blown on the field the robots stand on
    pub on_same_field: bool,
    /// Location relative to the center of the field the robots believe they are on (meters)
    pub location: Vector2D,
}
