//! Math utilities and types
//!
//! Provides the 2D math types used by the collision engine. Coordinates are
//! screen coordinates: x grows to the right and y grows downward, so an angle
//! of 90 degrees points straight down.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use nalgebra::Vector2;

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// Distance used to keep a mover just short of the surface it would touch
pub const VERY_SMALL_NUMBER: f32 = 0.00001;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// The neighbouring representable value above (`up`) or below `value`
    ///
    /// NaN and infinities are returned unchanged.
    pub fn next_float(value: f32, up: bool) -> f32 {
        if !value.is_finite() {
            return value;
        }
        if value == 0.0 {
            let smallest = f32::from_bits(1);
            return if up { smallest } else { -smallest };
        }
        let bits = value.to_bits();
        // Magnitude grows when stepping away from zero
        if (value > 0.0) == up {
            f32::from_bits(bits + 1)
        } else {
            f32::from_bits(bits - 1)
        }
    }
}

/// A direction in degrees, always normalized to `[0, 360)`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Angle(f32);

impl Angle {
    /// Pointing right (+x)
    pub const RIGHT: Angle = Angle(0.0);
    /// Pointing down (+y)
    pub const DOWN: Angle = Angle(90.0);
    /// Pointing left (-x)
    pub const LEFT: Angle = Angle(180.0);
    /// Pointing up (-y)
    pub const UP: Angle = Angle(270.0);

    /// Create a normalized angle from any finite number of degrees
    pub fn new(degrees: f32) -> Self {
        let mut value = degrees % 360.0;
        if value < 0.0 {
            value += 360.0;
        }
        // -tiny % 360 + 360 rounds up to 360 in f32
        if value >= 360.0 {
            value = 0.0;
        }
        Self(value)
    }

    /// Angle from one point toward another
    pub fn from_points(from: Point2, to: Point2) -> Self {
        let delta = to - from;
        Self::new(utils::rad_to_deg(delta.y.atan2(delta.x)))
    }

    /// The value in degrees
    pub fn value(self) -> f32 {
        self.0
    }

    /// The value in radians
    pub fn to_radians(self) -> f32 {
        utils::deg_to_rad(self.0)
    }

    /// Rotate by `degrees` (may be negative)
    ///
    /// The delta is normalized before it is applied so that adding a whole
    /// turn returns exactly the same angle.
    #[must_use]
    pub fn add(self, degrees: f32) -> Self {
        Self::new(self.0 + Self::new(degrees).0)
    }

    /// The angle pointing the other way
    #[must_use]
    pub fn opposite(self) -> Self {
        self.add(180.0)
    }

    /// Shortest angular distance to `other`, in `[0, 180]`
    pub fn diff_shortest(self, other: Angle) -> f32 {
        let diff = (self.0 - other.0).abs();
        if diff > 180.0 {
            360.0 - diff
        } else {
            diff
        }
    }

    /// Snap to the nearest multiple of `step` degrees
    #[must_use]
    pub fn round_to_nearest(self, step: f32) -> Self {
        if step <= 0.0 {
            return self;
        }
        Self::new((self.0 / step).round() * step)
    }

    /// Unit vector pointing in this direction
    ///
    /// The four cardinal directions are returned exactly so that axis-aligned
    /// movement never drifts off its axis.
    pub fn unit_vector(self) -> Vec2 {
        match self.0 {
            v if v == 0.0 => Vec2::new(1.0, 0.0),
            v if v == 90.0 => Vec2::new(0.0, 1.0),
            v if v == 180.0 => Vec2::new(-1.0, 0.0),
            v if v == 270.0 => Vec2::new(0.0, -1.0),
            _ => {
                let radians = self.to_radians();
                Vec2::new(radians.cos(), radians.sin())
            }
        }
    }
}

impl From<f32> for Angle {
    fn from(degrees: f32) -> Self {
        Self::new(degrees)
    }
}

impl From<Angle> for f32 {
    fn from(angle: Angle) -> Self {
        angle.0
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°", self.0)
    }
}

/// Move a point `distance` units in the direction of `angle`
pub fn offset_by_angle(point: Point2, angle: Angle, distance: f32) -> Point2 {
    point + angle.unit_vector() * distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_angle_normalization() {
        for raw in [-1080.5, -360.0, -90.0, -0.000_01, 0.0, 45.0, 359.999, 360.0, 725.0, 1e7] {
            let angle = Angle::new(raw);
            assert!(angle.value() >= 0.0 && angle.value() < 360.0, "{raw} -> {angle}");
        }
        assert_eq!(Angle::new(-90.0), Angle::UP);
        assert_eq!(Angle::new(720.0), Angle::RIGHT);
    }

    #[test]
    fn test_next_float_steps_one_ulp() {
        use utils::next_float;

        let below = next_float(1000.0, false);
        assert!(below < 1000.0);
        assert_eq!(next_float(below, true), 1000.0);
        assert!(next_float(-3.5, true) > -3.5);
        assert!(next_float(-3.5, false) < -3.5);
        assert!(next_float(0.0, true) > 0.0 && next_float(0.0, false) < 0.0);
        assert!(next_float(f32::NAN, true).is_nan());
    }

    #[test]
    fn test_full_turn_is_identity() {
        for raw in [0.1, 17.3, 90.0, 200.7, 359.9, -45.25] {
            let angle = Angle::new(raw);
            assert_eq!(angle.add(360.0), angle);
            assert_eq!(angle.add(-360.0), angle);
        }
    }

    #[test]
    fn test_opposite_and_diff() {
        assert_eq!(Angle::RIGHT.opposite(), Angle::LEFT);
        assert_eq!(Angle::DOWN.opposite(), Angle::UP);
        assert_abs_diff_eq!(Angle::new(350.0).diff_shortest(Angle::new(10.0)), 20.0, epsilon = 1e-4);
        assert_abs_diff_eq!(Angle::new(90.0).diff_shortest(Angle::new(270.0)), 180.0, epsilon = 1e-4);
    }

    #[test]
    fn test_round_to_nearest() {
        assert_eq!(Angle::new(44.0).round_to_nearest(45.0), Angle::new(45.0));
        assert_eq!(Angle::new(359.0).round_to_nearest(90.0), Angle::RIGHT);
    }

    #[test]
    fn test_from_points_uses_screen_coordinates() {
        let origin = Point2::new(0.0, 0.0);
        assert_abs_diff_eq!(Angle::from_points(origin, Point2::new(0.0, 5.0)).value(), 90.0, epsilon = 1e-4);
        assert_abs_diff_eq!(Angle::from_points(origin, Point2::new(-3.0, 0.0)).value(), 180.0, epsilon = 1e-4);
    }

    #[test]
    fn test_offset_by_angle_cardinals_are_exact() {
        let start = Point2::new(2.0, 3.0);
        assert_eq!(offset_by_angle(start, Angle::LEFT, 2.0), Point2::new(0.0, 3.0));
        assert_eq!(offset_by_angle(start, Angle::DOWN, 1.5), Point2::new(2.0, 4.5));
    }
}
