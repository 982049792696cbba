// src/ahrs/quaternion.rs

//! Quaternion and three-vector types with the attitude conversions the
//! estimator needs.

use super::{InvSqrt, RAD_TO_DEG};
use core::f32::consts::PI;
use core::ops::{Add, Mul, Sub};

/// A three-component vector.
///
/// Used for accelerometer and gyro samples, the gravity direction, and
/// roll/pitch/yaw triples (`x` = roll, `y` = pitch, `z` = yaw).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    /// X component, or roll.
    pub x: f32,
    /// Y component, or pitch.
    pub y: f32,
    /// Z component, or yaw.
    pub z: f32,
}

impl Vector3 {
    /// All components zero.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a vector from its components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Creates a vector from an `[x, y, z]` array.
    pub const fn from_array(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    /// Returns the components as an `[x, y, z]` array.
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Squared Euclidean length.
    pub fn norm_squared(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// `true` when every component is exactly zero.
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// Scales every component by `k`.
    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vector3 {
    type Output = Self;

    fn mul(self, k: f32) -> Self {
        self.scale(k)
    }
}

/// Orientation quaternion `{w, x, y, z}`, unit norm by convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    /// Scalar part.
    pub w: f32,
    /// First vector component.
    pub x: f32,
    /// Second vector component.
    pub y: f32,
    /// Third vector component.
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    /// No rotation.
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0);

    /// Creates a quaternion from its components.
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// Rotation of `angle` radians about the unit `axis`.
    pub fn from_axis_angle(axis: Vector3, angle: f32) -> Self {
        let (s, c) = (0.5 * angle).sin_cos();
        Self::new(c, axis.x * s, axis.y * s, axis.z * s)
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f32 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Returns this quaternion scaled to unit norm.
    pub fn normalized(self, inv_sqrt: InvSqrt) -> Self {
        let n = inv_sqrt
            .apply(self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z);
        Self::new(self.w * n, self.x * n, self.y * n, self.z * n)
    }

    /// Direction of gravity in the body frame, extracted algebraically.
    pub fn gravity(&self) -> Vector3 {
        let Self { w, x, y, z } = *self;
        Vector3::new(
            2.0 * (x * z - w * y),
            2.0 * (w * x + y * z),
            w * w - x * x - y * y + z * z,
        )
    }

    /// Roll, pitch and yaw in degrees, given the gravity vector from
    /// [`Quaternion::gravity`].
    ///
    /// Pitch is taken from the gravity vector, so it only spans ±90° on its
    /// own. When gravity points up in the body frame (`gravity.z < 0`, the
    /// vehicle is past vertical) pitch is mirrored around ±90° to stay
    /// continuous across the boundary.
    pub fn euler_degrees(&self, gravity: Vector3) -> Vector3 {
        let Self { w, x, y, z } = *self;

        let roll = gravity.y.atan2(gravity.z);
        let mut pitch =
            -gravity.x.atan2((gravity.y * gravity.y + gravity.z * gravity.z).sqrt());
        let yaw = (2.0 * x * y - 2.0 * w * z).atan2(2.0 * w * w + 2.0 * x * x - 1.0);

        if gravity.z < 0.0 {
            pitch = if pitch > 0.0 { PI - pitch } else { -PI - pitch };
        }

        Vector3::new(roll, pitch, yaw) * RAD_TO_DEG
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ahrs::DEG_TO_RAD;
    use crate::test_utils::*;

    const X_AXIS: Vector3 = Vector3::new(1.0, 0.0, 0.0);
    const Y_AXIS: Vector3 = Vector3::new(0.0, 1.0, 0.0);

    /// Level attitude has gravity straight down the body z axis.
    #[test]
    fn test_identity_gravity_and_angles() {
        let q = Quaternion::IDENTITY;
        let g = q.gravity();
        assert!(vector_within(Vector3::new(0.0, 0.0, 1.0), g, TEST_TOLERANCE));
        assert!(vector_within(Vector3::ZERO, q.euler_degrees(g), TEST_TOLERANCE));
    }

    /// A pure roll rotation reads back as the same roll angle.
    #[test]
    fn test_roll_round_trip() {
        for &deg in &[-60.0_f32, -20.0, 5.0, 45.0, 80.0] {
            let q = Quaternion::from_axis_angle(X_AXIS, deg * DEG_TO_RAD);
            let angles = q.euler_degrees(q.gravity());
            assert!(
                value_within(deg, angles.x, FILTER_TOLERANCE),
                "Roll should read {} but was {}",
                deg,
                angles.x
            );
            assert!(value_within(0.0, angles.y, FILTER_TOLERANCE));
        }
    }

    /// A pure pitch rotation reads back as the same pitch angle below 90°.
    #[test]
    fn test_pitch_round_trip() {
        for &deg in &[-70.0_f32, -10.0, 30.0, 85.0] {
            let q = Quaternion::from_axis_angle(Y_AXIS, deg * DEG_TO_RAD);
            let angles = q.euler_degrees(q.gravity());
            assert!(
                value_within(deg, angles.y, FILTER_TOLERANCE),
                "Pitch should read {} but was {}",
                deg,
                angles.y
            );
        }
    }

    /// Past vertical the quadrant correction keeps pitch continuous.
    #[test]
    fn test_pitch_past_vertical() {
        let q = Quaternion::from_axis_angle(Y_AXIS, 120.0 * DEG_TO_RAD);
        let g = q.gravity();
        assert!(g.z < 0.0, "Gravity should point up when inverted past 90°.");
        let angles = q.euler_degrees(g);
        assert!(value_within(120.0, angles.y, FILTER_TOLERANCE));

        let q = Quaternion::from_axis_angle(Y_AXIS, -120.0 * DEG_TO_RAD);
        let angles = q.euler_degrees(q.gravity());
        assert!(value_within(-120.0, angles.y, FILTER_TOLERANCE));
    }

    /// Normalization restores unit norm.
    #[test]
    fn test_normalized() {
        let q = Quaternion::new(2.0, 0.0, 0.0, 0.0).normalized(InvSqrt::Exact);
        assert!(quaternion_within(Quaternion::IDENTITY, q, TEST_TOLERANCE));

        let q = Quaternion::new(0.3, -0.4, 1.2, 0.1).normalized(InvSqrt::Fast);
        assert!(value_within(1.0, q.norm(), 2e-3));
    }
}
