// src/ahrs/madgwick.rs

//! Gradient-descent orientation filter.
//!
//! Each update integrates the gyro rate into the quaternion and pulls the
//! result toward the attitude implied by the measured gravity direction.
//! The pull strength is `beta`, fixed at construction from the expected
//! gyro error: a small `beta` trusts the gyro (little accelerometer noise,
//! more drift), a large one trusts the accelerometer.

use super::{InvSqrt, Quaternion, Vector3, DEG_TO_RAD};

/// Gradient magnitude under which the filter reports itself converged.
const CONVERGED_GRADIENT: f32 = 1e-3;

/// Orientation filter state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AhrsState {
    quaternion: Quaternion,
    beta: f32,
    converged: bool,
    inv_sqrt: InvSqrt,
}

impl AhrsState {
    /// Creates a filter at the identity attitude.
    ///
    /// `gyro_error_dps` is the estimated gyro measurement error in degrees
    /// per second; `beta = sqrt(3/4) * gyro_error` in radians per second.
    pub fn new(gyro_error_dps: f32) -> Self {
        Self::with_inv_sqrt(gyro_error_dps, InvSqrt::default())
    }

    /// Creates a filter with an explicit reciprocal square root strategy.
    pub fn with_inv_sqrt(gyro_error_dps: f32, inv_sqrt: InvSqrt) -> Self {
        Self {
            quaternion: Quaternion::IDENTITY,
            beta: (3.0_f32 / 4.0).sqrt() * (gyro_error_dps * DEG_TO_RAD),
            converged: false,
            inv_sqrt,
        }
    }

    /// Current orientation estimate.
    pub fn quaternion(&self) -> Quaternion {
        self.quaternion
    }

    /// Correction gain.
    pub fn beta(&self) -> f32 {
        self.beta
    }

    /// `true` when the last update needed almost no accelerometer correction.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Overrides the orientation estimate.
    pub fn set_quaternion(&mut self, quaternion: Quaternion) {
        self.quaternion = quaternion;
    }

    /// Advances the filter by `dt` seconds.
    ///
    /// `accel` may be in any unit, only its direction is used. `gyro` is in
    /// radians per second. `accel` must not be the zero vector and `dt` must
    /// be positive; neither is checked here.
    pub fn update(&mut self, dt: f32, accel: Vector3, gyro: Vector3) {
        let Quaternion {
            w: q0,
            x: q1,
            y: q2,
            z: q3,
        } = self.quaternion;
        let rsqrt = self.inv_sqrt;

        let a = accel.scale(rsqrt.apply(accel.norm_squared()));

        // Objective function: predicted minus measured gravity direction
        let x2q0 = 2.0 * q0;
        let x2q1 = 2.0 * q1;
        let x2q2 = 2.0 * q2;
        let x2q3 = 2.0 * q3;
        let f1 = x2q1 * q3 - x2q0 * q2 - a.x;
        let f2 = x2q0 * q1 + x2q2 * q3 - a.y;
        let f3 = 1.0 - x2q1 * q1 - x2q2 * q2 - a.z;

        // Gradient, Jacobian transposed times objective
        let mut s0 = x2q1 * f2 - x2q2 * f1;
        let mut s1 = x2q3 * f1 + x2q0 * f2 - 2.0 * x2q1 * f3;
        let mut s2 = x2q3 * f2 - 2.0 * x2q2 * f3 - x2q0 * f1;
        let mut s3 = x2q1 * f1 + x2q2 * f2;

        let gradient_sq = s0 * s0 + s1 * s1 + s2 * s2 + s3 * s3;
        self.converged = gradient_sq < CONVERGED_GRADIENT * CONVERGED_GRADIENT;
        if gradient_sq > 0.0 {
            let n = rsqrt.apply(gradient_sq);
            s0 *= n;
            s1 *= n;
            s2 *= n;
            s3 *= n;
        }

        // Rate of change from the gyro alone
        let qdot0 = 0.5 * (-q1 * gyro.x - q2 * gyro.y - q3 * gyro.z);
        let qdot1 = 0.5 * (q0 * gyro.x + q2 * gyro.z - q3 * gyro.y);
        let qdot2 = 0.5 * (q0 * gyro.y - q1 * gyro.z + q3 * gyro.x);
        let qdot3 = 0.5 * (q0 * gyro.z + q1 * gyro.y - q2 * gyro.x);

        let beta = self.beta;
        self.quaternion = Quaternion::new(
            q0 + (qdot0 - beta * s0) * dt,
            q1 + (qdot1 - beta * s1) * dt,
            q2 + (qdot2 - beta * s2) * dt,
            q3 + (qdot3 - beta * s3) * dt,
        )
        .normalized(rsqrt);
    }
}
