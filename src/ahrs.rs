// src/ahrs.rs

//! # Orientation Estimator
//!
//! This module fuses accelerometer and gyroscope samples into a unit
//! quaternion using a gradient-descent (Madgwick) filter, and derives the
//! gravity vector, Euler angles, and a smoothed body rate from it.
//!
//! Angles leave this module in degrees. The filter itself works in radians.

pub mod attitude;
pub use attitude::*;
pub mod madgwick;
pub use madgwick::*;
pub mod quaternion;
pub use quaternion::*;
pub mod rsqrt;
pub use rsqrt::*;

/// Degrees to radians.
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;

/// Radians to degrees.
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;
