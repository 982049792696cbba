// src/test_utils.rs

//! This module contains utilities for testing.

use crate::ahrs::{Quaternion, Vector3};

/// A constant defining the tolerance within which floating-point values
/// are considered close enough to be equal.
pub const TEST_TOLERANCE: f32 = 1e-5;

/// Looser tolerance for values that went through many filter iterations
/// or through the approximate reciprocal square root.
pub const FILTER_TOLERANCE: f32 = 1e-3;

/// Checks if two floating point numbers are close enough to be considered
/// equal.
///
/// # Arguments
/// * `target` - The target value.
/// * `value` - The value to compare against the target.
///
/// # Returns
/// `true` if the absolute difference between `target` and `value` is less than
/// `TEST_TOLERANCE`, otherwise `false`.
pub fn value_close(target: f32, value: f32) -> bool {
    value_within(target, value, TEST_TOLERANCE)
}

/// Checks if two floating point numbers differ by less than `tolerance`.
pub fn value_within(target: f32, value: f32, tolerance: f32) -> bool {
    (target - value).abs() < tolerance
}

/// Checks if each of the components in a vector is within `tolerance`
/// of the target.
///
/// # Arguments
/// * `target` - The target vector.
/// * `value` - The vector to compare against the target.
/// * `tolerance` - Allowed absolute difference per component.
pub fn vector_within(target: Vector3, value: Vector3, tolerance: f32) -> bool {
    value_within(target.x, value.x, tolerance)
        && value_within(target.y, value.y, tolerance)
        && value_within(target.z, value.z, tolerance)
}

/// Checks if each of the components in a quaternion is within `tolerance`
/// of the target.
pub fn quaternion_within(target: Quaternion, value: Quaternion, tolerance: f32) -> bool {
    value_within(target.w, value.w, tolerance)
        && value_within(target.x, value.x, tolerance)
        && value_within(target.y, value.y, tolerance)
        && value_within(target.z, value.z, tolerance)
}
