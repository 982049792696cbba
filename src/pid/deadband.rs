// src/pid/deadband.rs

//! # Dead-Band PID Control Module
//!
//! This module provides a compute function and control data structure
//! for a PID controller whose integrator only accumulates significant
//! error. The error is `measurement - set_point`, so a positive output
//! means the measurement is above the set point.

use crate::Number;
use piddiy::PidController;

/// Control data for the dead-band PID compute callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeadbandControlData<T> {
    /// The current measurement, an angle or a gyro rate.
    pub measurement: T,
    /// The time delta since the last computation, must be positive.
    pub dt: T,
    /// Error at or below this magnitude is not integrated.
    pub epsilon: T,
}

/// Dead-band PID compute callback.
///
/// Returns `(error, integral, derivative)`; the controller combines them
/// as `kp * error + ki * integral + kd * derivative` and keeps `error` and
/// `integral` for the next call.
pub fn compute_deadband<T: Number>(
    pid: &mut PidController<T, DeadbandControlData<T>>,
    data: DeadbandControlData<T>,
) -> (T, T, T) {
    let error = data.measurement - pid.set_point;
    let integral = if error.magnitude() > data.epsilon {
        pid.integral + error * data.dt
    } else {
        pid.integral
    };
    let derivative = (error - pid.error) / data.dt;

    (error, integral, derivative)
}
