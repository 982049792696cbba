// src/stabilizer/flight_stabilizer.rs

//! A module specifying the shared interface for PID-based flight stabilizers.
//! It includes the numeric trait the controllers are generic over, the gain
//! records shared by every controller of a group, and a trait defining the
//! stabilization functionality.

use piddiy::Number as PiddiyNumber;
use serde::{Deserialize, Serialize};

/// Custom trait to encapsulate base number requirements.
pub trait Number: PiddiyNumber {
    /// Absolute value for any signed number.
    fn magnitude(self) -> Self {
        if self < Self::zero() {
            -self
        } else {
            self
        }
    }
}

impl<T: PiddiyNumber> Number for T {}

/// Gains shared by every controller in one group.
///
/// `epsilon` is the integrator dead band: error whose magnitude does not
/// exceed it is not accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains<T> {
    /// Proportional gain.
    pub kp: T,
    /// Integral gain.
    pub ki: T,
    /// Derivative gain.
    pub kd: T,
    /// Integrator dead band.
    pub epsilon: T,
}

impl<T: Number> PidGains<T> {
    /// Creates a gain record.
    pub fn new(kp: T, ki: T, kd: T, epsilon: T) -> Self {
        Self { kp, ki, kd, epsilon }
    }

    /// Pure proportional gains with no dead band.
    pub fn proportional(kp: T) -> Self {
        Self::new(kp, T::zero(), T::zero(), T::zero())
    }
}

/// Gains for the whole cascade.
///
/// Roll and pitch share the `angle` and `rate` groups; yaw has its own
/// rate group and no angle stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de>, CascadeGains<T>: Default"))]
pub struct CascadeGains<T> {
    /// Outer angle loop, roll and pitch.
    pub angle: PidGains<T>,
    /// Inner rate loop, roll and pitch.
    pub rate: PidGains<T>,
    /// Yaw rate loop.
    pub yaw_rate: PidGains<T>,
}

impl<T: Number> CascadeGains<T> {
    /// Creates a configuration with unit proportional gains and everything
    /// else zero. These should be replaced with values tuned for the
    /// hardware.
    ///
    /// Example Usage
    /// ```
    /// use attitude_fc::stabilizer::{CascadeGains, PidGains};
    ///
    /// let mut gains = CascadeGains::<f32>::new();
    /// gains.angle = PidGains::new(4.0, 0.0, 0.0, 0.5);
    /// gains.rate = PidGains::new(1.2, 0.5, 0.02, 1.0);
    /// gains.yaw_rate = PidGains::new(2.0, 0.2, 0.0, 1.0);
    ///
    /// use attitude_fc::stabilizer::CascadeStabilizer;
    /// let stabilizer = CascadeStabilizer::with_gains(gains);
    /// ```
    pub fn new() -> Self {
        Self {
            angle: PidGains::proportional(T::one()),
            rate: PidGains::proportional(T::one()),
            yaw_rate: PidGains::proportional(T::one()),
        }
    }
}

impl Default for CascadeGains<f32> {
    fn default() -> Self {
        Self {
            angle: PidGains::new(4.0, 0.0, 0.0, 0.5),
            rate: PidGains::new(1.2, 0.5, 0.02, 1.0),
            yaw_rate: PidGains::new(2.0, 0.2, 0.0, 1.0),
        }
    }
}

/// A trait for PID-based flight stabilizers that handle roll, pitch,
/// and yaw control based on attitude and gyro data and dt.
pub trait FlightStabilizer<T: Number> {
    /// Takes desired setpoints, current attitude, and gyro rates, then computes the control outputs.
    ///
    /// - `set_point`: A tuple of (roll angle, pitch angle, yaw rate) commands.
    /// - `imu_attitude`: A tuple of (roll, pitch, yaw) current attitude.
    /// - `gyro_rate`: A tuple of (roll rate, pitch rate, yaw rate) from the gyroscope.
    /// - `dt`: Time delta since the last update, must be positive.
    ///
    /// Returns a tuple of unclamped (roll, pitch, yaw) corrections.
    fn control(
        &mut self,
        set_point: (T, T, T),
        imu_attitude: (T, T, T),
        gyro_rate: (T, T, T),
        dt: T,
    ) -> (T, T, T);
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixed::types::I16F16;

    #[test]
    fn test_magnitude() {
        assert_eq!(2.5, (-2.5f32).magnitude());
        assert_eq!(2.5, 2.5f32.magnitude());
        assert_eq!(0.0, 0.0f32.magnitude());
        assert_eq!(
            I16F16::from_num(0.75),
            I16F16::from_num(-0.75).magnitude()
        );
    }
}
