// src/stabilizer/cascade.rs

//! # Cascade PID-based Flight Stabilization Controller
//!
//! Five dead-band PID controllers arranged as two angle-over-rate cascades
//! (roll, pitch) and a single yaw rate loop.
//!
//! For roll the angle controller runs first with the commanded angle as
//! its set point. Its output, negated, becomes the set point of the roll
//! rate controller, which is measured against the smoothed gyro rate.
//! Pitch works the same way. Yaw has no angle stage; the commanded yaw rate
//! is the set point of the yaw rate controller directly.
//!
//! Outputs are not clamped. The actuator mix clamps each motor instead.

use crate::pid::{compute_deadband, DeadbandControlData};
use crate::{CascadeGains, FlightStabilizer, Number, PidGains};
use piddiy::PidController;

type DeadbandPid<T> = PidController<T, DeadbandControlData<T>>;

fn deadband_pid<T: Number>(gains: &PidGains<T>) -> DeadbandPid<T> {
    let mut pid = PidController::new();
    pid.compute_fn(compute_deadband)
        .set_point(T::zero())
        .kp(gains.kp)
        .ki(gains.ki)
        .kd(gains.kd);
    pid
}

fn retune<T: Number>(pid: &mut DeadbandPid<T>, gains: &PidGains<T>) {
    pid.kp(gains.kp).ki(gains.ki).kd(gains.kd);
}

fn clear<T: Number>(pid: &mut DeadbandPid<T>) {
    pid.integral = T::zero();
    pid.error = T::zero();
}

/// Angle-over-rate cascade for roll and pitch plus a yaw rate loop.
pub struct CascadeStabilizer<T: Number> {
    angle_roll_pid: DeadbandPid<T>,
    angle_pitch_pid: DeadbandPid<T>,
    rate_roll_pid: DeadbandPid<T>,
    rate_pitch_pid: DeadbandPid<T>,
    rate_yaw_pid: DeadbandPid<T>,
    gains: CascadeGains<T>,
}

impl<T: Number> CascadeStabilizer<T> {
    /// Creates a new controller using the provided gains.
    pub fn with_gains(gains: CascadeGains<T>) -> Self {
        CascadeStabilizer {
            angle_roll_pid: deadband_pid(&gains.angle),
            angle_pitch_pid: deadband_pid(&gains.angle),
            rate_roll_pid: deadband_pid(&gains.rate),
            rate_pitch_pid: deadband_pid(&gains.rate),
            rate_yaw_pid: deadband_pid(&gains.yaw_rate),
            gains,
        }
    }

    /// Creates a new controller with unit proportional gains.
    pub fn new() -> Self {
        Self::with_gains(CascadeGains::new())
    }

    /// Gains currently in use.
    pub fn gains(&self) -> &CascadeGains<T> {
        &self.gains
    }

    /// Replaces the gains of every controller. Integrator state is kept,
    /// so retuning in flight does not cause a step in the output.
    pub fn apply_gains(&mut self, gains: &CascadeGains<T>) {
        if *gains == self.gains {
            return;
        }
        retune(&mut self.angle_roll_pid, &gains.angle);
        retune(&mut self.angle_pitch_pid, &gains.angle);
        retune(&mut self.rate_roll_pid, &gains.rate);
        retune(&mut self.rate_pitch_pid, &gains.rate);
        retune(&mut self.rate_yaw_pid, &gains.yaw_rate);
        self.gains = *gains;
    }

    /// Clears the integrators and previous errors of all five controllers.
    pub fn reset(&mut self) {
        clear(&mut self.angle_roll_pid);
        clear(&mut self.angle_pitch_pid);
        clear(&mut self.rate_roll_pid);
        clear(&mut self.rate_pitch_pid);
        clear(&mut self.rate_yaw_pid);
    }

    /// Integrator values in the order angle roll, angle pitch, rate roll,
    /// rate pitch, rate yaw.
    pub fn integrals(&self) -> [T; 5] {
        [
            self.angle_roll_pid.integral,
            self.angle_pitch_pid.integral,
            self.rate_roll_pid.integral,
            self.rate_pitch_pid.integral,
            self.rate_yaw_pid.integral,
        ]
    }
}

impl<T: Number> Default for CascadeStabilizer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Number> FlightStabilizer<T> for CascadeStabilizer<T> {
    fn control(
        &mut self,
        set_point: (T, T, T),
        imu_attitude: (T, T, T),
        gyro_rate: (T, T, T),
        dt: T,
    ) -> (T, T, T) {
        let (set_point_roll, set_point_pitch, set_point_yaw) = set_point;
        let (imu_roll, imu_pitch, _) = imu_attitude;
        let (gyro_roll, gyro_pitch, gyro_yaw) = gyro_rate;

        // Outer angle loops
        self.angle_roll_pid.set_point(set_point_roll);
        self.angle_pitch_pid.set_point(set_point_pitch);
        let angle_epsilon = self.gains.angle.epsilon;
        let adjusted_roll = self.angle_roll_pid.compute(DeadbandControlData {
            measurement: imu_roll,
            dt,
            epsilon: angle_epsilon,
        });
        let adjusted_pitch = self.angle_pitch_pid.compute(DeadbandControlData {
            measurement: imu_pitch,
            dt,
            epsilon: angle_epsilon,
        });

        // Inner rate loops, driven by the negated angle outputs
        self.rate_roll_pid.set_point(-adjusted_roll);
        self.rate_pitch_pid.set_point(-adjusted_pitch);
        self.rate_yaw_pid.set_point(set_point_yaw);
        let rate_epsilon = self.gains.rate.epsilon;
        let roll_output = self.rate_roll_pid.compute(DeadbandControlData {
            measurement: gyro_roll,
            dt,
            epsilon: rate_epsilon,
        });
        let pitch_output = self.rate_pitch_pid.compute(DeadbandControlData {
            measurement: gyro_pitch,
            dt,
            epsilon: rate_epsilon,
        });
        let yaw_output = self.rate_yaw_pid.compute(DeadbandControlData {
            measurement: gyro_yaw,
            dt,
            epsilon: self.gains.yaw_rate.epsilon,
        });

        (roll_output, pitch_output, yaw_output)
    }
}
