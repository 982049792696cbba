// src/ahrs/attitude.rs

//! Attitude derived from the filter each sample, plus the smoothed gyro
//! rate fed to the rate controllers.

use super::{AhrsState, InvSqrt, Vector3, DEG_TO_RAD};

/// Weight kept from the previous smoothed rate on each sample.
pub const DEFAULT_RATE_SMOOTHING: f32 = 0.7;

/// Latest attitude and body rate, both in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    /// Roll (`x`), pitch (`y`) and yaw (`z`) in degrees.
    pub angles: Vector3,
    /// Smoothed body rate in degrees per second.
    pub rate: Vector3,
}

/// Orientation filter plus rate smoothing.
#[derive(Debug, Clone, Copy)]
pub struct Estimator {
    ahrs: AhrsState,
    attitude: Attitude,
    rate_smoothing: f32,
}

impl Estimator {
    /// Creates an estimator at the identity attitude.
    pub fn new(gyro_error_dps: f32, inv_sqrt: InvSqrt, rate_smoothing: f32) -> Self {
        Self {
            ahrs: AhrsState::with_inv_sqrt(gyro_error_dps, inv_sqrt),
            attitude: Attitude::default(),
            rate_smoothing,
        }
    }

    /// Filter state.
    pub fn ahrs(&self) -> &AhrsState {
        &self.ahrs
    }

    /// Latest attitude.
    pub fn attitude(&self) -> Attitude {
        self.attitude
    }

    /// Fuses one sample taken `dt` seconds after the previous one.
    ///
    /// `gyro_dps` is in degrees per second.
    pub fn ingest(&mut self, accel: Vector3, gyro_dps: Vector3, dt: f32) -> Attitude {
        self.ahrs.update(dt, accel, gyro_dps * DEG_TO_RAD);

        let keep = self.rate_smoothing;
        self.attitude.rate = self.attitude.rate * keep + gyro_dps * (1.0 - keep);

        let q = self.ahrs.quaternion();
        self.attitude.angles = q.euler_degrees(q.gravity());
        self.attitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    /// The smoothed rate blends 70% old with 30% new.
    #[test]
    fn test_rate_smoothing() {
        let mut estimator = Estimator::new(5.0, InvSqrt::Exact, DEFAULT_RATE_SMOOTHING);
        let accel = Vector3::new(0.0, 0.0, 9.81);

        let attitude = estimator.ingest(accel, Vector3::new(10.0, 0.0, -20.0), 0.002);
        assert!(vector_within(
            Vector3::new(3.0, 0.0, -6.0),
            attitude.rate,
            TEST_TOLERANCE
        ));

        let attitude = estimator.ingest(accel, Vector3::new(10.0, 0.0, -20.0), 0.002);
        assert!(vector_within(
            Vector3::new(5.1, 0.0, -10.2),
            attitude.rate,
            1e-4
        ));
    }

    /// A level, still sensor reports zero roll and pitch.
    #[test]
    fn test_level_attitude() {
        let mut estimator = Estimator::new(5.0, InvSqrt::Fast, DEFAULT_RATE_SMOOTHING);
        let mut attitude = Attitude::default();
        for _ in 0..200 {
            attitude = estimator.ingest(Vector3::new(0.0, 0.0, 9.81), Vector3::ZERO, 0.002);
        }
        assert!(value_within(0.0, attitude.angles.x, FILTER_TOLERANCE));
        assert!(value_within(0.0, attitude.angles.y, FILTER_TOLERANCE));
        assert!(value_within(1.0, estimator.ahrs().quaternion().norm(), 3e-3));
    }
}
