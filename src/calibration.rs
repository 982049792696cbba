// src/calibration.rs

//! Stationary sensor calibration.
//!
//! The vehicle sits level and still while a few thousand samples are
//! averaged. The mean gyro reading becomes the gyro offset. The mean
//! accelerometer reading minus one standard gravity on z becomes the
//! accelerometer offset, so a level sensor reads exactly `+1 g` on z after
//! correction.

use crate::ahrs::Vector3;
use crate::drivers::{ImuSample, ImuSensor};
use crate::error::{Error, Result};
use crate::scheduler::{EventReceiver, Wake};
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Standard gravity in m/s².
pub const STANDARD_GRAVITY: f32 = 9.80665;

/// Default number of samples averaged.
pub const DEFAULT_CALIBRATION_ITERATIONS: usize = 4269;

/// Offsets subtracted from every raw sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Gyro offset in degrees per second.
    pub gyro_offset: [f32; 3],
    /// Accelerometer offset in m/s².
    pub accel_offset: [f32; 3],
}

impl Calibration {
    /// `true` when both offsets are zero.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Removes the offsets from a raw sample.
    pub fn apply(&self, sample: ImuSample) -> ImuSample {
        ImuSample {
            accel: sample.accel - Vector3::from_array(self.accel_offset),
            gyro: sample.gyro - Vector3::from_array(self.gyro_offset),
        }
    }
}

/// Running sums for a calibration.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationAccumulator {
    accel_sum: [f64; 3],
    gyro_sum: [f64; 3],
    count: usize,
}

impl CalibrationAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples collected so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Adds one raw sample.
    pub fn push(&mut self, sample: &ImuSample) {
        let accel = sample.accel.to_array();
        let gyro = sample.gyro.to_array();
        for i in 0..3 {
            self.accel_sum[i] += f64::from(accel[i]);
            self.gyro_sum[i] += f64::from(gyro[i]);
        }
        self.count += 1;
    }

    /// Averages the collected samples.
    pub fn finish(&self) -> Result<Calibration> {
        if self.count == 0 {
            return Err(Error::InvalidParameter(
                "calibration needs at least one sample".to_string(),
            ));
        }
        let n = self.count as f64;
        let mean = |sums: [f64; 3]| sums.map(|s| (s / n) as f32);
        let mut accel_offset = mean(self.accel_sum);
        accel_offset[2] -= STANDARD_GRAVITY;
        Ok(Calibration {
            gyro_offset: mean(self.gyro_sum),
            accel_offset,
        })
    }
}

/// Collects `iterations` samples, one per sensor-ready event.
///
/// Fails with [`Error::SensorTimeout`] if no sensor event arrives within
/// `timeout`. Read errors abort the run.
pub fn run_calibration<S: ImuSensor + ?Sized>(
    imu: &mut S,
    events: &EventReceiver,
    iterations: usize,
    timeout: Duration,
) -> Result<Calibration> {
    info!("Calibrating over {} samples, keep the vehicle level and still", iterations);
    let mut accumulator = CalibrationAccumulator::new();
    while accumulator.count() < iterations {
        match events.wait(timeout) {
            Wake::Events { sensor: true, .. } => accumulator.push(&imu.read()?),
            Wake::Events { .. } => {}
            Wake::Timeout => return Err(Error::SensorTimeout(accumulator.count())),
        }
    }
    let calibration = accumulator.finish()?;
    info!(
        "Calibrated: gyro {:?}, accel {:?}",
        calibration.gyro_offset, calibration.accel_offset
    );
    Ok(calibration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::sim::{SimulatedImu, SimulatedImuConfig};
    use crate::scheduler::event_channel;
    use crate::test_utils::*;

    fn sample(accel: [f32; 3], gyro: [f32; 3]) -> ImuSample {
        ImuSample {
            accel: Vector3::from_array(accel),
            gyro: Vector3::from_array(gyro),
        }
    }

    #[test]
    fn test_accumulator_average() {
        let mut acc = CalibrationAccumulator::new();
        acc.push(&sample([0.1, -0.2, 9.9], [1.0, 2.0, -3.0]));
        acc.push(&sample([0.3, 0.0, 9.7], [3.0, 0.0, -1.0]));
        let cal = acc.finish().unwrap();
        assert!(value_close(2.0, cal.gyro_offset[0]));
        assert!(value_close(1.0, cal.gyro_offset[1]));
        assert!(value_close(-2.0, cal.gyro_offset[2]));
        assert!(value_close(0.2, cal.accel_offset[0]));
        assert!(value_close(-0.1, cal.accel_offset[1]));
        assert!(value_within(9.8 - STANDARD_GRAVITY, cal.accel_offset[2], 1e-4));
    }

    #[test]
    fn test_accumulator_empty() {
        assert!(CalibrationAccumulator::new().finish().is_err());
    }

    /// After applying the offsets a level sensor reads one g straight down z.
    #[test]
    fn test_apply_levels_sensor() {
        let raw = sample([0.4, -0.3, 9.5], [0.5, -0.25, 2.0]);
        let mut acc = CalibrationAccumulator::new();
        acc.push(&raw);
        let cal = acc.finish().unwrap();
        let corrected = cal.apply(raw);
        assert!(vector_within(
            Vector3::new(0.0, 0.0, STANDARD_GRAVITY),
            corrected.accel,
            1e-4
        ));
        assert!(vector_within(Vector3::ZERO, corrected.gyro, TEST_TOLERANCE));
        assert!(!cal.is_identity());
        assert!(Calibration::default().is_identity());
    }

    #[test]
    fn test_run_calibration_with_simulated_sensor() {
        let config = SimulatedImuConfig {
            gyro_bias: [1.5, -0.5, 0.25],
            accel_noise: 0.0,
            gyro_noise: 0.0,
            ..SimulatedImuConfig::default()
        };
        let mut imu = SimulatedImu::new(config);
        let (notifier, events) = event_channel();
        let signal = notifier.sensor_signal();

        let mut acc = CalibrationAccumulator::new();
        for _ in 0..4 {
            signal.signal();
            assert!(matches!(
                events.wait(Duration::from_millis(10)),
                Wake::Events { sensor: true, .. }
            ));
            acc.push(&imu.read().unwrap());
        }
        assert_eq!(4, acc.count());

        // Nothing signalled: times out before collecting anything.
        match run_calibration(&mut imu, &events, 10, Duration::from_millis(10)) {
            Err(Error::SensorTimeout(0)) => {}
            other => panic!("Expected a timeout, got {:?}", other),
        }

        signal.signal();
        let cal = std::thread::scope(|s| {
            s.spawn(|| {
                for _ in 0..20 {
                    std::thread::sleep(Duration::from_millis(2));
                    signal.signal();
                }
            });
            run_calibration(&mut imu, &events, 3, Duration::from_secs(1))
        })
        .unwrap();
        assert!(value_within(1.5, cal.gyro_offset[0], 1e-4));
        assert!(value_within(-0.5, cal.gyro_offset[1], 1e-4));
        assert!(value_within(0.0, cal.accel_offset[2], 1e-3));
    }
}
