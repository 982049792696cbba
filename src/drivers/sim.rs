// src/drivers/sim.rs

//! Simulated hardware for running the controller on a development host.
//!
//! The simulated sensor reports a fixed tilt with gaussian noise and a
//! constant gyro bias. A ticker thread plays the part of the data-ready
//! interrupt.

use super::{Actuators, BatteryMonitor, ImuSample, ImuSensor, SignalMonitor, EXPECTED_IMU_IDENTITY};
use crate::ahrs::{Vector3, DEG_TO_RAD};
use crate::calibration::STANDARD_GRAVITY;
use crate::error::{Error, Result};
use crate::mixer::MOTOR_COUNT;
use crate::scheduler::SensorReadySignal;
use log::{debug, trace};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Simulated sensor settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedImuConfig {
    /// Roll of the simulated vehicle in degrees.
    pub roll: f32,
    /// Pitch of the simulated vehicle in degrees.
    pub pitch: f32,
    /// Constant gyro bias in degrees per second.
    pub gyro_bias: [f32; 3],
    /// Accelerometer noise standard deviation in m/s².
    pub accel_noise: f32,
    /// Gyro noise standard deviation in degrees per second.
    pub gyro_noise: f32,
    /// Value returned from the identity register.
    pub identity: u8,
    /// RNG seed, 0 for entropy.
    pub seed: u64,
}

impl Default for SimulatedImuConfig {
    fn default() -> Self {
        Self {
            roll: 0.0,
            pitch: 0.0,
            gyro_bias: [0.0; 3],
            accel_noise: 0.05,
            gyro_noise: 0.1,
            identity: EXPECTED_IMU_IDENTITY,
            seed: 0,
        }
    }
}

/// Simulated inertial sensor.
pub struct SimulatedImu {
    config: SimulatedImuConfig,
    gravity: Vector3,
    rng: StdRng,
    accel_noise: Option<Normal<f32>>,
    gyro_noise: Option<Normal<f32>>,
}

fn noise(stddev: f32) -> Option<Normal<f32>> {
    if stddev > 0.0 {
        Normal::new(0.0, stddev).ok()
    } else {
        None
    }
}

impl SimulatedImu {
    /// Creates a sensor.
    pub fn new(config: SimulatedImuConfig) -> Self {
        let rng = if config.seed == 0 {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(config.seed)
        };
        let mut imu = Self {
            config,
            gravity: Vector3::ZERO,
            rng,
            accel_noise: noise(config.accel_noise),
            gyro_noise: noise(config.gyro_noise),
        };
        imu.set_attitude(config.roll, config.pitch);
        imu
    }

    /// Tilts the simulated vehicle.
    pub fn set_attitude(&mut self, roll: f32, pitch: f32) {
        let (sr, cr) = (roll * DEG_TO_RAD).sin_cos();
        let (sp, cp) = (pitch * DEG_TO_RAD).sin_cos();
        self.config.roll = roll;
        self.config.pitch = pitch;
        self.gravity = Vector3::new(-sp, sr * cp, cr * cp) * STANDARD_GRAVITY;
    }

    fn sample_noise(&mut self, dist: Option<Normal<f32>>) -> Vector3 {
        match dist {
            Some(d) => Vector3::new(
                d.sample(&mut self.rng),
                d.sample(&mut self.rng),
                d.sample(&mut self.rng),
            ),
            None => Vector3::ZERO,
        }
    }
}

impl ImuSensor for SimulatedImu {
    fn init(&mut self) -> Result<()> {
        debug!(
            "Simulated IMU reset, roll {:.1}°, pitch {:.1}°",
            self.config.roll, self.config.pitch
        );
        Ok(())
    }

    fn identity(&mut self) -> Result<u8> {
        Ok(self.config.identity)
    }

    fn read(&mut self) -> Result<ImuSample> {
        let accel = self.gravity + self.sample_noise(self.accel_noise);
        let gyro = Vector3::from_array(self.config.gyro_bias) + self.sample_noise(self.gyro_noise);
        Ok(ImuSample { accel, gyro })
    }
}

/// Spawns a thread that signals sensor readiness at `rate_hz` until
/// `running` is cleared.
pub fn spawn_data_ready(
    signal: SensorReadySignal,
    rate_hz: u32,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    if rate_hz == 0 {
        return Err(Error::InvalidParameter(
            "sample rate must be positive".to_string(),
        ));
    }
    let period = Duration::from_secs_f64(1.0 / f64::from(rate_hz));
    thread::Builder::new()
        .name("imu-data-ready".to_string())
        .spawn(move || {
            while running.load(Ordering::Relaxed) {
                thread::sleep(period);
                signal.signal();
            }
        })
        .map_err(|e: io::Error| Error::Other(format!("Failed to spawn data-ready ticker: {}", e)))
}

/// Actuators that remember the last written duty values.
#[derive(Debug, Clone, Default)]
pub struct SimulatedActuators {
    outputs: Arc<Mutex<[u16; MOTOR_COUNT]>>,
}

impl SimulatedActuators {
    /// Creates actuators with every channel at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the outputs, for inspection from another thread.
    pub fn outputs(&self) -> Arc<Mutex<[u16; MOTOR_COUNT]>> {
        Arc::clone(&self.outputs)
    }
}

impl Actuators for SimulatedActuators {
    fn set_output(&mut self, channel: usize, duty: u16) {
        if let Some(slot) = self.outputs.lock().get_mut(channel) {
            if *slot != duty {
                trace!("Motor {} -> {}", channel, duty);
            }
            *slot = duty;
        }
    }
}

/// Battery at a fixed voltage.
#[derive(Debug, Clone, Copy)]
pub struct FixedBattery(pub f32);

impl BatteryMonitor for FixedBattery {
    fn voltage(&mut self) -> f32 {
        self.0
    }
}

/// Radio at a fixed signal strength.
#[derive(Debug, Clone, Copy)]
pub struct FixedSignal(pub i8);

impl SignalMonitor for FixedSignal {
    fn rssi(&mut self) -> i8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ahrs::{Estimator, InvSqrt, DEFAULT_RATE_SMOOTHING};
    use crate::scheduler::{event_channel, Wake};
    use crate::test_utils::*;

    fn quiet(roll: f32, pitch: f32) -> SimulatedImuConfig {
        SimulatedImuConfig {
            roll,
            pitch,
            accel_noise: 0.0,
            gyro_noise: 0.0,
            ..SimulatedImuConfig::default()
        }
    }

    #[test]
    fn test_level_reads_gravity() {
        let mut imu = SimulatedImu::new(quiet(0.0, 0.0));
        let sample = imu.read().unwrap();
        assert!(vector_within(
            Vector3::new(0.0, 0.0, STANDARD_GRAVITY),
            sample.accel,
            TEST_TOLERANCE
        ));
        assert!(vector_within(Vector3::ZERO, sample.gyro, TEST_TOLERANCE));
    }

    /// The estimator recovers the simulated tilt.
    #[test]
    fn test_tilt_matches_estimator() {
        let mut imu = SimulatedImu::new(quiet(20.0, -10.0));
        let mut estimator = Estimator::new(5.0, InvSqrt::Exact, DEFAULT_RATE_SMOOTHING);
        for _ in 0..20_000 {
            let sample = imu.read().unwrap();
            let _ = estimator.ingest(sample.accel, sample.gyro, 0.002);
        }
        let angles = estimator.attitude().angles;
        assert!(value_within(20.0, angles.x, 0.1), "Roll was {}", angles.x);
        assert!(value_within(-10.0, angles.y, 0.1), "Pitch was {}", angles.y);
    }

    /// Seeded noise is reproducible.
    #[test]
    fn test_seeded_noise() {
        let config = SimulatedImuConfig {
            seed: 42,
            ..SimulatedImuConfig::default()
        };
        let mut a = SimulatedImu::new(config);
        let mut b = SimulatedImu::new(config);
        assert_eq!(a.read().unwrap(), b.read().unwrap());
    }

    #[test]
    fn test_data_ready_ticker() {
        let (notifier, events) = event_channel();
        let running = Arc::new(AtomicBool::new(true));
        let handle = spawn_data_ready(notifier.sensor_signal(), 1000, Arc::clone(&running)).unwrap();
        assert!(matches!(
            events.wait(Duration::from_secs(1)),
            Wake::Events { sensor: true, .. }
        ));
        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();
        assert!(spawn_data_ready(notifier.sensor_signal(), 0, running).is_err());
    }

    #[test]
    fn test_actuators_shared_outputs() {
        let mut actuators = SimulatedActuators::new();
        let outputs = actuators.outputs();
        actuators.set_all(&[10, 20, 30, 40]);
        actuators.set_output(7, 99);
        assert_eq!([10, 20, 30, 40], *outputs.lock());
        actuators.zero_all();
        assert_eq!([0; 4], *outputs.lock());
    }
}
