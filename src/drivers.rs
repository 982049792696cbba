// src/drivers.rs

//! Hardware seams.
//!
//! The control core talks to the inertial sensor, the motor driver and the
//! battery and radio monitors through these traits. Implementations for
//! real hardware live outside the crate; [`sim`] provides stand-ins for
//! running on a development host.

pub mod sim;

use crate::ahrs::Vector3;
use crate::error::{Error, Result};
use crate::mixer::MOTOR_COUNT;
use log::info;

/// Identity register value of the supported inertial sensor.
pub const EXPECTED_IMU_IDENTITY: u8 = 0x68;

/// One inertial sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuSample {
    /// Specific force in m/s². A level, still sensor reads `+g` on z.
    pub accel: Vector3,
    /// Body rate in degrees per second.
    pub gyro: Vector3,
}

/// Inertial sensor.
pub trait ImuSensor: Send {
    /// Resets and configures the device.
    fn init(&mut self) -> Result<()>;

    /// Reads the identity register.
    fn identity(&mut self) -> Result<u8>;

    /// Reads the latest sample. Called once per data-ready notification.
    fn read(&mut self) -> Result<ImuSample>;
}

/// Motor outputs.
pub trait Actuators: Send {
    /// Writes a duty value to one channel, `0..MOTOR_COUNT`.
    fn set_output(&mut self, channel: usize, duty: u16);

    /// Writes all channels in order.
    fn set_all(&mut self, duty: &[u16; MOTOR_COUNT]) {
        for (channel, value) in duty.iter().enumerate() {
            self.set_output(channel, *value);
        }
    }

    /// Writes zero to every channel.
    fn zero_all(&mut self) {
        self.set_all(&[0; MOTOR_COUNT]);
    }
}

/// Battery voltage source.
pub trait BatteryMonitor: Send {
    /// Battery voltage in volts.
    fn voltage(&mut self) -> f32;
}

/// Radio signal strength source.
pub trait SignalMonitor: Send {
    /// Signal strength in dBm.
    fn rssi(&mut self) -> i8;
}

/// Initializes the sensor and checks its identity.
///
/// Any failure during `init` is reported as [`Error::SensorInit`].
pub fn bring_up<S: ImuSensor + ?Sized>(sensor: &mut S) -> Result<()> {
    sensor.init().map_err(|e| match e {
        Error::SensorInit(_) => e,
        other => Error::SensorInit(other.to_string()),
    })?;
    let actual = sensor.identity()?;
    if actual != EXPECTED_IMU_IDENTITY {
        return Err(Error::SensorIdentity {
            expected: EXPECTED_IMU_IDENTITY,
            actual,
        });
    }
    info!("Inertial sensor ready (identity {:#04x})", actual);
    Ok(())
}
