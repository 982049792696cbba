// src/config.rs

//! Configuration for the flight controller.
//!
//! Loaded once at startup from a TOML file. Every section and field has a
//! default, so an empty file is a valid configuration. Only the PID gains
//! can change afterwards, through [`TuningHandle`].

use crate::ahrs::{InvSqrt, DEFAULT_RATE_SMOOTHING};
use crate::calibration::{Calibration, DEFAULT_CALIBRATION_ITERATIONS};
use crate::drivers::sim::SimulatedImuConfig;
use crate::error::{Error, Result};
use crate::mixer::DEFAULT_MAX_DUTY;
use crate::protocol::{DEFAULT_MAX_THROTTLE, DEFAULT_PORT};
use crate::safety::DEFAULT_PANIC_ANGLE;
use crate::stabilizer::{CascadeGains, PidGains};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Control link
    pub network: NetworkConfig,
    /// Control loop and safety limits
    pub control: ControlConfig,
    /// Orientation estimator
    pub estimator: EstimatorConfig,
    /// Initial PID gains
    pub tuning: CascadeGains<f32>,
    /// Sensor offsets, written by `--calibrate`
    pub calibration: Calibration,
    /// Simulated sensor used on a development host
    pub simulation: SimulatedImuConfig,
    /// Logging
    pub logging: LoggingConfig,
}

/// Control link configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// UDP bind address for the control link
    ///
    /// Examples:
    /// - `0.0.0.0:25565` - All interfaces
    /// - `127.0.0.1:25565` - Localhost only
    pub bind_address: String,
    /// Interval between status datagrams in milliseconds
    pub status_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{}", DEFAULT_PORT),
            status_interval_ms: 100,
        }
    }
}

impl NetworkConfig {
    /// Parsed bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind_address.parse().map_err(|e| {
            Error::InvalidParameter(format!("bind_address {:?}: {}", self.bind_address, e))
        })
    }

    /// Status interval as a duration.
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

/// Control loop configuration
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Throttle in duty units for a throttle fraction of 1.0
    pub max_throttle: f32,
    /// Highest duty value written to a motor
    pub max_duty: u16,
    /// Tilt in degrees that latches panic
    pub panic_angle: f32,
    /// Longest wait for sensor data before the fail-safe engages, milliseconds
    pub sensor_timeout_ms: u64,
    /// Clear the PID integrators when leaving panic
    pub reset_integrators_on_recovery: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            max_throttle: DEFAULT_MAX_THROTTLE,
            max_duty: DEFAULT_MAX_DUTY,
            panic_angle: DEFAULT_PANIC_ANGLE,
            sensor_timeout_ms: 50,
            reset_integrators_on_recovery: true,
        }
    }
}

impl ControlConfig {
    /// Sensor timeout as a duration.
    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_timeout_ms)
    }
}

/// Orientation estimator configuration
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Expected gyro error in degrees per second, sets the filter gain
    pub gyro_error_dps: f32,
    /// Weight kept from the previous smoothed rate, in `[0, 1)`
    pub rate_smoothing: f32,
    /// Reciprocal square root strategy
    pub inv_sqrt: InvSqrt,
    /// Samples averaged by `--calibrate`
    pub calibration_iterations: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            gyro_error_dps: 5.0,
            rate_smoothing: DEFAULT_RATE_SMOOTHING,
            inv_sqrt: InvSqrt::Exact,
            calibration_iterations: DEFAULT_CALIBRATION_ITERATIONS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Arguments
    /// - `path`: Path to TOML configuration file
    ///
    /// # Returns
    /// Parsed and validated configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the configuration to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> Result<()> {
            Err(Error::InvalidParameter(msg))
        }

        self.network.bind_addr()?;
        if self.network.status_interval_ms == 0 {
            return invalid("network.status_interval_ms must be positive".to_string());
        }

        let control = &self.control;
        if !(control.max_throttle.is_finite() && control.max_throttle > 0.0) {
            return invalid(format!(
                "control.max_throttle must be positive, got {}",
                control.max_throttle
            ));
        }
        if control.max_duty == 0 {
            return invalid("control.max_duty must be positive".to_string());
        }
        if !(control.panic_angle > 0.0 && control.panic_angle <= 180.0) {
            return invalid(format!(
                "control.panic_angle must be in (0, 180], got {}",
                control.panic_angle
            ));
        }
        if control.sensor_timeout_ms == 0 {
            return invalid("control.sensor_timeout_ms must be positive".to_string());
        }

        let estimator = &self.estimator;
        if !(estimator.gyro_error_dps.is_finite() && estimator.gyro_error_dps >= 0.0) {
            return invalid(format!(
                "estimator.gyro_error_dps must be non-negative, got {}",
                estimator.gyro_error_dps
            ));
        }
        if !(0.0..1.0).contains(&estimator.rate_smoothing) {
            return invalid(format!(
                "estimator.rate_smoothing must be in [0, 1), got {}",
                estimator.rate_smoothing
            ));
        }
        if estimator.calibration_iterations == 0 {
            return invalid("estimator.calibration_iterations must be positive".to_string());
        }

        validate_gains(&self.tuning)
    }
}

/// Checks that every gain is finite and every dead band non-negative.
pub fn validate_gains(gains: &CascadeGains<f32>) -> Result<()> {
    let groups: [(&str, &PidGains<f32>); 3] = [
        ("angle", &gains.angle),
        ("rate", &gains.rate),
        ("yaw_rate", &gains.yaw_rate),
    ];
    for (name, g) in groups {
        if ![g.kp, g.ki, g.kd, g.epsilon].iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "tuning.{} gains must be finite",
                name
            )));
        }
        if g.epsilon < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "tuning.{}.epsilon must be non-negative, got {}",
                name, g.epsilon
            )));
        }
    }
    Ok(())
}

/// Live PID gains shared with the control loop, which copies them at the
/// start of every cycle.
#[derive(Debug, Clone, Default)]
pub struct TuningHandle {
    gains: Arc<RwLock<CascadeGains<f32>>>,
}

impl TuningHandle {
    /// Creates a handle holding `gains`.
    pub fn new(gains: CascadeGains<f32>) -> Self {
        Self {
            gains: Arc::new(RwLock::new(gains)),
        }
    }

    /// Copy of the current gains.
    pub fn snapshot(&self) -> CascadeGains<f32> {
        *self.gains.read()
    }

    /// Replaces the gains after validating them.
    pub fn update(&self, gains: CascadeGains<f32>) -> Result<()> {
        validate_gains(&gains)?;
        *self.gains.write() = gains;
        log::info!("PID gains updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_firmware() {
        let config = AppConfig::default();
        assert_eq!("0.0.0.0:25565", config.network.bind_address);
        assert_eq!(100, config.network.status_interval_ms);
        assert_eq!(930.0, config.control.max_throttle);
        assert_eq!(1023, config.control.max_duty);
        assert_eq!(50.0, config.control.panic_angle);
        assert_eq!(Duration::from_millis(50), config.control.sensor_timeout());
        assert!(config.control.reset_integrators_on_recovery);
        assert_eq!(5.0, config.estimator.gyro_error_dps);
        assert_eq!(0.7, config.estimator.rate_smoothing);
        assert_eq!(InvSqrt::Exact, config.estimator.inv_sqrt);
        assert_eq!(4269, config.estimator.calibration_iterations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(AppConfig::default(), AppConfig::from_toml("").unwrap());
    }

    #[test]
    fn test_partial_file() {
        let config = AppConfig::from_toml(
            r#"
            [control]
            panic_angle = 35.0

            [estimator]
            inv_sqrt = "fast"

            [tuning.rate]
            kp = 0.9
            ki = 0.1
            kd = 0.01
            epsilon = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(35.0, config.control.panic_angle);
        assert_eq!(930.0, config.control.max_throttle);
        assert_eq!(InvSqrt::Fast, config.estimator.inv_sqrt);
        assert_eq!(PidGains::new(0.9, 0.1, 0.01, 2.0), config.tuning.rate);
        assert_eq!(CascadeGains::default().angle, config.tuning.angle);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AppConfig::default();
        config.calibration.gyro_offset = [0.5, -1.25, 2.0];
        config.network.bind_address = "127.0.0.1:4000".to_string();
        let text = config.to_toml().unwrap();
        assert_eq!(config, AppConfig::from_toml(&text).unwrap());
    }

    #[test]
    fn test_validate_rejects() {
        let cases = [
            "[network]\nbind_address = \"not an address\"",
            "[control]\npanic_angle = 0.0",
            "[control]\nmax_throttle = -1.0",
            "[control]\nsensor_timeout_ms = 0",
            "[estimator]\nrate_smoothing = 1.0",
            "[tuning.angle]\nkp = 1.0\nki = 0.0\nkd = 0.0\nepsilon = -0.5",
        ];
        for case in cases {
            assert!(
                matches!(AppConfig::from_toml(case), Err(Error::InvalidParameter(_))),
                "Should reject {:?}",
                case
            );
        }
        assert!(matches!(
            AppConfig::from_toml("[control]\npanic_angle = \"steep\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_tuning_handle() {
        let handle = TuningHandle::new(CascadeGains::default());
        let shared = handle.clone();
        let mut gains = CascadeGains::default();
        gains.yaw_rate.kp = 3.5;
        shared.update(gains).unwrap();
        assert_eq!(3.5, handle.snapshot().yaw_rate.kp);

        gains.rate.kd = f32::NAN;
        assert!(shared.update(gains).is_err());
        assert_eq!(3.5, handle.snapshot().yaw_rate.kp);
        assert!(!handle.snapshot().rate.kd.is_nan());
    }
}
