// src/error.rs

//! Error types for the flight controller.
//!
//! Only startup and I/O failures surface here. Stale or malformed control
//! datagrams are discarded by the decoder and never become errors.

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Flight controller error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (sockets, configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Configuration serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Inertial sensor answered the identity check with the wrong value
    #[error("Sensor identity mismatch: expected {expected:#04x}, got {actual:#04x}")]
    SensorIdentity {
        /// Identity register value the driver expects
        expected: u8,
        /// Identity register value the device reported
        actual: u8,
    },

    /// Inertial sensor could not be brought up
    #[error("Sensor initialization failed: {0}")]
    SensorInit(String),

    /// Sensor stopped answering during calibration
    #[error("Sensor timed out after {0} samples")]
    SensorTimeout(usize),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
