// src/lib.rs

//! # Quadrotor Attitude Control Core
//!
//! This crate keeps a four-rotor vehicle level. It fuses inertial samples
//! into an attitude estimate with a quaternion gradient-descent filter,
//! drives five dead-band PID controllers arranged as angle-over-rate
//! cascades, guards the motors with a latching tilt panic, and accepts
//! operator commands over a sequenced UDP control link.
//!
//! The control loop is event driven: a sensor data-ready signal and the
//! arrival of a new command both wake it, and a silent sensor zeroes the
//! motors within one cycle.
//!
//! Hardware is reached through the traits in [`drivers`]. The `attitude-fc`
//! binary runs the whole stack against the simulated hardware in
//! [`drivers::sim`].

#![warn(missing_docs)]

pub mod ahrs;
pub mod calibration;
pub mod config;
pub mod drivers;
pub mod error;
pub mod link;
pub mod mixer;
pub mod pid;
pub mod protocol;
pub mod safety;
pub mod scheduler;
pub mod stabilizer;
pub mod telemetry;

#[doc(inline)]
pub use stabilizer::*;

pub use config::{AppConfig, TuningHandle};
pub use error::Error;

#[cfg(test)]
mod test_utils;
