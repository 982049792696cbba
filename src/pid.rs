// src/pid.rs

//! # PID Control Module
//!
//! This module provides the compute function and control data structure
//! used by every controller in the cascade bank.

pub mod deadband;
pub use deadband::*;
