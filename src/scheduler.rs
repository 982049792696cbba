// src/scheduler.rs

//! Event-driven control loop and the state it shares with the other
//! workers.
//!
//! The control worker owns the estimator, the cascade and the safety
//! machine. The only state it shares is:
//!
//! - the last decoded command, written by the link worker and copied out
//!   under a short lock when a command notification arrives,
//! - the status snapshot read by the telemetry worker,
//! - the live tuning handle.

pub mod controller;
pub use controller::*;
pub mod notify;
pub use notify::*;

use crate::ahrs::Vector3;
use crate::config::TuningHandle;
use crate::protocol::CommandSnapshot;
use crate::safety::SafetyState;
use parking_lot::Mutex;
use std::sync::Arc;

/// Last decoded operator command.
pub type SharedCommand = Arc<Mutex<CommandSnapshot>>;

/// Latest controller status for telemetry.
pub type StatusBoard = Arc<Mutex<StatusSnapshot>>;

/// What the control loop last reported.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatusSnapshot {
    /// Roll, pitch and yaw in degrees.
    pub angles: Vector3,
    /// Average cycle time in seconds.
    pub avg_cycle: f32,
    /// Safety state after the last cycle.
    pub state: SafetyState,
    /// The sensor is currently silent.
    pub sensor_timed_out: bool,
    /// The orientation filter reports convergence.
    pub converged: bool,
}

/// Handles to everything the control loop shares.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    /// Command written by the link worker.
    pub command: SharedCommand,
    /// Status read by the telemetry worker.
    pub status: StatusBoard,
    /// Gains, refreshed every cycle.
    pub tuning: TuningHandle,
}

impl SharedState {
    /// Creates shared state with zero command and the given gains.
    pub fn new(tuning: TuningHandle) -> Self {
        Self {
            command: SharedCommand::default(),
            status: StatusBoard::default(),
            tuning,
        }
    }
}
