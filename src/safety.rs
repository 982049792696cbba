// src/safety.rs

//! Panic guard run once per control cycle.
//!
//! Rules, highest precedence first:
//!
//! 1. Throttle at or below zero zeroes the actuators. The stored state is
//!    left alone.
//! 2. In `Normal`, roll or pitch beyond the threshold latches `Panic`.
//! 3. A command carrying the clear flag returns to `Normal`, overriding
//!    rule 2 for the same cycle.
//! 4. In `Panic` the actuators are zeroed and the cascade is skipped.
//!
//! A panic is never cleared automatically. An operator must send the clear
//! flag, so motors cannot re-engage on their own after a crash.

use log::{info, warn};

/// Tilt in degrees past which the vehicle is considered out of control.
pub const DEFAULT_PANIC_ANGLE: f32 = 50.0;

/// Persisted safety state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SafetyState {
    /// Flying normally.
    #[default]
    Normal,
    /// Latched after excessive tilt, only cleared by the operator.
    Panic,
}

/// What the scheduler should do with the actuators this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyAction {
    /// Run the cascade and write the mix.
    RunCascade,
    /// Skip the cascade and write zero to every actuator.
    ZeroActuators,
}

/// Safety state machine.
#[derive(Debug, Clone)]
pub struct SafetyMachine {
    state: SafetyState,
    panic_angle: f32,
}

impl SafetyMachine {
    /// Creates a machine in `Normal` with the given tilt threshold in degrees.
    pub fn new(panic_angle: f32) -> Self {
        Self {
            state: SafetyState::Normal,
            panic_angle,
        }
    }

    /// Current state.
    pub fn state(&self) -> SafetyState {
        self.state
    }

    /// Tilt threshold in degrees.
    pub fn panic_angle(&self) -> f32 {
        self.panic_angle
    }

    /// Applies the rules for one cycle.
    ///
    /// `throttle` is the commanded throttle, `roll` and `pitch` the latest
    /// attitude in degrees, `clear_panic` the flag from the working command.
    pub fn evaluate(
        &mut self,
        throttle: f32,
        roll: f32,
        pitch: f32,
        clear_panic: bool,
    ) -> SafetyAction {
        if throttle <= 0.0 {
            return SafetyAction::ZeroActuators;
        }

        let tilted = roll.abs() > self.panic_angle || pitch.abs() > self.panic_angle;

        if clear_panic {
            if self.state == SafetyState::Panic {
                info!("Panic cleared by operator");
            }
            self.state = SafetyState::Normal;
        } else if tilted && self.state == SafetyState::Normal {
            warn!(
                "Entering panic: roll {:.1}°, pitch {:.1}° exceeds {:.1}°",
                roll, pitch, self.panic_angle
            );
            self.state = SafetyState::Panic;
        }

        match self.state {
            SafetyState::Normal => SafetyAction::RunCascade,
            SafetyState::Panic => SafetyAction::ZeroActuators,
        }
    }

    /// Fail-safe for a cycle with no sensor data. The stored state is not
    /// changed; the normal rules apply again once data resumes.
    pub fn sensor_timeout(&self) -> SafetyAction {
        SafetyAction::ZeroActuators
    }
}

impl Default for SafetyMachine {
    fn default() -> Self {
        Self::new(DEFAULT_PANIC_ANGLE)
    }
}
