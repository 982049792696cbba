// src/scheduler/controller.rs

//! The control worker.
//!
//! One cycle per wake-up. A sensor notification reads and fuses a sample;
//! a command notification copies the shared command. Every cycle then
//! refreshes the gains, runs the safety gate and either the cascade and
//! mix or the zero-output path, writes all four actuators and publishes a
//! status snapshot.
//!
//! When no sensor sample has arrived within the sensor timeout the cycle
//! takes the fail-safe path regardless of commands, so a silent sensor
//! zeroes the motors within one cycle.

use super::{EventReceiver, SharedState, StatusSnapshot, Wake};
use crate::ahrs::{Attitude, Estimator};
use crate::calibration::Calibration;
use crate::config::AppConfig;
use crate::drivers::{Actuators, ImuSensor};
use crate::mixer::{mix_x, MOTOR_COUNT};
use crate::protocol::CommandSnapshot;
use crate::safety::{SafetyAction, SafetyMachine, SafetyState};
use crate::stabilizer::{CascadeStabilizer, FlightStabilizer};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Smallest time step handed to the filter and the controllers, seconds.
pub const MIN_DT: f32 = 1e-6;

const AVG_KEEP: f32 = 0.995;

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Action taken by the safety gate.
    pub action: SafetyAction,
    /// The cycle ran without fresh sensor data.
    pub timed_out: bool,
    /// Duty values written to the actuators.
    pub outputs: [u16; MOTOR_COUNT],
}

fn seconds_between(later: Instant, earlier: Instant) -> f32 {
    later
        .saturating_duration_since(earlier)
        .as_secs_f32()
        .max(MIN_DT)
}

/// Event-driven flight controller.
pub struct FlightController<S: ImuSensor, A: Actuators> {
    sensor: S,
    actuators: A,
    events: EventReceiver,
    shared: SharedState,
    estimator: Estimator,
    stabilizer: CascadeStabilizer<f32>,
    safety: SafetyMachine,
    calibration: Calibration,
    command: CommandSnapshot,
    max_duty: u16,
    sensor_timeout: Duration,
    reset_on_recovery: bool,
    last_sensor: Option<Instant>,
    last_cycle: Option<Instant>,
    avg_cycle: f32,
    timed_out: bool,
    outputs: [u16; MOTOR_COUNT],
}

impl<S: ImuSensor, A: Actuators> FlightController<S, A> {
    /// Creates a controller. The sensor must already be brought up.
    pub fn new(
        sensor: S,
        actuators: A,
        events: EventReceiver,
        shared: SharedState,
        config: &AppConfig,
    ) -> Self {
        let estimator = Estimator::new(
            config.estimator.gyro_error_dps,
            config.estimator.inv_sqrt,
            config.estimator.rate_smoothing,
        );
        let stabilizer = CascadeStabilizer::with_gains(shared.tuning.snapshot());
        Self {
            sensor,
            actuators,
            events,
            shared,
            estimator,
            stabilizer,
            safety: SafetyMachine::new(config.control.panic_angle),
            calibration: config.calibration,
            command: CommandSnapshot::default(),
            max_duty: config.control.max_duty,
            sensor_timeout: config.control.sensor_timeout(),
            reset_on_recovery: config.control.reset_integrators_on_recovery,
            last_sensor: None,
            last_cycle: None,
            avg_cycle: 0.0,
            timed_out: false,
            outputs: [0; MOTOR_COUNT],
        }
    }

    /// Safety state.
    pub fn safety_state(&self) -> SafetyState {
        self.safety.state()
    }

    /// Latest estimated attitude.
    pub fn attitude(&self) -> Attitude {
        self.estimator.attitude()
    }

    /// Average cycle time in seconds.
    pub fn avg_cycle(&self) -> f32 {
        self.avg_cycle
    }

    /// Working copy of the operator command.
    pub fn command(&self) -> CommandSnapshot {
        self.command
    }

    /// The PID cascade.
    pub fn stabilizer(&self) -> &CascadeStabilizer<f32> {
        &self.stabilizer
    }

    /// Last duty values written.
    pub fn outputs(&self) -> [u16; MOTOR_COUNT] {
        self.outputs
    }

    /// Runs cycles until `running` is cleared, then zeroes the actuators.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            "Control loop started, sensor timeout {} ms",
            self.sensor_timeout.as_millis()
        );
        while running.load(Ordering::Relaxed) {
            self.step();
        }
        self.shutdown();
    }

    /// Waits for the next wake-up and runs one cycle.
    pub fn step(&mut self) -> CycleReport {
        let wake = self.events.wait(self.sensor_timeout);
        self.cycle(wake, Instant::now())
    }

    /// Runs one cycle for `wake` at time `now`.
    pub fn cycle(&mut self, wake: Wake, now: Instant) -> CycleReport {
        let cycle_dt = match self.last_cycle {
            Some(last) => {
                let dt = seconds_between(now, last);
                self.avg_cycle = self.avg_cycle * AVG_KEEP + dt * (1.0 - AVG_KEEP);
                dt
            }
            None => MIN_DT,
        };
        self.last_cycle = Some(now);

        if let Wake::Events { sensor, command } = wake {
            if sensor {
                self.ingest_sample(now);
            }
            if command {
                self.command = *self.shared.command.lock();
            }
        }

        let stale = match (wake, self.last_sensor) {
            (Wake::Timeout, _) | (_, None) => true,
            (_, Some(last)) => now.saturating_duration_since(last) > self.sensor_timeout,
        };
        if stale && !self.timed_out {
            warn!("No sensor data, holding motors at zero");
        }
        self.timed_out = stale;

        self.stabilizer.apply_gains(&self.shared.tuning.snapshot());

        let action = if stale {
            self.safety.sensor_timeout()
        } else {
            let attitude = self.estimator.attitude();
            let before = self.safety.state();
            let action = self.safety.evaluate(
                self.command.throttle,
                attitude.angles.x,
                attitude.angles.y,
                self.command.clear_panic,
            );
            if before == SafetyState::Panic
                && self.safety.state() == SafetyState::Normal
                && self.reset_on_recovery
            {
                debug!("Clearing integrators after panic");
                self.stabilizer.reset();
            }
            action
        };

        self.outputs = match action {
            SafetyAction::RunCascade => {
                let attitude = self.estimator.attitude();
                let angles = attitude.angles;
                let rate = attitude.rate;
                let correction = self.stabilizer.control(
                    (self.command.x, self.command.y, self.command.z),
                    (angles.x, angles.y, angles.z),
                    (rate.x, rate.y, rate.z),
                    cycle_dt,
                );
                mix_x(self.command.throttle, correction, self.max_duty)
            }
            SafetyAction::ZeroActuators => [0; MOTOR_COUNT],
        };
        self.actuators.set_all(&self.outputs);

        *self.shared.status.lock() = StatusSnapshot {
            angles: self.estimator.attitude().angles,
            avg_cycle: self.avg_cycle,
            state: self.safety.state(),
            sensor_timed_out: stale,
            converged: self.estimator.ahrs().converged(),
        };

        CycleReport {
            action,
            timed_out: stale,
            outputs: self.outputs,
        }
    }

    fn ingest_sample(&mut self, now: Instant) {
        let sample = match self.sensor.read() {
            Ok(raw) => self.calibration.apply(raw),
            Err(e) => {
                warn!("Sensor read failed: {}", e);
                return;
            }
        };
        // A zero vector has no direction to normalize.
        if sample.accel.is_zero() {
            warn!("Zero accelerometer sample skipped");
            return;
        }
        let dt = self
            .last_sensor
            .map_or(MIN_DT, |last| seconds_between(now, last));
        if self.timed_out {
            info!("Sensor data resumed");
        }
        self.last_sensor = Some(now);
        self.estimator.ingest(sample.accel, sample.gyro, dt);
    }

    /// Zeroes every actuator.
    pub fn shutdown(&mut self) {
        self.outputs = [0; MOTOR_COUNT];
        self.actuators.zero_all();
        info!("Control loop stopped, motors zeroed");
    }
}
