// src/main.rs

//! attitude-fc - quadrotor attitude control daemon
//!
//! Runs the control loop against the simulated sensor and motors, with the
//! UDP control link and status telemetry on their own threads.
//!
//! ## Threads
//!
//! - **main**: control loop, woken by sensor and command notifications
//! - **imu-data-ready**: simulated data-ready interrupt
//! - **control-link**: receives and decodes operator datagrams
//! - **telemetry**: sends status to the last operator

use attitude_fc::calibration::run_calibration;
use attitude_fc::drivers::bring_up;
use attitude_fc::drivers::sim::{
    spawn_data_ready, FixedBattery, FixedSignal, SimulatedActuators, SimulatedImu,
};
use attitude_fc::error::{Error, Result};
use attitude_fc::link::{LinkServer, PeerRegistry};
use attitude_fc::protocol::ControlLinkDecoder;
use attitude_fc::scheduler::{event_channel, FlightController, SharedState};
use attitude_fc::telemetry::TelemetryPublisher;
use attitude_fc::{AppConfig, TuningHandle};
use clap::Parser;
use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Battery voltage reported by the simulated monitor.
const SIM_BATTERY_VOLTS: f32 = 3.9;

/// Signal strength reported by the simulated radio.
const SIM_RSSI_DBM: i8 = -50;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter, overrides `logging.level`. `RUST_LOG` overrides both.
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Simulated sensor sample rate
    #[arg(long, default_value_t = 500)]
    sample_rate_hz: u32,

    /// Measure sensor offsets and store them in the configuration file
    #[arg(long)]
    calibrate: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
}

fn join(handle: JoinHandle<()>) {
    let name = handle.thread().name().unwrap_or("worker").to_string();
    if handle.join().is_err() {
        log::error!("{} thread panicked", name);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    if args.dump_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    log::info!("attitude-fc v{} starting", env!("CARGO_PKG_VERSION"));
    match &args.config {
        Some(path) => log::info!("Using config: {}", path.display()),
        None => log::info!("No config file, using defaults"),
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let (notifier, events) = event_channel();

    let mut imu = SimulatedImu::new(config.simulation);
    bring_up(&mut imu)?;
    let ticker = spawn_data_ready(
        notifier.sensor_signal(),
        args.sample_rate_hz,
        Arc::clone(&running),
    )?;

    if args.calibrate {
        let result = run_calibration(
            &mut imu,
            &events,
            config.estimator.calibration_iterations,
            config.control.sensor_timeout(),
        );
        running.store(false, Ordering::Relaxed);
        join(ticker);
        config.calibration = result?;
        match &args.config {
            Some(path) => {
                config.save(path)?;
                log::info!("Calibration saved to {}", path.display());
            }
            None => print!("{}", config.to_toml()?),
        }
        return Ok(());
    }

    if config.calibration.is_identity() {
        log::warn!("No sensor calibration, run with --calibrate on a level surface");
    }

    let shared = SharedState::new(TuningHandle::new(config.tuning));
    let peer = PeerRegistry::default();

    let bind_addr = config.network.bind_addr()?;
    let socket = UdpSocket::bind(bind_addr)
        .map_err(|e| Error::Other(format!("Failed to bind to {}: {}", bind_addr, e)))?;
    let telemetry_socket = socket.try_clone()?;

    let mut link = LinkServer::new(
        socket,
        ControlLinkDecoder::new(config.control.max_throttle),
        Arc::clone(&shared.command),
        notifier.clone(),
        Arc::clone(&peer),
    );
    let link_running = Arc::clone(&running);
    let link_handle = thread::Builder::new()
        .name("control-link".to_string())
        .spawn(move || {
            if let Err(e) = link.run(&link_running) {
                log::error!("Control link error: {}", e);
                link_running.store(false, Ordering::Relaxed);
            }
        })
        .map_err(|e| Error::Other(format!("Failed to spawn control link: {}", e)))?;

    let mut telemetry = TelemetryPublisher::new(
        telemetry_socket,
        peer,
        Arc::clone(&shared.status),
        FixedBattery(SIM_BATTERY_VOLTS),
        FixedSignal(SIM_RSSI_DBM),
        config.network.status_interval(),
    );
    let telemetry_running = Arc::clone(&running);
    let telemetry_handle = thread::Builder::new()
        .name("telemetry".to_string())
        .spawn(move || telemetry.run(&telemetry_running))
        .map_err(|e| Error::Other(format!("Failed to spawn telemetry: {}", e)))?;

    log::info!("attitude-fc running. Press Ctrl-C to stop.");

    let mut controller =
        FlightController::new(imu, SimulatedActuators::new(), events, shared, &config);
    controller.run(&running);

    join(ticker);
    join(link_handle);
    join(telemetry_handle);

    log::info!("attitude-fc stopped");
    Ok(())
}
