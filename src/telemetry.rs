// src/telemetry.rs

//! Telemetry worker.
//!
//! Sends a [`StatusUpdate`] to the last operator at a fixed interval. No
//! operator registered means nothing is sent. Send failures are logged and
//! the next interval tries again.

use crate::drivers::{BatteryMonitor, SignalMonitor};
use crate::error::Result;
use crate::link::PeerRegistry;
use crate::protocol::StatusUpdate;
use crate::scheduler::StatusBoard;
use log::{info, trace, warn};
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Periodic status sender.
pub struct TelemetryPublisher<B: BatteryMonitor, R: SignalMonitor> {
    socket: UdpSocket,
    peer: PeerRegistry,
    status: StatusBoard,
    battery: B,
    signal: R,
    interval: Duration,
}

impl<B: BatteryMonitor, R: SignalMonitor> TelemetryPublisher<B, R> {
    /// Create a publisher sending from `socket`, usually a clone of the
    /// control link socket so replies come from the well-known port.
    pub fn new(
        socket: UdpSocket,
        peer: PeerRegistry,
        status: StatusBoard,
        battery: B,
        signal: R,
        interval: Duration,
    ) -> Self {
        Self {
            socket,
            peer,
            status,
            battery,
            signal,
            interval,
        }
    }

    /// Builds the current status datagram.
    pub fn status_update(&mut self) -> StatusUpdate {
        let snapshot = *self.status.lock();
        StatusUpdate {
            battery: self.battery.voltage(),
            rssi: self.signal.rssi(),
            avg_cycle: snapshot.avg_cycle,
            roll: snapshot.angles.x,
            pitch: snapshot.angles.y,
            yaw: snapshot.angles.z,
        }
    }

    /// Sends one status datagram. Returns `false` when no operator is
    /// registered.
    pub fn publish_once(&mut self) -> Result<bool> {
        let Some(target) = *self.peer.lock() else {
            return Ok(false);
        };
        let update = self.status_update();
        self.socket.send_to(&update.encode(), target)?;
        trace!("Status sent to {}", target);
        Ok(true)
    }

    /// Run the publisher loop until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            "Telemetry started, every {} ms once an operator is known",
            self.interval.as_millis()
        );
        while running.load(Ordering::Relaxed) {
            if let Err(e) = self.publish_once() {
                // Not fatal, the operator may simply be gone
                warn!("Failed to send status: {}", e);
            }
            thread::sleep(self.interval);
        }
        info!("Telemetry stopped");
    }
}
