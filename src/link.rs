// src/link.rs

//! Control link worker.
//!
//! Receives operator datagrams on a UDP socket, decodes them and hands
//! accepted commands to the control loop.
//!
//! ```text
//! 1. Datagram arrives (at most 128 bytes are read)
//! 2. ControlLinkDecoder checks header, length and sequence
//! 3. Accepted command is copied into the shared command under its lock
//! 4. Sender address is registered as the telemetry peer
//! 5. Control loop is woken with a command notification
//! ```
//!
//! Stale, short, non-finite and unknown datagrams change nothing. The read timeout
//! bounds how long shutdown waits on an idle link.

use crate::error::Result;
use crate::protocol::{ControlLinkDecoder, Decoded, RECV_BUFFER_LEN};
use crate::scheduler::{Notifier, SharedCommand};
use log::{debug, error, info, trace};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Address of the last operator that sent an accepted command.
pub type PeerRegistry = Arc<Mutex<Option<SocketAddr>>>;

/// Read timeout so the loop can check the running flag.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// UDP receiver for the control link.
pub struct LinkServer {
    socket: UdpSocket,
    decoder: ControlLinkDecoder,
    command: SharedCommand,
    notifier: Notifier,
    peer: PeerRegistry,
}

impl LinkServer {
    /// Create a new link server on a bound socket.
    pub fn new(
        socket: UdpSocket,
        decoder: ControlLinkDecoder,
        command: SharedCommand,
        notifier: Notifier,
        peer: PeerRegistry,
    ) -> Self {
        Self {
            socket,
            decoder,
            command,
            notifier,
            peer,
        }
    }

    /// Decoder state, including the sequence tracker.
    pub fn decoder(&self) -> &ControlLinkDecoder {
        &self.decoder
    }

    /// Run the receive loop until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        self.socket.set_read_timeout(Some(READ_TIMEOUT))?;
        info!("Control link listening on {}", self.socket.local_addr()?);

        let mut buf = [0u8; RECV_BUFFER_LEN];
        while running.load(Ordering::Relaxed) {
            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) => {
                    self.handle_datagram(&buf[..len], from);
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                // ICMP port unreachable from an earlier telemetry send
                Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                    debug!("Ignoring connection reset on control link");
                }
                Err(e) => {
                    error!("Control link receive failed: {}", e);
                    return Err(e.into());
                }
            }
        }

        info!("Control link stopped");
        Ok(())
    }

    /// Processes one datagram from `from`. Returns `true` when it was an
    /// accepted control update.
    pub fn handle_datagram(&mut self, data: &[u8], from: SocketAddr) -> bool {
        let Decoded::Control(command) = self.decoder.decode_datagram(data) else {
            return false;
        };

        *self.command.lock() = command;

        {
            let mut peer = self.peer.lock();
            if *peer != Some(from) {
                info!("Operator at {}", from);
                *peer = Some(from);
            }
        }

        self.notifier.command_ready();
        trace!(
            "Command from {}: throttle {:.1}, x {:.1}, y {:.1}, z {:.1}, clear {}",
            from,
            command.throttle,
            command.x,
            command.y,
            command.z,
            command.clear_panic
        );
        true
    }
}
