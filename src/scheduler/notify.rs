// src/scheduler/notify.rs

//! Wake-up signalling for the control loop.
//!
//! Producers set a bit in a shared atomic word and push a unit token into
//! a single-slot channel. Posting never blocks, locks or allocates, so it is
//! safe from an interrupt-like context such as the sensor data-ready
//! callback. Repeated posts before the loop wakes coalesce into one wake-up
//! carrying every bit set so far.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SENSOR_BIT: u8 = 1 << 0;
const COMMAND_BIT: u8 = 1 << 1;

/// Why the control loop woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// One or more notifications arrived.
    Events {
        /// New sensor data is ready.
        sensor: bool,
        /// A new command was stored.
        command: bool,
    },
    /// Nothing arrived before the deadline.
    Timeout,
}

/// Creates a connected notifier and receiver.
pub fn event_channel() -> (Notifier, EventReceiver) {
    let (wake_tx, wake_rx) = bounded(1);
    let bits = Arc::new(AtomicU8::new(0));
    let notifier = Notifier {
        bits: Arc::clone(&bits),
        wake: wake_tx.clone(),
    };
    let receiver = EventReceiver {
        bits,
        wake: wake_rx,
        _keepalive: wake_tx,
    };
    (notifier, receiver)
}

/// Posting side, cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    bits: Arc<AtomicU8>,
    wake: Sender<()>,
}

impl Notifier {
    fn post(&self, bit: u8) {
        self.bits.fetch_or(bit, Ordering::AcqRel);
        // Full means a wake-up is already pending and will see the bit.
        let _ = self.wake.try_send(());
    }

    /// Signals that a new sensor sample can be read.
    pub fn sensor_ready(&self) {
        self.post(SENSOR_BIT);
    }

    /// Signals that the shared command was updated.
    pub fn command_ready(&self) {
        self.post(COMMAND_BIT);
    }

    /// Handle for the sensor data-ready source.
    pub fn sensor_signal(&self) -> SensorReadySignal {
        SensorReadySignal {
            notifier: self.clone(),
        }
    }
}

/// Handle given to the sensor data-ready source. It can only signal
/// sensor readiness.
#[derive(Debug, Clone)]
pub struct SensorReadySignal {
    notifier: Notifier,
}

impl SensorReadySignal {
    /// Posts a sensor-ready notification and returns immediately.
    pub fn signal(&self) {
        self.notifier.sensor_ready();
    }
}

/// Receiving side, owned by the control loop.
#[derive(Debug)]
pub struct EventReceiver {
    bits: Arc<AtomicU8>,
    wake: Receiver<()>,
    // The channel stays connected even when every notifier is dropped, so
    // waiting always runs to the deadline.
    _keepalive: Sender<()>,
}

impl EventReceiver {
    /// Blocks until a notification arrives or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Wake {
        let deadline = Instant::now() + timeout;
        loop {
            match self.wake.recv_deadline(deadline) {
                Ok(()) => {
                    let bits = self.bits.swap(0, Ordering::AcqRel);
                    // A token whose bits were already consumed by the
                    // previous wake-up.
                    if bits == 0 {
                        continue;
                    }
                    return Wake::Events {
                        sensor: bits & SENSOR_BIT != 0,
                        command: bits & COMMAND_BIT != 0,
                    };
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return Wake::Timeout
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const SHORT: Duration = Duration::from_millis(20);

    #[test]
    fn test_wait_times_out() {
        let (_notifier, events) = event_channel();
        let start = Instant::now();
        assert_eq!(Wake::Timeout, events.wait(SHORT));
        assert!(start.elapsed() >= SHORT);
    }

    /// Many posts before a wait collapse into a single wake-up.
    #[test]
    fn test_posts_coalesce() {
        let (notifier, events) = event_channel();
        for _ in 0..10 {
            notifier.sensor_ready();
        }
        notifier.command_ready();
        assert_eq!(
            Wake::Events {
                sensor: true,
                command: true
            },
            events.wait(SHORT)
        );
        assert_eq!(Wake::Timeout, events.wait(SHORT));
    }

    #[test]
    fn test_sensor_signal_sets_only_sensor() {
        let (notifier, events) = event_channel();
        notifier.sensor_signal().signal();
        assert_eq!(
            Wake::Events {
                sensor: true,
                command: false
            },
            events.wait(SHORT)
        );
    }

    /// Dropping every notifier does not turn waiting into a busy loop.
    #[test]
    fn test_wait_without_notifiers() {
        let (notifier, events) = event_channel();
        drop(notifier);
        let start = Instant::now();
        assert_eq!(Wake::Timeout, events.wait(SHORT));
        assert!(start.elapsed() >= SHORT);
    }

    #[test]
    fn test_wakes_from_other_thread() {
        let (notifier, events) = event_channel();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            notifier.command_ready();
        });
        assert_eq!(
            Wake::Events {
                sensor: false,
                command: true
            },
            events.wait(Duration::from_secs(2))
        );
        handle.join().unwrap();
    }
}
