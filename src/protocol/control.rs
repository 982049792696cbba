// src/protocol/control.rs

//! Control update messages: the ground-side encoder and the vehicle-side
//! decoder.

use super::{Header, SequenceTracker, CONTROL_MESSAGE_ID, HEADER_LEN};
use crate::error::{Error, Result};
use log::{debug, trace, warn};

/// Bit of the raw throttle pattern carrying the clear-panic flag.
pub const CLEAR_PANIC_FLAG: u32 = 1 << 31;

/// Minimum payload length of a control update.
pub const CONTROL_PAYLOAD_LEN: usize = 16;

/// Encoded length of a control update including the header.
pub const CONTROL_DATAGRAM_LEN: usize = HEADER_LEN + CONTROL_PAYLOAD_LEN;

/// Default throttle scale, `fraction * MAX_THROTTLE` is the commanded
/// throttle in duty units.
pub const DEFAULT_MAX_THROTTLE: f32 = 930.0;

/// Packs the clear-panic flag into the sign bit of a non-negative throttle
/// fraction.
///
/// The throttle fraction is never negative on the wire, so its sign bit is
/// free. Setting it also works for a zero throttle (`-0.0`).
pub fn encode_throttle_flag(fraction: f32, clear_panic: bool) -> f32 {
    let bits = fraction.to_bits() & !CLEAR_PANIC_FLAG;
    if clear_panic {
        f32::from_bits(bits | CLEAR_PANIC_FLAG)
    } else {
        f32::from_bits(bits)
    }
}

/// Splits a raw throttle field into the flag and the fraction with the
/// sign bit cleared.
pub fn decode_throttle_flag(raw: f32) -> (f32, bool) {
    let bits = raw.to_bits();
    (
        f32::from_bits(bits & !CLEAR_PANIC_FLAG),
        bits & CLEAR_PANIC_FLAG != 0,
    )
}

/// A control update as sent by the ground client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPacket {
    throttle: f32,
    x: f32,
    y: f32,
    z: f32,
    clear_panic: bool,
}

impl ControlPacket {
    /// Creates a control update.
    ///
    /// `throttle` is a fraction of the maximum throttle, `x` and `y` the
    /// roll and pitch angle set points in degrees, `z` the yaw rate set
    /// point in degrees per second. Negative throttle is rejected because
    /// the sign bit is reserved for `clear_panic`. Infinite or NaN values
    /// are rejected since the flight controller drops such updates.
    pub fn new(throttle: f32, x: f32, y: f32, z: f32, clear_panic: bool) -> Result<Self> {
        if throttle.is_sign_negative() || throttle.is_nan() {
            return Err(Error::InvalidParameter(format!(
                "throttle fraction must be non-negative, got {}",
                throttle
            )));
        }
        if ![throttle, x, y, z].iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "control values must be finite, got {} {} {} {}",
                throttle, x, y, z
            )));
        }
        Ok(Self {
            throttle,
            x,
            y,
            z,
            clear_panic,
        })
    }

    /// Encodes the datagram with the given sequence number.
    pub fn encode(&self, sequence: u32) -> [u8; CONTROL_DATAGRAM_LEN] {
        let mut out = [0u8; CONTROL_DATAGRAM_LEN];
        let header = Header {
            message_id: CONTROL_MESSAGE_ID,
            sequence,
        };
        out[..HEADER_LEN].copy_from_slice(&header.encode());
        let throttle = encode_throttle_flag(self.throttle, self.clear_panic);
        out[4..8].copy_from_slice(&throttle.to_le_bytes());
        out[8..12].copy_from_slice(&self.x.to_le_bytes());
        out[12..16].copy_from_slice(&self.y.to_le_bytes());
        out[16..20].copy_from_slice(&self.z.to_le_bytes());
        out
    }
}

/// Latest operator command as seen by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommandSnapshot {
    /// Throttle in duty units, fraction times the maximum throttle.
    pub throttle: f32,
    /// Roll angle set point in degrees.
    pub x: f32,
    /// Pitch angle set point in degrees.
    pub y: f32,
    /// Yaw rate set point in degrees per second.
    pub z: f32,
    /// Operator asked to leave panic.
    pub clear_panic: bool,
}

/// Why a datagram was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Shorter than the header, or a control payload under 16 bytes.
    TooShort,
    /// A payload field is infinite or NaN.
    NonFinite,
    /// Sequence below the highest accepted one.
    Stale {
        /// Sequence of the dropped datagram.
        sequence: u32,
        /// Highest accepted sequence.
        highest: u32,
    },
}

/// Result of decoding one datagram. Dropped datagrams are not errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decoded {
    /// An accepted control update.
    Control(CommandSnapshot),
    /// A well-formed header with an id this decoder does not handle.
    Unknown {
        /// Message id.
        id: u8,
    },
    /// Dropped without any state change.
    Rejected(RejectReason),
}

/// Vehicle-side decoder for the control link. Owns the sequence tracker.
#[derive(Debug, Clone)]
pub struct ControlLinkDecoder {
    tracker: SequenceTracker,
    max_throttle: f32,
}

impl ControlLinkDecoder {
    /// Creates a decoder scaling throttle fractions by `max_throttle`.
    pub fn new(max_throttle: f32) -> Self {
        Self {
            tracker: SequenceTracker::new(),
            max_throttle,
        }
    }

    /// Sequence tracker state.
    pub fn tracker(&self) -> &SequenceTracker {
        &self.tracker
    }

    /// Decodes one datagram.
    ///
    /// The tracker only advances for a complete control update with four
    /// finite fields, so a truncated, unknown or non-finite datagram cannot
    /// push the window forward.
    pub fn decode_datagram(&mut self, data: &[u8]) -> Decoded {
        let Some((header, payload)) = Header::parse(data) else {
            trace!("Dropping {} byte datagram, no header", data.len());
            return Decoded::Rejected(RejectReason::TooShort);
        };

        if header.message_id != CONTROL_MESSAGE_ID {
            warn!("Unknown message id {} received", header.message_id);
            return Decoded::Unknown {
                id: header.message_id,
            };
        }

        if payload.len() < CONTROL_PAYLOAD_LEN {
            trace!("Dropping control update, payload {} bytes", payload.len());
            return Decoded::Rejected(RejectReason::TooShort);
        }

        let field = |i: usize| {
            f32::from_le_bytes([
                payload[i * 4],
                payload[i * 4 + 1],
                payload[i * 4 + 2],
                payload[i * 4 + 3],
            ])
        };
        let raw = [field(0), field(1), field(2), field(3)];
        if !raw.iter().all(|v| v.is_finite()) {
            debug!(
                "Dropping control update {} with non-finite field {:?}",
                header.sequence, raw
            );
            return Decoded::Rejected(RejectReason::NonFinite);
        }

        if !self.tracker.accept(header.sequence) {
            let highest = self.tracker.highest();
            trace!(
                "Dropping stale control update {} (highest {})",
                header.sequence,
                highest
            );
            return Decoded::Rejected(RejectReason::Stale {
                sequence: header.sequence,
                highest,
            });
        }

        let (fraction, clear_panic) = decode_throttle_flag(raw[0]);

        Decoded::Control(CommandSnapshot {
            throttle: fraction * self.max_throttle,
            x: raw[1],
            y: raw[2],
            z: raw[3],
            clear_panic,
        })
    }
}

impl Default for ControlLinkDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_THROTTLE)
    }
}
