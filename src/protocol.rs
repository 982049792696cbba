// src/protocol.rs

//! # Control-Link Wire Protocol
//!
//! Every datagram starts with a packed four-byte header:
//!
//! ```text
//! ┌────────────┬──────────────────────────┐
//! │ id (u8)    │ sequence (u24, LE)       │
//! └────────────┴──────────────────────────┘
//! ```
//!
//! Inbound control updates (id 69) carry four little-endian `f32` values
//! after the header: throttle fraction, x, y, z. The sign bit of the
//! throttle fraction carries the clear-panic flag, see
//! [`decode_throttle_flag`].
//!
//! Outbound status datagrams (id 20) carry no sequence number, see
//! [`StatusUpdate`].
//!
//! Datagrams are never fragmented. Anything longer than
//! [`RECV_BUFFER_LEN`] is truncated by the receive call.

pub mod control;
pub use control::*;
pub mod sequence;
pub use sequence::*;
pub mod status;
pub use status::*;

/// Default UDP port of the control link.
pub const DEFAULT_PORT: u16 = 25565;

/// Receive buffer size for inbound datagrams.
pub const RECV_BUFFER_LEN: usize = 128;

/// Length of the id + sequence header.
pub const HEADER_LEN: usize = 4;

/// Message id of a control update.
pub const CONTROL_MESSAGE_ID: u8 = 69;

/// Message id of a status datagram.
pub const STATUS_MESSAGE_ID: u8 = 20;

/// Sequence numbers are 24 bits wide.
pub const SEQUENCE_MASK: u32 = 0x00FF_FFFF;

/// Datagram header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Message id.
    pub message_id: u8,
    /// 24-bit sequence number.
    pub sequence: u32,
}

impl Header {
    /// Splits a datagram into its header and payload. Returns `None` when
    /// the datagram is shorter than the header.
    pub fn parse(data: &[u8]) -> Option<(Header, &[u8])> {
        if data.len() < HEADER_LEN {
            return None;
        }
        let sequence = u32::from_le_bytes([data[1], data[2], data[3], 0]);
        Some((
            Header {
                message_id: data[0],
                sequence,
            },
            &data[HEADER_LEN..],
        ))
    }

    /// Packs the header. Sequence bits above 24 are dropped.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let seq = (self.sequence & SEQUENCE_MASK).to_le_bytes();
        [self.message_id, seq[0], seq[1], seq[2]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_parse() {
        let data = [69, 0x03, 0x02, 0x01, 0xAA];
        let (header, payload) = Header::parse(&data).unwrap();
        assert_eq!(CONTROL_MESSAGE_ID, header.message_id);
        assert_eq!(0x010203, header.sequence);
        assert_eq!(&[0xAA], payload);
    }

    #[test]
    fn test_header_too_short() {
        assert!(Header::parse(&[69, 1, 2]).is_none());
        assert!(Header::parse(&[]).is_none());
    }

    /// Sequence numbers wrap at 24 bits.
    #[test]
    fn test_header_encode_masks_sequence() {
        let header = Header {
            message_id: 7,
            sequence: 0x1234_5678,
        };
        assert_eq!([7, 0x78, 0x56, 0x34], header.encode());
    }
}
