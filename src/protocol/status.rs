// src/protocol/status.rs

//! Outbound status datagram.
//!
//! ```text
//! ┌────┬─────────┬──────┬───────────┬──────┬───────┬─────┐
//! │ id │ battery │ rssi │ avg cycle │ roll │ pitch │ yaw │
//! │ u8 │ f32     │ i8   │ f32 (s)   │ f32  │ f32   │ f32 │
//! └────┴─────────┴──────┴───────────┴──────┴───────┴─────┘
//! ```
//!
//! Packed and little-endian, 22 bytes, no sequence number.

use super::STATUS_MESSAGE_ID;

/// Encoded length of a status datagram.
pub const STATUS_DATAGRAM_LEN: usize = 22;

/// Periodic vehicle status.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatusUpdate {
    /// Battery voltage.
    pub battery: f32,
    /// Link signal strength in dBm.
    pub rssi: i8,
    /// Average control cycle time in seconds.
    pub avg_cycle: f32,
    /// Roll in degrees.
    pub roll: f32,
    /// Pitch in degrees.
    pub pitch: f32,
    /// Yaw in degrees.
    pub yaw: f32,
}

impl StatusUpdate {
    /// Packs the datagram.
    pub fn encode(&self) -> [u8; STATUS_DATAGRAM_LEN] {
        let mut out = [0u8; STATUS_DATAGRAM_LEN];
        out[0] = STATUS_MESSAGE_ID;
        out[1..5].copy_from_slice(&self.battery.to_le_bytes());
        out[5..6].copy_from_slice(&self.rssi.to_le_bytes());
        out[6..10].copy_from_slice(&self.avg_cycle.to_le_bytes());
        out[10..14].copy_from_slice(&self.roll.to_le_bytes());
        out[14..18].copy_from_slice(&self.pitch.to_le_bytes());
        out[18..22].copy_from_slice(&self.yaw.to_le_bytes());
        out
    }

    /// Unpacks a datagram. Returns `None` for a wrong id or short data.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < STATUS_DATAGRAM_LEN || data[0] != STATUS_MESSAGE_ID {
            return None;
        }
        let f = |at: usize| f32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
        Some(Self {
            battery: f(1),
            rssi: i8::from_le_bytes([data[5]]),
            avg_cycle: f(6),
            roll: f(10),
            pitch: f(14),
            yaw: f(18),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StatusUpdate {
        StatusUpdate {
            battery: 3.91,
            rssi: -67,
            avg_cycle: 0.002,
            roll: 1.5,
            pitch: -2.25,
            yaw: 170.0,
        }
    }

    #[test]
    fn test_status_layout() {
        let data = sample().encode();
        assert_eq!(STATUS_MESSAGE_ID, data[0]);
        assert_eq!(3.91_f32.to_le_bytes(), data[1..5]);
        assert_eq!((-67_i8) as u8, data[5]);
        assert_eq!(170.0_f32.to_le_bytes(), data[18..22]);
    }

    #[test]
    fn test_status_decode() {
        assert_eq!(Some(sample()), StatusUpdate::decode(&sample().encode()));
    }

    #[test]
    fn test_status_decode_rejects() {
        let data = sample().encode();
        assert_eq!(None, StatusUpdate::decode(&data[..21]));
        let mut wrong = data;
        wrong[0] = 69;
        assert_eq!(None, StatusUpdate::decode(&wrong));
    }
}
