// src/protocol/sequence.rs

//! Anti-replay ordering for inbound datagrams.

use super::SEQUENCE_MASK;

/// Highest accepted sequence number.
///
/// Sequence `0` is reserved: the sender uses it to prime the link after a
/// restart, and it always resets the tracker. Otherwise a datagram is only
/// accepted if its sequence is not lower than the highest seen so far.
/// Equal sequences are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceTracker {
    highest: u32,
}

impl SequenceTracker {
    /// Creates a tracker at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest accepted sequence.
    pub fn highest(&self) -> u32 {
        self.highest
    }

    /// Checks `sequence` and records it when accepted.
    pub fn accept(&mut self, sequence: u32) -> bool {
        let sequence = sequence & SEQUENCE_MASK;
        if sequence == 0 {
            self.highest = 0;
            true
        } else if sequence >= self.highest {
            self.highest = sequence;
            true
        } else {
            false
        }
    }
}
