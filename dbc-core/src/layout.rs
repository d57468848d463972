//! Bit layout resolution
//!
//! Turns a signal's declared `start_bit|size@endian` triple into the absolute
//! most/least significant bit positions used for extraction and insertion.
//!
//! Bit `n` always means bit `n % 8` (LSB = 0) of byte `n / 8`.
//!
//! - Little-endian (Intel): `start_bit` is the LSB. The signal grows towards
//!   higher bit numbers, so `msb = lsb + size - 1`.
//! - Big-endian (Motorola): `start_bit` is the MSB. The signal grows towards
//!   lower bits inside a byte and then continues at bit 7 of the *next* byte.
//!   Walking that order is the same as walking the reflected sequence
//!   `7, 6, .., 0, 15, 14, .., 8, 23, ..` linearly.
//!
//! For big-endian signals that cross a byte boundary `lsb > msb` numerically;
//! callers must not assume `lsb <= msb`.

use crate::types::{DbcError, Result};

/// Largest payload (in bytes) a signal may address (CAN-FD frame)
pub const MAX_PAYLOAD_BYTES: u32 = 64;

/// Widest signal supported by the raw value codec
pub const MAX_SIGNAL_BITS: u32 = 64;

const MAX_BITS: u32 = MAX_PAYLOAD_BYTES * 8;

/// Resolved bit positions of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRange {
    pub msb: u32,
    pub lsb: u32,
}

impl BitRange {
    /// Index of the last payload byte the signal touches
    pub fn last_byte(&self) -> u32 {
        self.msb.max(self.lsb) / 8
    }

    /// Number of payload bytes needed to hold the signal
    pub fn required_bytes(&self) -> usize {
        self.last_byte() as usize + 1
    }

    /// Set of bits covered by the signal
    pub fn occupancy(&self, little_endian: bool) -> BitMask {
        let mut mask = BitMask::default();
        if little_endian {
            for bit in self.lsb..=self.msb {
                mask.insert(bit);
            }
        } else {
            for pos in reflect(self.msb)..=reflect(self.lsb) {
                mask.insert(reflect(pos));
            }
        }
        mask
    }
}

/// Maps a bit number to its position in the big-endian walk order.
///
/// The mapping is its own inverse.
pub fn reflect(bit: u32) -> u32 {
    (bit / 8) * 8 + (7 - bit % 8)
}

/// Resolve a declared signal position into its `(msb, lsb)` pair
pub fn resolve(start_bit: u32, size: u32, little_endian: bool) -> Result<BitRange> {
    let invalid = || DbcError::InvalidLayout { start_bit, size };

    if size == 0 || size > MAX_SIGNAL_BITS || start_bit >= MAX_BITS {
        return Err(invalid());
    }

    if little_endian {
        let msb = start_bit + size - 1;
        if msb >= MAX_BITS {
            return Err(invalid());
        }
        Ok(BitRange {
            msb,
            lsb: start_bit,
        })
    } else {
        let last = reflect(start_bit) + size - 1;
        if last >= MAX_BITS {
            return Err(invalid());
        }
        Ok(BitRange {
            msb: start_bit,
            lsb: reflect(last),
        })
    }
}

/// Fixed-size bitset over every addressable payload bit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitMask([u64; (MAX_BITS / 64) as usize]);

impl BitMask {
    pub fn insert(&mut self, bit: u32) {
        self.0[(bit / 64) as usize] |= 1u64 << (bit % 64);
    }

    pub fn contains(&self, bit: u32) -> bool {
        self.0[(bit / 64) as usize] & (1u64 << (bit % 64)) != 0
    }

    pub fn intersects(&self, other: &BitMask) -> bool {
        self.0.iter().zip(other.0.iter()).any(|(a, b)| a & b != 0)
    }

    pub fn count(&self) -> u32 {
        self.0.iter().map(|w| w.count_ones()).sum()
    }
}
