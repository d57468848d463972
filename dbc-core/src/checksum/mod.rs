//! Checksum and rolling-counter strategies
//!
//! Each database selects at most one checksum algorithm (through its
//! [`ChecksumState`]). During parsing the tag is stored on the signal as a
//! [`SignalType`], which dispatches to one of the fixed strategies below.

mod algorithms;
mod state;
mod volkswagen;

pub use algorithms::{
    Byd, Chrysler, Counter, FcaGiorgio, HkgCanFd, Honda, Pedal, Subaru, Tesla, Toyota,
    VolkswagenMqbMeb, Xor,
};
pub use state::{setup_signal, ChecksumState, SetupHook};

use crate::database::Signal;
use crate::types::Result;
use serde::{Deserialize, Serialize};

/// Role of a signal with respect to message integrity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// Ordinary data signal
    #[default]
    Default,
    /// Rolling counter
    Counter,
    HondaChecksum,
    ToyotaChecksum,
    PedalChecksum,
    VolkswagenMqbMebChecksum,
    XorChecksum,
    SubaruChecksum,
    ChryslerChecksum,
    HkgCanFdChecksum,
    FcaGiorgioChecksum,
    TeslaChecksum,
    BydChecksum,
}

impl SignalType {
    /// True for every checksum variant (not counters, not data)
    pub fn is_checksum(self) -> bool {
        !matches!(self, SignalType::Default | SignalType::Counter)
    }

    /// Strategy computing the expected field value
    pub fn strategy(self) -> Option<&'static dyn Checksum> {
        let strategy: &'static dyn Checksum = match self {
            SignalType::Default => return None,
            SignalType::Counter => &Counter,
            SignalType::HondaChecksum => &Honda,
            SignalType::ToyotaChecksum => &Toyota,
            SignalType::PedalChecksum => &Pedal,
            SignalType::VolkswagenMqbMebChecksum => &VolkswagenMqbMeb,
            SignalType::XorChecksum => &Xor,
            SignalType::SubaruChecksum => &Subaru,
            SignalType::ChryslerChecksum => &Chrysler,
            SignalType::HkgCanFdChecksum => &HkgCanFd,
            SignalType::FcaGiorgioChecksum => &FcaGiorgio,
            SignalType::TeslaChecksum => &Tesla,
            SignalType::BydChecksum => &Byd,
        };
        Some(strategy)
    }
}

/// Which payload bytes a strategy reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Reads only the signal's own bits
    Field,
    /// Every byte except the one holding the checksum field
    AllButFieldByte,
    /// Every byte except the first
    AllButFirstByte,
    /// Every byte except the last
    AllButLastByte,
    /// Every byte, with the low nibble of the last byte masked out
    AllButLastNibble,
    /// Bytes from the given index to the end
    FromByte(usize),
}

/// A per-manufacturer integrity algorithm
///
/// Implementations are pure: the same `(address, signal, payload)` always
/// yields the same value, and a payload too short for the algorithm yields
/// [`DbcError::PayloadTooShort`](crate::DbcError::PayloadTooShort) instead of
/// reading out of bounds.
pub trait Checksum: Sync {
    /// Compute the expected field value for `payload`
    fn compute(&self, address: u32, signal: &Signal, payload: &[u8]) -> Result<u32>;

    /// Which payload bytes `compute` reads
    fn coverage(&self) -> Coverage;
}
