//! Per-database checksum configuration

use super::SignalType;
use crate::database::Signal;
use crate::types::ParseErrorKind;
use serde::{Deserialize, Serialize};

/// Where a database keeps its checksum and counter fields, and how to check them
///
/// Sizes and start bits set to `None` are not enforced. Start bits are
/// compared modulo 8, i.e. they name the bit within the field's first byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumState {
    #[serde(default)]
    pub checksum_size: Option<u32>,
    #[serde(default)]
    pub counter_size: Option<u32>,
    #[serde(default)]
    pub checksum_start_bit: Option<u32>,
    #[serde(default)]
    pub counter_start_bit: Option<u32>,
    pub little_endian: bool,
    pub checksum_type: SignalType,
    /// Extra per-signal setup run after the checksum/counter checks
    #[serde(default)]
    pub setup: SetupHook,
}

/// Additional signal setup applied to every signal of a database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupHook {
    #[default]
    None,
    /// Tag signals ending in `Counter` as counters and signals ending in
    /// `Checksum` with the configured checksum type
    SuffixMatch,
}

impl ChecksumState {
    fn preset(
        checksum_size: u32,
        counter_size: Option<u32>,
        checksum_start_bit: u32,
        counter_start_bit: Option<u32>,
        little_endian: bool,
        checksum_type: SignalType,
    ) -> Self {
        Self {
            checksum_size: Some(checksum_size),
            counter_size,
            checksum_start_bit: Some(checksum_start_bit),
            counter_start_bit,
            little_endian,
            checksum_type,
            setup: SetupHook::None,
        }
    }

    /// Built-in configuration for a database, selected by name prefix
    pub fn for_dbc(dbc_name: &str) -> Option<Self> {
        let starts = |prefixes: &[&str]| prefixes.iter().any(|p| dbc_name.starts_with(p));

        let state = if starts(&["honda_", "acura_"]) {
            Self::preset(4, Some(2), 3, Some(5), false, SignalType::HondaChecksum)
        } else if starts(&["toyota_", "lexus_"]) {
            Self::preset(8, None, 7, None, false, SignalType::ToyotaChecksum)
        } else if starts(&["hyundai_canfd"]) {
            Self::preset(16, None, 0, None, true, SignalType::HkgCanFdChecksum)
        } else if starts(&["vw_mqb", "vw_meb"]) {
            Self::preset(8, Some(4), 0, Some(0), true, SignalType::VolkswagenMqbMebChecksum)
        } else if starts(&["vw_golf_mk4"]) {
            Self::preset(8, Some(4), 0, None, true, SignalType::XorChecksum)
        } else if starts(&["subaru_global_"]) {
            Self::preset(8, None, 0, None, true, SignalType::SubaruChecksum)
        } else if starts(&["chrysler_"]) {
            Self::preset(8, None, 7, None, false, SignalType::ChryslerChecksum)
        } else if starts(&["fca_giorgio"]) {
            Self::preset(8, None, 7, None, false, SignalType::FcaGiorgioChecksum)
        } else if starts(&["comma_body"]) {
            Self::preset(8, Some(4), 7, Some(3), false, SignalType::PedalChecksum)
        } else if starts(&["tesla_model3_party"]) {
            Self {
                setup: SetupHook::SuffixMatch,
                ..Self::preset(8, None, 0, None, true, SignalType::TeslaChecksum)
            }
        } else if starts(&["byd_"]) {
            Self::preset(8, Some(4), 7, Some(3), false, SignalType::BydChecksum)
        } else {
            return None;
        };
        Some(state)
    }
}

fn check_field(
    signal: &Signal,
    size: Option<u32>,
    start_bit: Option<u32>,
    little_endian: bool,
) -> Result<(), ParseErrorKind> {
    let fail = |what: String| Err(ParseErrorKind::ChecksumLayout(what));

    if let Some(size) = size {
        if signal.size != size {
            return fail(format!("{} is not {} bits long", signal.name, size));
        }
    }
    if let Some(start_bit) = start_bit {
        if signal.start_bit % 8 != start_bit {
            return fail(format!("{} starts at wrong bit", signal.name));
        }
    }
    if signal.is_little_endian != little_endian {
        return fail(format!("{} has wrong endianness", signal.name));
    }
    Ok(())
}

/// Assign the checksum/counter role of a freshly parsed signal
///
/// Signals named `CHECKSUM` and `COUNTER` are validated against `state`
/// and tagged; then the state's [`SetupHook`] runs.
pub fn setup_signal(signal: &mut Signal, state: &ChecksumState) -> Result<(), ParseErrorKind> {
    match signal.name.as_str() {
        "CHECKSUM" => {
            check_field(
                signal,
                state.checksum_size,
                state.checksum_start_bit,
                state.little_endian,
            )?;
            if !state.checksum_type.is_checksum() {
                return Err(ParseErrorKind::ChecksumLayout(
                    "CHECKSUM calculate function not supplied".to_string(),
                ));
            }
            signal.signal_type = state.checksum_type;
        }
        "COUNTER" => {
            check_field(
                signal,
                state.counter_size,
                state.counter_start_bit,
                state.little_endian,
            )?;
            signal.signal_type = SignalType::Counter;
        }
        _ => {}
    }

    match state.setup {
        SetupHook::None => {}
        SetupHook::SuffixMatch => {
            if signal.name.ends_with("Counter") {
                signal.signal_type = SignalType::Counter;
            } else if signal.name.ends_with("Checksum") {
                signal.signal_type = state.checksum_type;
            }
        }
    }

    if signal.signal_type != SignalType::Default {
        log::debug!("{} tagged as {:?}", signal.name, signal.signal_type);
    }
    Ok(())
}
