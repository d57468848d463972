//! Live frame validation
//!
//! Checks received payloads against a message's checksum field and tracks its
//! rolling counter across frames.

use crate::codec;
use crate::config::ValidationConfig;
use crate::database::Msg;
use crate::types::DbcError;

/// Outcome of validating one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    /// The checksum field does not match the value computed from the payload
    ChecksumMismatch { expected: u32, actual: u32 },
    /// Too many counter faults; the frame is rejected
    CounterMismatch { expected: u64, actual: u64 },
    /// The payload is shorter than the message or the checksum algorithm needs
    PayloadTooShort { needed: usize, actual: usize },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Rolling-counter and checksum checker for one message
///
/// A counter that does not advance by exactly one (modulo its width) raises
/// the fault count by one, up to `max_bad_counter`; a correct counter lowers
/// it again. Frames are accepted while the fault count stays below the limit.
#[derive(Debug)]
pub struct MessageValidator<'a> {
    msg: &'a Msg,
    config: ValidationConfig,
    last_counter: Option<u64>,
    counter_fail: u32,
}

impl<'a> MessageValidator<'a> {
    pub fn new(msg: &'a Msg, config: ValidationConfig) -> Self {
        Self {
            msg,
            config,
            last_counter: None,
            counter_fail: 0,
        }
    }

    pub fn msg(&self) -> &Msg {
        self.msg
    }

    /// Current counter fault count
    pub fn counter_faults(&self) -> u32 {
        self.counter_fail
    }

    /// Forget the counter history, e.g. after a bus timeout
    pub fn reset(&mut self) {
        self.last_counter = None;
        self.counter_fail = 0;
    }

    /// Validate one received payload
    pub fn validate(&mut self, payload: &[u8]) -> ValidationResult {
        let needed = self.msg.size as usize;
        if payload.len() < needed {
            return ValidationResult::PayloadTooShort {
                needed,
                actual: payload.len(),
            };
        }

        // Strategies that depend on the frame length must not see padding
        let payload = &payload[..needed];

        if !self.config.ignore_checksum {
            if let Some(result) = self.check_checksum(payload) {
                return result;
            }
        }

        if !self.config.ignore_counter {
            if let Some(result) = self.check_counter(payload) {
                return result;
            }
        }

        ValidationResult::Valid
    }

    fn check_checksum(&self, payload: &[u8]) -> Option<ValidationResult> {
        let signal = self.msg.checksum_signal()?;
        let expected = match signal.calc_checksum(self.msg.address, payload)? {
            Ok(expected) => expected,
            Err(err) => return Some(too_short(err, payload.len())),
        };
        let actual = match codec::get_raw_value(payload, signal) {
            Ok(raw) => field_value(raw, signal.size) as u32,
            Err(err) => return Some(too_short(err, payload.len())),
        };

        if expected != actual {
            log::debug!(
                "{} (0x{:X}): checksum mismatch, expected {} got {}",
                self.msg.name,
                self.msg.address,
                expected,
                actual
            );
            return Some(ValidationResult::ChecksumMismatch { expected, actual });
        }
        None
    }

    fn check_counter(&mut self, payload: &[u8]) -> Option<ValidationResult> {
        let signal = self.msg.counter_signal()?;
        let actual = match codec::get_raw_value(payload, signal) {
            Ok(raw) => field_value(raw, signal.size),
            Err(err) => return Some(too_short(err, payload.len())),
        };

        let previous = self.last_counter.replace(actual)?;
        let expected = field_value(previous as i64 + 1, signal.size);

        if actual == expected {
            self.counter_fail = self.counter_fail.saturating_sub(1);
            return None;
        }

        self.counter_fail = (self.counter_fail + 1).min(self.config.max_bad_counter);
        log::warn!(
            "{} (0x{:X}): counter skipped, expected {} got {} ({} faults)",
            self.msg.name,
            self.msg.address,
            expected,
            actual,
            self.counter_fail
        );

        if self.counter_fail >= self.config.max_bad_counter {
            Some(ValidationResult::CounterMismatch { expected, actual })
        } else {
            None
        }
    }
}

/// Raw value reduced to the field's width
fn field_value(raw: i64, size: u32) -> u64 {
    if size >= 64 {
        raw as u64
    } else {
        (raw as u64) & ((1u64 << size) - 1)
    }
}

fn too_short(err: DbcError, actual: usize) -> ValidationResult {
    match err {
        DbcError::PayloadTooShort { needed, actual } => {
            ValidationResult::PayloadTooShort { needed, actual }
        }
        _ => ValidationResult::PayloadTooShort { needed: 0, actual },
    }
}
