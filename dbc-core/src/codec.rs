//! Raw value codec
//!
//! Extracts and inserts signal values using the resolved msb/lsb positions,
//! walking the payload one byte at a time in the signal's byte order.

use crate::database::{Msg, Signal};
use crate::types::{DbcError, Result};

/// A physical value to pack into a named signal
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPackValue {
    pub name: String,
    pub value: f64,
}

impl SignalPackValue {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Payload byte indices covered by `signal`, from the byte holding the MSB
/// to the byte holding the LSB
fn bytes_msb_first(signal: &Signal) -> Box<dyn Iterator<Item = usize>> {
    let msb_byte = (signal.msb / 8) as usize;
    let lsb_byte = (signal.lsb / 8) as usize;
    if signal.is_little_endian {
        Box::new((lsb_byte..=msb_byte).rev())
    } else {
        Box::new(msb_byte..=lsb_byte)
    }
}

fn ensure_fits(payload_len: usize, signal: &Signal) -> Result<()> {
    let needed = signal.range().required_bytes();
    if payload_len < needed {
        return Err(DbcError::PayloadTooShort {
            needed,
            actual: payload_len,
        });
    }
    Ok(())
}

fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Extract the raw (unscaled) value of a signal, sign-extended if signed
pub fn get_raw_value(payload: &[u8], signal: &Signal) -> Result<i64> {
    ensure_fits(payload.len(), signal)?;

    let msb_byte = signal.msb / 8;
    let lsb_byte = signal.lsb / 8;
    let mut remaining = signal.size;
    let mut raw: u64 = 0;

    for idx in bytes_msb_first(signal) {
        if remaining == 0 {
            break;
        }
        let byte = idx as u32;
        let lo = if byte == lsb_byte { signal.lsb % 8 } else { 0 };
        let hi = if byte == msb_byte { signal.msb % 8 } else { 7 };
        let width = hi - lo + 1;
        let chunk = (u64::from(payload[idx]) >> lo) & low_mask(width);
        raw |= chunk << (remaining - width);
        remaining -= width;
    }

    Ok(if signal.is_signed {
        sign_extend(raw, signal.size)
    } else {
        raw as i64
    })
}

/// Insert a raw value into the signal's bits, leaving all other bits intact
pub fn set_value(payload: &mut [u8], signal: &Signal, raw: i64) -> Result<()> {
    ensure_fits(payload.len(), signal)?;

    let lsb_byte = (signal.lsb / 8) as usize;
    let mut value = (raw as u64) & low_mask(signal.size);
    let mut remaining = signal.size;

    let order: Vec<usize> = bytes_msb_first(signal).collect();
    for idx in order.into_iter().rev() {
        if remaining == 0 {
            break;
        }
        let shift = if idx == lsb_byte { signal.lsb % 8 } else { 0 };
        let width = remaining.min(8 - shift);
        let mask = (low_mask(width) as u8) << shift;
        payload[idx] = (payload[idx] & !mask) | (((value & low_mask(width)) as u8) << shift);
        remaining -= width;
        value >>= width;
    }

    Ok(())
}

/// Decode the physical value (`raw * factor + offset`)
pub fn decode(payload: &[u8], signal: &Signal) -> Result<f64> {
    let raw = get_raw_value(payload, signal)?;
    Ok(raw as f64 * signal.factor + signal.offset)
}

/// Convert a physical value to the nearest raw value
pub fn to_raw(signal: &Signal, value: f64) -> i64 {
    ((value - signal.offset) / signal.factor).round() as i64
}

/// Encode a physical value into the payload
pub fn encode(payload: &mut [u8], signal: &Signal, value: f64) -> Result<()> {
    set_value(payload, signal, to_raw(signal, value))
}

/// Build a payload for `msg` from physical values
///
/// The counter (if given and the message declares one) is written after the
/// data signals, and the checksum last so it covers the final payload.
pub fn pack(msg: &Msg, values: &[SignalPackValue], counter: Option<i64>) -> Result<Vec<u8>> {
    let mut payload = vec![0u8; msg.size as usize];

    for value in values {
        match msg.signal(&value.name) {
            Some(signal) => encode(&mut payload, signal, value.value)?,
            None => log::warn!(
                "Undefined signal '{}' in message {} (0x{:X}), skipping",
                value.name,
                msg.name,
                msg.address
            ),
        }
    }

    if let (Some(counter), Some(signal)) = (counter, msg.counter_signal()) {
        set_value(&mut payload, signal, counter)?;
    }

    if let Some(signal) = msg.checksum_signal() {
        if let Some(expected) = signal.calc_checksum(msg.address, &payload) {
            set_value(&mut payload, signal, i64::from(expected?))?;
        }
    }

    Ok(payload)
}

/// Sign-extend a value from N bits to 64 bits
fn sign_extend(value: u64, bit_length: u32) -> i64 {
    if bit_length >= 64 {
        return value as i64;
    }

    let sign_bit = 1u64 << (bit_length - 1);
    if (value & sign_bit) != 0 {
        let mask = !0u64 << bit_length;
        (value | mask) as i64
    } else {
        value as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::tests::signal;
    use proptest::prelude::*;

    #[test]
    fn test_little_endian_cross_byte() {
        let data = [0xAB, 0xCD, 0xEF, 0x12];
        assert_eq!(get_raw_value(&data, &signal("s", 0, 8, true)).unwrap(), 0xAB);
        assert_eq!(get_raw_value(&data, &signal("s", 0, 16, true)).unwrap(), 0xCDAB);
        assert_eq!(get_raw_value(&data, &signal("s", 4, 8, true)).unwrap(), 0xDA);
    }

    #[test]
    fn test_big_endian_cross_byte() {
        let data = [0xAB, 0xCD, 0xEF, 0x12];
        assert_eq!(get_raw_value(&data, &signal("s", 7, 8, false)).unwrap(), 0xAB);
        assert_eq!(get_raw_value(&data, &signal("s", 7, 16, false)).unwrap(), 0xABCD);
        // Low nibble of byte 0 followed by byte 1
        assert_eq!(get_raw_value(&data, &signal("s", 3, 12, false)).unwrap(), 0xBCD);
        // Starts at bit 0 of byte 1, runs into byte 2
        assert_eq!(get_raw_value(&data, &signal("s", 8, 8, false)).unwrap(), 0xF7);
    }

    #[test]
    fn test_signed_values() {
        let mut sig = signal("s", 0, 8, true);
        sig.is_signed = true;
        assert_eq!(get_raw_value(&[0xFF], &sig).unwrap(), -1);
        assert_eq!(get_raw_value(&[0x7F], &sig).unwrap(), 127);

        let mut wide = signal("s", 7, 16, false);
        wide.is_signed = true;
        assert_eq!(get_raw_value(&[0x80, 0x00], &wide).unwrap(), -32768);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0x7F, 8), 127);
        assert_eq!(sign_extend(0xFF, 8), -1);
        assert_eq!(sign_extend(0x8000, 16), -32768);
        assert_eq!(sign_extend(u64::MAX, 64), -1);
    }

    #[test]
    fn test_set_value_preserves_neighbours() {
        let mut data = [0xFFu8; 4];
        set_value(&mut data, &signal("s", 3, 12, false), 0).unwrap();
        assert_eq!(data, [0xF0, 0x00, 0xFF, 0xFF]);

        let mut data = [0u8; 4];
        set_value(&mut data, &signal("s", 4, 8, true), 0xDA).unwrap();
        assert_eq!(data, [0xA0, 0x0D, 0x00, 0x00]);
    }

    #[test]
    fn test_payload_too_short() {
        let err = get_raw_value(&[0x00], &signal("s", 0, 16, true)).unwrap_err();
        assert!(matches!(err, DbcError::PayloadTooShort { needed: 2, actual: 1 }));

        let mut data = [0u8; 2];
        assert!(set_value(&mut data, &signal("s", 8, 8, false), 1).is_err());
    }

    #[test]
    fn test_physical_decode() {
        let mut rpm = signal("RPM", 0, 16, true);
        rpm.factor = 0.25;
        let data = [0x10, 0x27, 0, 0, 0, 0, 0, 0];
        assert_eq!(decode(&data, &rpm).unwrap(), 2500.0);

        let mut temp = signal("Temp", 16, 8, true);
        temp.offset = -40.0;
        let mut data = [0u8; 8];
        encode(&mut data, &temp, 90.0).unwrap();
        assert_eq!(data[2], 130);
        assert_eq!(decode(&data, &temp).unwrap(), 90.0);
    }

    #[test]
    fn test_pack_skips_unknown_signals() {
        let msg = Msg {
            name: "EngineData".to_string(),
            address: 0x200,
            size: 4,
            sender: None,
            signals: vec![signal("Speed", 0, 16, true)],
        };
        let payload = pack(
            &msg,
            &[SignalPackValue::new("Speed", 513.0), SignalPackValue::new("Bogus", 1.0)],
            None,
        )
        .unwrap();
        assert_eq!(payload, vec![0x01, 0x02, 0x00, 0x00]);
    }

    proptest! {
        #[test]
        fn prop_raw_round_trip(start in 0u32..64, size in 1u32..=32, little in any::<bool>(), raw in any::<u32>()) {
            let range = match crate::layout::resolve(start, size, little) {
                Ok(r) if r.required_bytes() <= 8 => r,
                _ => return Ok(()),
            };
            let mut sig = signal("s", start, size, little);
            prop_assert_eq!(sig.range(), range);
            sig.is_signed = false;

            let raw = i64::from(raw) & ((1i64 << size) - 1);
            let mut data = [0u8; 8];
            set_value(&mut data, &sig, raw).unwrap();
            prop_assert_eq!(get_raw_value(&data, &sig).unwrap(), raw);

            // Only the signal's own bits were touched
            let mask = range.occupancy(little);
            for bit in 0..64u32 {
                if !mask.contains(bit) {
                    prop_assert_eq!(data[(bit / 8) as usize] & (1 << (bit % 8)), 0);
                }
            }
        }

        #[test]
        fn prop_physical_round_trip(raw in 0u32..65536, factor_idx in 0usize..4, offset in -100i32..100) {
            let factors = [0.1, 0.25, 1.0, 0.01];
            let mut sig = signal("s", 7, 16, false);
            sig.factor = factors[factor_idx];
            sig.offset = f64::from(offset);

            let physical = f64::from(raw) * sig.factor + sig.offset;
            let mut data = [0u8; 8];
            encode(&mut data, &sig, physical).unwrap();
            let decoded = decode(&data, &sig).unwrap();
            prop_assert!((decoded - physical).abs() <= sig.factor);
        }
    }
}
