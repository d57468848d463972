//! Manufacturer checksum algorithms

use super::volkswagen::magic_pad;
use super::{Checksum, Coverage};
use crate::codec;
use crate::database::Signal;
use crate::types::{DbcError, Result};
use crc::{Algorithm, Crc, CRC_16_XMODEM, CRC_8_AUTOSAR, CRC_8_GSM_A, CRC_8_SAE_J1850};

/// CRC-8 poly 0xD5, init 0xFF, no final XOR
const CRC_8_PEDAL_ALGO: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0xd5,
    init: 0xff,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0x7c,
    residue: 0x00,
};

const CRC8_AUTOSAR: Crc<u8> = Crc::<u8>::new(&CRC_8_AUTOSAR);
const CRC8_J1850: Crc<u8> = Crc::<u8>::new(&CRC_8_SAE_J1850);
const CRC8_J1850_ZERO_INIT: Crc<u8> = Crc::<u8>::new(&CRC_8_GSM_A);
const CRC8_PEDAL: Crc<u8> = Crc::<u8>::new(&CRC_8_PEDAL_ALGO);
const CRC16_XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Fail unless `payload` holds at least `min` bytes and the whole field
fn guard(signal: &Signal, payload: &[u8], min: usize) -> Result<()> {
    let needed = min.max(signal.range().required_bytes());
    if payload.len() < needed {
        return Err(DbcError::PayloadTooShort {
            needed,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// Sum of the address bytes, least significant first
fn address_byte_sum(mut address: u32) -> u32 {
    let mut sum = 0;
    while address != 0 {
        sum += address & 0xFF;
        address >>= 8;
    }
    sum
}

/// Byte index holding a checksum field
fn field_byte(signal: &Signal) -> usize {
    (signal.start_bit / 8) as usize
}

/// Plain counter extraction
#[derive(Debug, Clone, Copy)]
pub struct Counter;

impl Checksum for Counter {
    fn compute(&self, _address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        let raw = codec::get_raw_value(payload, signal)?;
        Ok((raw as u64 & ((1u64 << signal.size.min(32)) - 1)) as u32)
    }

    fn coverage(&self) -> Coverage {
        Coverage::Field
    }
}

/// Honda/Acura 4-bit nibble checksum
///
/// `(8 - sum of address nibbles - sum of payload nibbles) & 0xF`, skipping the
/// checksum nibble itself, plus 3 for extended addresses.
#[derive(Debug, Clone, Copy)]
pub struct Honda;

impl Checksum for Honda {
    fn compute(&self, address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        guard(signal, payload, 1)?;

        let mut sum: u32 = 0;
        let mut addr = address;
        while addr != 0 {
            sum += addr & 0xF;
            addr >>= 4;
        }

        let last = payload.len() - 1;
        for (i, &byte) in payload.iter().enumerate() {
            let byte = if i == last { byte >> 4 } else { byte };
            sum += u32::from(byte & 0xF) + u32::from(byte >> 4);
        }

        let mut checksum = 8u32.wrapping_sub(sum);
        if address > 0x7FF {
            checksum = checksum.wrapping_add(3);
        }
        Ok(checksum & 0xF)
    }

    fn coverage(&self) -> Coverage {
        Coverage::AllButLastNibble
    }
}

/// Toyota/Lexus additive checksum in the last byte
#[derive(Debug, Clone, Copy)]
pub struct Toyota;

impl Checksum for Toyota {
    fn compute(&self, address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        guard(signal, payload, 1)?;
        let data_sum: u32 = payload[..payload.len() - 1]
            .iter()
            .map(|&b| u32::from(b))
            .sum();
        Ok((payload.len() as u32 + address_byte_sum(address) + data_sum) & 0xFF)
    }

    fn coverage(&self) -> Coverage {
        Coverage::AllButLastByte
    }
}

/// comma pedal/body CRC-8 (poly 0xD5) over the payload in reverse byte order
#[derive(Debug, Clone, Copy)]
pub struct Pedal;

impl Checksum for Pedal {
    fn compute(&self, _address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        guard(signal, payload, 1)?;
        let mut digest = CRC8_PEDAL.digest();
        for byte in payload[..payload.len() - 1].iter().rev() {
            digest.update(std::slice::from_ref(byte));
        }
        Ok(u32::from(digest.finalize()))
    }

    fn coverage(&self) -> Coverage {
        Coverage::AllButLastByte
    }
}

/// Volkswagen MQB/MEB CRC-8 (AUTOSAR 8H2F) with an address-specific pad byte
///
/// The CRC lives in byte 0 and covers bytes 1.., followed by a padding byte
/// chosen by address and the counter in the low nibble of byte 1.
#[derive(Debug, Clone, Copy)]
pub struct VolkswagenMqbMeb;

impl Checksum for VolkswagenMqbMeb {
    fn compute(&self, address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        guard(signal, payload, 2)?;
        let mut digest = CRC8_AUTOSAR.digest();
        digest.update(&payload[1..]);

        match magic_pad(address, payload[1] & 0x0F) {
            Some(pad) => digest.update(&[pad]),
            None => log::warn!(
                "CRC check requested for undefined Volkswagen message 0x{:X}",
                address
            ),
        }

        Ok(u32::from(digest.finalize()))
    }

    fn coverage(&self) -> Coverage {
        Coverage::AllButFirstByte
    }
}

/// XOR fold of every byte except the checksum byte
#[derive(Debug, Clone, Copy)]
pub struct Xor;

impl Checksum for Xor {
    fn compute(&self, _address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        guard(signal, payload, 1)?;
        let skip = field_byte(signal);
        let checksum = payload
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != skip)
            .fold(0u8, |acc, (_, &b)| acc ^ b);
        Ok(u32::from(checksum))
    }

    fn coverage(&self) -> Coverage {
        Coverage::AllButFieldByte
    }
}

/// Subaru global additive checksum in the first byte
#[derive(Debug, Clone, Copy)]
pub struct Subaru;

impl Checksum for Subaru {
    fn compute(&self, address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        guard(signal, payload, 1)?;
        let data_sum: u32 = payload[1..].iter().map(|&b| u32::from(b)).sum();
        Ok((address_byte_sum(address) + data_sum) & 0xFF)
    }

    fn coverage(&self) -> Coverage {
        Coverage::AllButFirstByte
    }
}

/// Chrysler/Jeep CRC-8 SAE J1850 over all but the last byte
#[derive(Debug, Clone, Copy)]
pub struct Chrysler;

impl Checksum for Chrysler {
    fn compute(&self, _address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        guard(signal, payload, 1)?;
        Ok(u32::from(CRC8_J1850.checksum(&payload[..payload.len() - 1])))
    }

    fn coverage(&self) -> Coverage {
        Coverage::AllButLastByte
    }
}

/// Hyundai/Kia/Genesis CAN-FD CRC-16 (XMODEM)
///
/// Covers bytes 2.. followed by the two low address bytes, then XORed with a
/// constant chosen by the frame length.
#[derive(Debug, Clone, Copy)]
pub struct HkgCanFd;

impl Checksum for HkgCanFd {
    fn compute(&self, address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        guard(signal, payload, 2)?;
        let mut digest = CRC16_XMODEM.digest();
        digest.update(&payload[2..]);
        digest.update(&[(address & 0xFF) as u8, ((address >> 8) & 0xFF) as u8]);

        let length_xor = match payload.len() {
            8 => 0x5F29,
            16 => 0x041D,
            24 => 0x819D,
            32 => 0x9F5B,
            _ => 0x0000,
        };
        Ok(u32::from(digest.finalize() ^ length_xor))
    }

    fn coverage(&self) -> Coverage {
        Coverage::FromByte(2)
    }
}

/// FCA Giorgio platform CRC-8 (J1850 polynomial, zero init, per-address XOR)
#[derive(Debug, Clone, Copy)]
pub struct FcaGiorgio;

impl Checksum for FcaGiorgio {
    fn compute(&self, address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        guard(signal, payload, 1)?;
        let crc = CRC8_J1850_ZERO_INIT.checksum(&payload[..payload.len() - 1]);
        let final_xor = match address {
            0xDE => 0x10,
            0x106 => 0xF6,
            0x122 => 0xF1,
            _ => 0x00,
        };
        Ok(u32::from(crc ^ final_xor))
    }

    fn coverage(&self) -> Coverage {
        Coverage::AllButLastByte
    }
}

/// Tesla additive checksum: address bytes plus every non-checksum byte
#[derive(Debug, Clone, Copy)]
pub struct Tesla;

impl Checksum for Tesla {
    fn compute(&self, address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        guard(signal, payload, 1)?;
        let skip = field_byte(signal);
        let seed = ((address & 0xFF) + ((address >> 8) & 0xFF)) as u8;
        let checksum = payload
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != skip)
            .fold(seed, |acc, (_, &b)| acc.wrapping_add(b));
        Ok(u32::from(checksum))
    }

    fn coverage(&self) -> Coverage {
        Coverage::AllButFieldByte
    }
}

/// BYD split-nibble checksum in the last byte
#[derive(Debug, Clone, Copy)]
pub struct Byd;

const BYD_BYTE_KEY: i32 = 0xAF;

impl Checksum for Byd {
    fn compute(&self, _address: u32, signal: &Signal, payload: &[u8]) -> Result<u32> {
        guard(signal, payload, 1)?;
        let data = &payload[..payload.len() - 1];
        let mut high_sum: i32 = data.iter().map(|&b| i32::from(b >> 4)).sum();
        let mut low_sum: i32 = data.iter().map(|&b| i32::from(b & 0xF)).sum();
        let remainder = low_sum >> 4;

        low_sum += BYD_BYTE_KEY >> 4;
        high_sum += BYD_BYTE_KEY & 0xF;

        let high = (9 - high_sum) & 0xF;
        let low = (9 - low_sum) & 0xF;
        Ok((((high + 5 - remainder) << 4) + low) as u32 & 0xFF)
    }

    fn coverage(&self) -> Coverage {
        Coverage::AllButLastByte
    }
}
