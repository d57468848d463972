//! DBC grammar parser
//!
//! Line-oriented: every line is trimmed and classified by its leading token.
//! `BO_` opens a message, `SG_` appends a signal to the open message, `VAL_`
//! records a value table. Everything else is ignored.

use crate::checksum::{setup_signal, ChecksumState};
use crate::database::{Msg, Multiplex, Signal, Val, ValueEntry};
use crate::layout::{self, BitMask};
use crate::types::{DbcError, ParseErrorKind, Result};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::OnceLock;

const NUMBER: &str = r"[0-9.+\-eE]+";

fn bo_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^BO_\s+(\w+)\s+(\w+)\s*:\s*(\d+)(?:\s+(\w+))?").expect("literal BO_ pattern")
    })
}

fn sg_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r#"^SG_\s+(\w+)(?:\s+(M|m\d+M?))?\s*:\s*(\d+)\|(\d+)@([01])([+-])\s*\(\s*({n})\s*,\s*({n})\s*\)\s*\[\s*({n})\s*\|\s*({n})\s*\]\s*"([^"]*)"\s*(.*)$"#,
            n = NUMBER
        );
        Regex::new(&pattern).expect("literal SG_ pattern")
    })
}

fn val_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^VAL_\s+(\w+)\s+(\w+)\s+(.*)$").expect("literal VAL_ pattern"))
}

fn val_entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([-+]?\d+)\s+"([^"]*)""#).expect("literal VAL_ entry pattern"))
}

/// Entities produced by a successful parse, ready for assembly
#[derive(Debug, Default)]
pub struct ParsedDbc {
    pub msgs: Vec<Msg>,
    pub vals: Vec<Val>,
}

/// Parse DBC text held in memory
pub fn parse_str(
    dbc_name: &str,
    source: &str,
    checksum: Option<&ChecksumState>,
    allow_duplicate_msg_name: bool,
) -> Result<ParsedDbc> {
    parse_reader(dbc_name, source.as_bytes(), checksum, allow_duplicate_msg_name)
}

/// Parse DBC text from any buffered reader
pub fn parse_reader<R: BufRead>(
    dbc_name: &str,
    reader: R,
    checksum: Option<&ChecksumState>,
    allow_duplicate_msg_name: bool,
) -> Result<ParsedDbc> {
    let mut parser = Parser::new(dbc_name, checksum, allow_duplicate_msg_name);

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| DbcError::Io {
            path: PathBuf::from(dbc_name),
            source,
        })?;
        parser
            .parse_line(line.trim())
            .map_err(|kind| DbcError::Parse {
                dbc: dbc_name.to_string(),
                line: idx + 1,
                kind,
            })?;
    }

    let parsed = parser.finish();
    log::debug!(
        "Parsed {} messages and {} value tables from {}",
        parsed.msgs.len(),
        parsed.vals.len(),
        dbc_name
    );
    Ok(parsed)
}

struct Parser<'a> {
    dbc_name: &'a str,
    checksum: Option<&'a ChecksumState>,
    allow_duplicate_msg_name: bool,
    msgs: Vec<Msg>,
    vals: Vec<Val>,
    addr_to_msg: HashMap<u32, usize>,
    msg_names: HashSet<String>,
    /// Bits used by each signal of the open message
    open_masks: Vec<BitMask>,
}

type LineResult = std::result::Result<(), ParseErrorKind>;

impl<'a> Parser<'a> {
    fn new(
        dbc_name: &'a str,
        checksum: Option<&'a ChecksumState>,
        allow_duplicate_msg_name: bool,
    ) -> Self {
        Self {
            dbc_name,
            checksum,
            allow_duplicate_msg_name,
            msgs: Vec::new(),
            vals: Vec::new(),
            addr_to_msg: HashMap::new(),
            msg_names: HashSet::new(),
            open_masks: Vec::new(),
        }
    }

    fn parse_line(&mut self, line: &str) -> LineResult {
        match line.split_whitespace().next() {
            Some("BO_") => self.parse_message(line),
            Some("SG_") => self.parse_signal(line),
            Some("VAL_") => self.parse_val(line),
            Some(_) => {
                log::trace!("{}: ignoring line: {}", self.dbc_name, line);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn parse_message(&mut self, line: &str) -> LineResult {
        let malformed = || ParseErrorKind::MalformedMessage(line.to_string());
        let caps = bo_regex().captures(line).ok_or_else(malformed)?;

        let address = parse_address(&caps[1]).ok_or_else(malformed)?;
        let name = caps[2].to_string();
        let size: u32 = caps[3].parse().map_err(|_| malformed())?;
        if size > layout::MAX_PAYLOAD_BYTES {
            return Err(malformed());
        }

        if self.addr_to_msg.contains_key(&address) {
            return Err(ParseErrorKind::DuplicateAddress(address));
        }
        if !self.allow_duplicate_msg_name && !self.msg_names.insert(name.clone()) {
            return Err(ParseErrorKind::DuplicateName(name));
        }

        log::debug!("{}: message {} (0x{:X}), {} bytes", self.dbc_name, name, address, size);

        self.addr_to_msg.insert(address, self.msgs.len());
        self.msgs.push(Msg {
            name,
            address,
            size,
            sender: caps.get(4).map(|m| m.as_str().to_string()),
            signals: Vec::new(),
        });
        self.open_masks.clear();
        Ok(())
    }

    fn parse_signal(&mut self, line: &str) -> LineResult {
        let malformed = || ParseErrorKind::MalformedSignal(line.to_string());
        let caps = sg_regex().captures(line).ok_or_else(malformed)?;

        let name = caps[1].to_string();
        let multiplex = match caps.get(2).map(|m| m.as_str()) {
            None => Multiplex::None,
            Some("M") => Multiplex::Multiplexor,
            Some(tag) => {
                let value = tag
                    .trim_start_matches('m')
                    .trim_end_matches('M')
                    .parse()
                    .map_err(|_| malformed())?;
                Multiplex::Multiplexed(value)
            }
        };
        let start_bit: u32 = caps[3].parse().map_err(|_| malformed())?;
        let size: u32 = caps[4].parse().map_err(|_| malformed())?;
        let is_little_endian = &caps[5] == "1";
        let is_signed = &caps[6] == "-";
        let factor: f64 = caps[7].parse().map_err(|_| malformed())?;
        let offset: f64 = caps[8].parse().map_err(|_| malformed())?;
        let min: f64 = caps[9].parse().map_err(|_| malformed())?;
        let max: f64 = caps[10].parse().map_err(|_| malformed())?;
        let unit = Some(caps[11].to_string()).filter(|u| !u.is_empty());
        let receivers = caps[12]
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();

        let range = layout::resolve(start_bit, size, is_little_endian)
            .map_err(|_| ParseErrorKind::InvalidLayout { start_bit, size })?;

        let mut signal = Signal {
            name,
            start_bit,
            msb: range.msb,
            lsb: range.lsb,
            size,
            is_signed,
            factor,
            offset,
            min,
            max,
            unit,
            receivers,
            is_little_endian,
            signal_type: Default::default(),
            multiplex,
        };
        if let Some(state) = self.checksum {
            setup_signal(&mut signal, state)?;
        }

        let msg = self.msgs.last_mut().ok_or_else(malformed)?;

        if range.required_bytes() > msg.size as usize {
            return Err(ParseErrorKind::SignalOutOfRange {
                name: signal.name,
                msb: range.msb,
                lsb: range.lsb,
                size: msg.size,
            });
        }
        if msg.signal(&signal.name).is_some() {
            return Err(ParseErrorKind::DuplicateSignal {
                address: msg.address,
                name: signal.name,
            });
        }

        let mask = range.occupancy(is_little_endian);
        let clash = msg
            .signals
            .iter()
            .zip(self.open_masks.iter())
            .find(|(other, other_mask)| {
                other.coexists_with(&signal) && other_mask.intersects(&mask)
            });
        if let Some((other, _)) = clash {
            return Err(ParseErrorKind::OverlappingSignals {
                message: msg.name.clone(),
                first: other.name.clone(),
                second: signal.name,
            });
        }

        self.open_masks.push(mask);
        msg.signals.push(signal);
        Ok(())
    }

    fn parse_val(&mut self, line: &str) -> LineResult {
        let malformed = || ParseErrorKind::MalformedValueTable(line.to_string());
        let caps = val_regex().captures(line).ok_or_else(malformed)?;

        let address = parse_address(&caps[1]).ok_or_else(malformed)?;
        let name = caps[2].to_string();

        let entries = val_entry_regex()
            .captures_iter(&caps[3])
            .map(|entry| {
                Ok(ValueEntry {
                    raw: entry[1].parse().map_err(|_| malformed())?,
                    label: entry[2].trim().to_string(),
                })
            })
            .collect::<std::result::Result<Vec<_>, ParseErrorKind>>()?;
        if entries.is_empty() {
            return Err(malformed());
        }

        let known = self
            .addr_to_msg
            .get(&address)
            .map(|&idx| self.msgs[idx].signal(&name).is_some())
            .unwrap_or(false);
        if !known {
            return Err(ParseErrorKind::UnknownSignalReference { address, name });
        }

        self.vals.push(Val {
            def_val: normalize_def_val(&entries),
            name,
            address,
            entries,
        });
        Ok(())
    }

    fn finish(self) -> ParsedDbc {
        ParsedDbc {
            msgs: self.msgs,
            vals: self.vals,
        }
    }
}

/// Decimal address, or hexadecimal with a `0x` prefix
fn parse_address(text: &str) -> Option<u32> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// `0 "Park" 1 "Reverse gear"` becomes `0 PARK 1 REVERSE_GEAR`
fn normalize_def_val(entries: &[ValueEntry]) -> String {
    let mut words = Vec::with_capacity(entries.len() * 2);
    for entry in entries {
        words.push(entry.raw.to_string());
        if !entry.label.is_empty() {
            words.push(entry.label.to_uppercase().replace(' ', "_"));
        }
    }
    words.join(" ")
}
