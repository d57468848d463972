//! Assembled DBC database
//!
//! Holds the messages, signals and value tables produced by the parser, plus
//! the address and name indices. A [`Dbc`] is immutable once assembled.

use crate::checksum::{Checksum, SignalType};
use crate::layout::BitRange;
use crate::types::{DbcError, ParseErrorKind, Result};
use std::collections::HashMap;

/// A CAN signal definition
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Signal name (unique within its message)
    pub name: String,
    /// Declared start bit (LSB for little-endian, MSB for big-endian)
    pub start_bit: u32,
    /// Resolved most significant bit
    pub msb: u32,
    /// Resolved least significant bit
    pub lsb: u32,
    /// Length in bits
    pub size: u32,
    pub is_signed: bool,
    /// Scale factor to convert raw value to physical value
    pub factor: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Minimum physical value
    pub min: f64,
    /// Maximum physical value
    pub max: f64,
    /// Engineering unit (e.g., "km/h", "V")
    pub unit: Option<String>,
    /// Receiving nodes
    pub receivers: Vec<String>,
    pub is_little_endian: bool,
    /// Checksum/counter role, `Default` for ordinary data
    pub signal_type: SignalType,
    pub multiplex: Multiplex,
}

impl Signal {
    /// Resolved bit range
    pub fn range(&self) -> BitRange {
        BitRange {
            msb: self.msb,
            lsb: self.lsb,
        }
    }

    /// Strategy computing this signal's expected value, if it has one
    pub fn checksum(&self) -> Option<&'static dyn Checksum> {
        self.signal_type.strategy()
    }

    /// Compute the expected value of this checksum/counter field
    ///
    /// Returns `None` for ordinary data signals.
    pub fn calc_checksum(&self, address: u32, payload: &[u8]) -> Option<Result<u32>> {
        self.checksum()
            .map(|strategy| strategy.compute(address, self, payload))
    }

    /// True if this signal and `other` can be present in the same frame
    pub fn coexists_with(&self, other: &Signal) -> bool {
        match (self.multiplex, other.multiplex) {
            (Multiplex::Multiplexed(a), Multiplex::Multiplexed(b)) => a == b,
            _ => true,
        }
    }
}

/// Multiplexing role of a signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Multiplex {
    /// Always present
    #[default]
    None,
    /// Selects which multiplexed signals are present (`M`)
    Multiplexor,
    /// Present when the multiplexor equals this value (`m<N>`)
    Multiplexed(u64),
}

/// A complete CAN message definition
#[derive(Debug, Clone, PartialEq)]
pub struct Msg {
    /// Message name
    pub name: String,
    /// CAN arbitration ID
    pub address: u32,
    /// Message size in bytes
    pub size: u32,
    /// Sender ECU name (optional)
    pub sender: Option<String>,
    /// All signals in this message, in declaration order
    pub signals: Vec<Signal>,
}

impl Msg {
    /// Get a signal by name
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// The checksum field of this message, if any
    pub fn checksum_signal(&self) -> Option<&Signal> {
        self.signals.iter().find(|s| s.signal_type.is_checksum())
    }

    /// The rolling counter field of this message, if any
    pub fn counter_signal(&self) -> Option<&Signal> {
        self.signals
            .iter()
            .find(|s| s.signal_type == SignalType::Counter)
    }

    /// True if the address needs a 29-bit identifier
    pub fn is_extended(&self) -> bool {
        self.address > 0x7FF
    }
}

/// One `raw "label"` pair of a value table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEntry {
    pub raw: i64,
    pub label: String,
}

/// Value table (`VAL_`) for one signal of one message
#[derive(Debug, Clone, PartialEq)]
pub struct Val {
    /// Name of the annotated signal
    pub name: String,
    /// Address of the owning message
    pub address: u32,
    /// Normalised enumeration, e.g. `"0 OFF 1 ON"`
    pub def_val: String,
    /// Entries as written in the source
    pub entries: Vec<ValueEntry>,
}

impl Val {
    /// Label for a raw value
    pub fn label(&self, raw: i64) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.raw == raw)
            .map(|e| e.label.as_str())
    }
}

/// The assembled, immutable database
#[derive(Debug)]
pub struct Dbc {
    name: String,
    msgs: Vec<Msg>,
    vals: Vec<Val>,
    /// Index into `msgs` by address
    addr_to_msg: HashMap<u32, usize>,
    /// Index into `msgs` by name, first definition wins
    name_to_msg: HashMap<String, usize>,
}

impl Dbc {
    /// Build a database and its lookup indices
    ///
    /// Duplicate addresses are always rejected. Duplicate names are rejected
    /// unless `allow_duplicate_msg_name` is set, in which case name lookups
    /// resolve to the first message declared with that name.
    pub fn assemble(
        name: impl Into<String>,
        msgs: Vec<Msg>,
        vals: Vec<Val>,
        allow_duplicate_msg_name: bool,
    ) -> Result<Self> {
        let name = name.into();
        let fail = |kind| DbcError::Assembly {
            dbc: name.clone(),
            kind,
        };

        let mut addr_to_msg = HashMap::with_capacity(msgs.len());
        let mut name_to_msg = HashMap::with_capacity(msgs.len());

        for (idx, msg) in msgs.iter().enumerate() {
            if addr_to_msg.insert(msg.address, idx).is_some() {
                return Err(fail(ParseErrorKind::DuplicateAddress(msg.address)));
            }
            if name_to_msg.contains_key(&msg.name) {
                if !allow_duplicate_msg_name {
                    return Err(fail(ParseErrorKind::DuplicateName(msg.name.clone())));
                }
            } else {
                name_to_msg.insert(msg.name.clone(), idx);
            }
        }

        for val in &vals {
            let known = addr_to_msg
                .get(&val.address)
                .map(|&idx| msgs[idx].signal(&val.name).is_some())
                .unwrap_or(false);
            if !known {
                return Err(fail(ParseErrorKind::UnknownSignalReference {
                    address: val.address,
                    name: val.name.clone(),
                }));
            }
        }

        Ok(Self {
            name,
            msgs,
            vals,
            addr_to_msg,
            name_to_msg,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All messages in declaration order
    pub fn msgs(&self) -> &[Msg] {
        &self.msgs
    }

    /// All value tables in declaration order
    pub fn vals(&self) -> &[Val] {
        &self.vals
    }

    /// Get a message definition by CAN address
    pub fn msg_by_address(&self, address: u32) -> Option<&Msg> {
        self.addr_to_msg.get(&address).map(|&idx| &self.msgs[idx])
    }

    /// Get a message definition by name
    pub fn msg_by_name(&self, name: &str) -> Option<&Msg> {
        self.name_to_msg.get(name).map(|&idx| &self.msgs[idx])
    }

    /// Signal a value table annotates
    pub fn val_signal(&self, val: &Val) -> Option<&Signal> {
        self.msg_by_address(val.address)
            .and_then(|msg| msg.signal(&val.name))
    }

    /// Value table for a signal, if one was declared
    pub fn val_for(&self, address: u32, signal: &str) -> Option<&Val> {
        self.vals
            .iter()
            .find(|v| v.address == address && v.name == signal)
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            num_messages: self.msgs.len(),
            num_signals: self.msgs.iter().map(|m| m.signals.len()).sum(),
            num_vals: self.vals.len(),
        }
    }

    /// Get all CAN addresses in the database, sorted
    pub fn addresses(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.addr_to_msg.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Total number of message definitions
    pub num_messages: usize,
    /// Total number of signal definitions
    pub num_signals: usize,
    /// Total number of value tables
    pub num_vals: usize,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn signal(name: &str, start_bit: u32, size: u32, little_endian: bool) -> Signal {
        let range = crate::layout::resolve(start_bit, size, little_endian).unwrap();
        Signal {
            name: name.to_string(),
            start_bit,
            msb: range.msb,
            lsb: range.lsb,
            size,
            is_signed: false,
            factor: 1.0,
            offset: 0.0,
            min: 0.0,
            max: 0.0,
            unit: None,
            receivers: Vec::new(),
            is_little_endian: little_endian,
            signal_type: SignalType::Default,
            multiplex: Multiplex::None,
        }
    }

    fn msg(name: &str, address: u32, signals: Vec<Signal>) -> Msg {
        Msg {
            name: name.to_string(),
            address,
            size: 8,
            sender: Some("ECU1".to_string()),
            signals,
        }
    }

    #[test]
    fn test_empty_database() {
        let db = Dbc::assemble("empty", Vec::new(), Vec::new(), false).unwrap();
        let stats = db.stats();
        assert_eq!(stats.num_messages, 0);
        assert_eq!(stats.num_signals, 0);
        assert_eq!(stats.num_vals, 0);
        assert_eq!(db.name(), "empty");
    }

    #[test]
    fn test_indices_match_message_list() {
        let db = Dbc::assemble(
            "test",
            vec![
                msg("EngineData", 0x123, vec![signal("EngineSpeed", 0, 16, true)]),
                msg("BatteryStatus", 0x200, vec![signal("Voltage", 7, 16, false)]),
            ],
            Vec::new(),
            false,
        )
        .unwrap();

        for m in db.msgs() {
            assert!(std::ptr::eq(db.msg_by_address(m.address).unwrap(), m));
            assert!(std::ptr::eq(db.msg_by_name(&m.name).unwrap(), m));
        }
        assert_eq!(db.addresses(), vec![0x123, 0x200]);
        assert_eq!(db.stats().num_signals, 2);
        assert!(db.msg_by_address(0x999).is_none());
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let err = Dbc::assemble(
            "test",
            vec![msg("A", 1, Vec::new()), msg("B", 1, Vec::new())],
            Vec::new(),
            true,
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(&ParseErrorKind::DuplicateAddress(1)));
    }

    #[test]
    fn test_duplicate_name_first_wins_when_allowed() {
        let msgs = vec![msg("A", 1, Vec::new()), msg("A", 2, Vec::new())];
        assert!(Dbc::assemble("test", msgs.clone(), Vec::new(), false).is_err());

        let db = Dbc::assemble("test", msgs, Vec::new(), true).unwrap();
        assert_eq!(db.msg_by_name("A").unwrap().address, 1);
        assert_eq!(db.msg_by_address(2).unwrap().name, "A");
    }

    #[test]
    fn test_val_must_reference_known_signal() {
        let val = Val {
            name: "Missing".to_string(),
            address: 0x123,
            def_val: "0 OFF".to_string(),
            entries: Vec::new(),
        };
        let err = Dbc::assemble(
            "test",
            vec![msg("EngineData", 0x123, vec![signal("EngineSpeed", 0, 16, true)])],
            vec![val],
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            Some(ParseErrorKind::UnknownSignalReference { address: 0x123, .. })
        ));
    }

    #[test]
    fn test_val_back_reference() {
        let val = Val {
            name: "Gear".to_string(),
            address: 0x10,
            def_val: "0 PARK 1 DRIVE".to_string(),
            entries: vec![
                ValueEntry { raw: 0, label: "Park".to_string() },
                ValueEntry { raw: 1, label: "Drive".to_string() },
            ],
        };
        let db = Dbc::assemble(
            "test",
            vec![msg("Gearbox", 0x10, vec![signal("Gear", 0, 3, true)])],
            vec![val],
            false,
        )
        .unwrap();

        let val = db.val_for(0x10, "Gear").unwrap();
        assert_eq!(db.val_signal(val).unwrap().size, 3);
        assert_eq!(val.label(1), Some("Drive"));
        assert_eq!(val.label(7), None);
    }

    #[test]
    fn test_multiplexed_coexistence() {
        let mut a = signal("A", 8, 8, true);
        let mut b = signal("B", 8, 8, true);
        a.multiplex = Multiplex::Multiplexed(0);
        b.multiplex = Multiplex::Multiplexed(1);
        assert!(!a.coexists_with(&b));

        b.multiplex = Multiplex::Multiplexed(0);
        assert!(a.coexists_with(&b));

        let mux = signal("Mode", 0, 8, true);
        assert!(mux.coexists_with(&a));
    }
}
