//! Core types for the DBC database library
//!
//! This module defines the error taxonomy shared by the parser, the layout
//! resolver, the checksum strategies and the registry.

use std::path::PathBuf;

/// Result type for database operations
pub type Result<T> = std::result::Result<T, DbcError>;

/// Errors that can occur while building or querying a database
#[derive(Debug, thiserror::Error)]
pub enum DbcError {
    /// A line of DBC text could not be turned into a database entity
    #[error("{dbc}:{line}: {kind}")]
    Parse {
        /// Name of the database being parsed
        dbc: String,
        /// 1-based line number of the offending line
        line: usize,
        /// What went wrong
        kind: ParseErrorKind,
    },

    /// The assembler found an inconsistency the parser did not catch
    #[error("{dbc}: {kind}")]
    Assembly { dbc: String, kind: ParseErrorKind },

    #[error("Invalid signal layout: start bit {start_bit}, size {size}")]
    InvalidLayout { start_bit: u32, size: u32 },

    #[error("Payload too short: need {needed} bytes, got {actual}")]
    PayloadTooShort { needed: usize, actual: usize },

    #[error("Database not found: {0}")]
    NotFound(String),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DbcError {
    /// The parse-level cause, if this error came from the parser or assembler
    pub fn kind(&self) -> Option<&ParseErrorKind> {
        match self {
            DbcError::Parse { kind, .. } | DbcError::Assembly { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Line number of a parse error
    pub fn line(&self) -> Option<usize> {
        match self {
            DbcError::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Reasons a DBC source is rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("bad BO_ line: {0}")]
    MalformedMessage(String),

    #[error("bad SG_ line: {0}")]
    MalformedSignal(String),

    #[error("bad VAL_ line: {0}")]
    MalformedValueTable(String),

    #[error("duplicate message address: {0} (0x{0:X})")]
    DuplicateAddress(u32),

    #[error("duplicate message name: {0}")]
    DuplicateName(String),

    #[error("duplicate signal name {name} in message {address}")]
    DuplicateSignal { address: u32, name: String },

    #[error("VAL_ references unknown signal {name} in message {address}")]
    UnknownSignalReference { address: u32, name: String },

    #[error("signal {name} (msb {msb}, lsb {lsb}) does not fit in a {size} byte message")]
    SignalOutOfRange {
        name: String,
        msb: u32,
        lsb: u32,
        size: u32,
    },

    #[error("signals {first} and {second} overlap in message {message}")]
    OverlappingSignals {
        message: String,
        first: String,
        second: String,
    },

    #[error("invalid layout: start bit {start_bit}, size {size}")]
    InvalidLayout { start_bit: u32, size: u32 },

    #[error("{0}")]
    ChecksumLayout(String),
}
