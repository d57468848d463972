//! DBC Database Library
//!
//! Parses CAN database (DBC) text into an immutable, indexed database of
//! messages, signals and value tables, ready for decoding and encoding frames.
//!
//! # Architecture
//!
//! - [`parser`] turns DBC text into messages and value tables, one line at a time
//! - [`layout`] resolves each signal's declared start bit into its msb/lsb bits
//! - [`checksum`] attaches per-manufacturer checksum and counter strategies
//! - [`database`] assembles the parsed entities and builds the lookup indices
//! - [`registry`] caches assembled databases by name, building each at most once
//!
//! The library does NOT decode log files or own a CAN socket; it only
//! describes frames and validates their integrity fields.
//!
//! # Example Usage
//!
//! ```no_run
//! use dbc_core::{codec, DbcRegistry};
//! use std::path::Path;
//!
//! let registry = DbcRegistry::with_search_path("opendbc");
//! let dbc = registry.load("toyota_rav4").unwrap();
//!
//! let msg = dbc.msg_by_name("STEER_TORQUE_SENSOR").unwrap();
//! let payload = [0u8; 8];
//! for signal in &msg.signals {
//!     let value = codec::decode(&payload, signal).unwrap();
//!     println!("{} = {}", signal.name, value);
//! }
//!
//! // Or parse a single file without caching it
//! let dbc = dbc_core::parse_database_from_path(Path::new("powertrain.dbc")).unwrap();
//! println!("{} messages", dbc.stats().num_messages);
//! ```

pub mod checksum;
pub mod codec;
pub mod config;
pub mod database;
pub mod layout;
pub mod loader;
pub mod parser;
pub mod registry;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use checksum::{Checksum, ChecksumState, SignalType};
pub use codec::SignalPackValue;
pub use config::{load_config, Config, ParserConfig, ValidationConfig};
pub use database::{DatabaseStats, Dbc, Msg, Multiplex, Signal, Val, ValueEntry};
pub use layout::BitRange;
pub use loader::{parse_database_from_path, parse_database_from_text};
pub use registry::{list_database_names, lookup_database, DbcRegistry};
pub use types::{DbcError, ParseErrorKind, Result};
pub use validation::{MessageValidator, ValidationResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
