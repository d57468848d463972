//! Database construction from text and files

use crate::checksum::ChecksumState;
use crate::config::ParserConfig;
use crate::database::Dbc;
use crate::parser;
use crate::types::{DbcError, Result};
use std::path::Path;

/// Parse and assemble a database from DBC text
pub fn parse_database_from_text(
    name: &str,
    text: &str,
    checksum: Option<&ChecksumState>,
    allow_duplicate_msg_name: bool,
) -> Result<Dbc> {
    let parsed = parser::parse_str(name, text, checksum, allow_duplicate_msg_name)?;
    let dbc = Dbc::assemble(name, parsed.msgs, parsed.vals, allow_duplicate_msg_name)?;

    let stats = dbc.stats();
    log::info!(
        "Assembled database {}: {} messages, {} signals, {} value tables",
        name,
        stats.num_messages,
        stats.num_signals,
        stats.num_vals
    );
    Ok(dbc)
}

/// Parse a DBC file with default settings
///
/// The database is named after the file stem, and the built-in checksum
/// preset for that name (if any) is applied.
pub fn parse_database_from_path(path: &Path) -> Result<Dbc> {
    parse_database_from_path_with(path, &ParserConfig::default())
}

/// Parse a DBC file using `config`
pub fn parse_database_from_path_with(path: &Path, config: &ParserConfig) -> Result<Dbc> {
    log::info!("Parsing DBC file: {:?}", path);

    let name = dbc_name_from_path(path);
    let text = read_dbc_source(path)?;
    let checksum = config.checksum_for(&name);

    parse_database_from_text(
        &name,
        &text,
        checksum.as_ref(),
        config.allow_duplicate_msg_name,
    )
}

/// Database name for a DBC file: its stem (`honda_civic.dbc` → `honda_civic`)
pub fn dbc_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Read a DBC file, handling non-UTF-8 encodings
pub fn read_dbc_source(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| DbcError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // Try UTF-8 first, then fall back to Latin-1 (compatible with Windows-1252)
    Ok(String::from_utf8(bytes).unwrap_or_else(|err| {
        log::warn!("DBC file {:?} is not UTF-8, decoding as Latin-1", path);
        err.into_bytes().iter().map(|&b| b as char).collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::SignalType;
    use std::io::Write;
    use tempfile::TempDir;

    const HONDA_DBC: &str = r#"
VERSION ""

BO_ 228 STEERING_CONTROL: 5 EON
 SG_ STEER_TORQUE : 7|16@0- (1,0) [-4096|4096] "" EPS
 SG_ COUNTER : 37|2@0+ (1,0) [0|3] "" EPS
 SG_ CHECKSUM : 35|4@0+ (1,0) [0|15] "" EPS
"#;

    #[test]
    fn test_parse_from_path_uses_builtin_preset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("honda_civic_touring.dbc");
        std::fs::write(&path, HONDA_DBC).unwrap();

        let dbc = parse_database_from_path(&path).unwrap();
        assert_eq!(dbc.name(), "honda_civic_touring");
        let msg = dbc.msg_by_address(228).unwrap();
        assert_eq!(
            msg.checksum_signal().unwrap().signal_type,
            SignalType::HondaChecksum
        );
    }

    #[test]
    fn test_latin1_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("generic.dbc");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"BO_ 1 M: 8 N\n SG_ T : 0|8@1+ (1,0) [0|0] \"\xB0C\" N\n")
            .unwrap();
        drop(file);

        let dbc = parse_database_from_path(&path).unwrap();
        let sig = dbc.msg_by_address(1).unwrap().signal("T").unwrap();
        assert_eq!(sig.unit.as_deref(), Some("°C"));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_database_from_path(Path::new("/nonexistent/thing.dbc")).unwrap_err();
        assert!(matches!(err, DbcError::Io { .. }));
    }

    #[test]
    fn test_name_from_path() {
        assert_eq!(dbc_name_from_path(Path::new("/a/b/toyota_rav4.dbc")), "toyota_rav4");
        assert_eq!(dbc_name_from_path(Path::new("plain")), "plain");
    }
}
