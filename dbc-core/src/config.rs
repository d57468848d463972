//! Configuration types
//!
//! Parser and validator settings, loadable from TOML. Checksum profiles can be
//! given explicitly or picked from the built-in presets by database name.

use crate::checksum::ChecksumState;
use crate::types::{DbcError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration file (e.g. `dbc.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Settings for building databases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Accept several messages with the same name (addresses stay unique)
    #[serde(default)]
    pub allow_duplicate_msg_name: bool,

    /// Directory searched for `<name>.dbc` by [`DbcRegistry::load`](crate::DbcRegistry::load)
    #[serde(default)]
    pub search_path: Option<PathBuf>,

    /// Fall back to the built-in checksum preset for the database name
    #[serde(default = "default_true")]
    pub builtin_checksums: bool,

    /// Explicit checksum profile, overrides the built-in presets
    #[serde(default)]
    pub checksum: Option<ChecksumState>,
}

fn default_true() -> bool {
    true
}

fn default_max_bad_counter() -> u32 {
    5
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            allow_duplicate_msg_name: false,
            search_path: None,
            builtin_checksums: true,
            checksum: None,
        }
    }
}

impl ParserConfig {
    /// Create a new parser configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: allow duplicate message names
    pub fn with_duplicate_msg_names(mut self, allowed: bool) -> Self {
        self.allow_duplicate_msg_name = allowed;
        self
    }

    /// Builder method: set the DBC search directory
    pub fn with_search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_path = Some(dir.into());
        self
    }

    /// Builder method: enable or disable built-in checksum presets
    pub fn with_builtin_checksums(mut self, enabled: bool) -> Self {
        self.builtin_checksums = enabled;
        self
    }

    /// Builder method: use an explicit checksum profile
    pub fn with_checksum(mut self, state: ChecksumState) -> Self {
        self.checksum = Some(state);
        self
    }

    /// Checksum profile to use for a database
    pub fn checksum_for(&self, dbc_name: &str) -> Option<ChecksumState> {
        match &self.checksum {
            Some(state) => Some(state.clone()),
            None if self.builtin_checksums => ChecksumState::for_dbc(dbc_name),
            None => None,
        }
    }
}

/// Settings for live frame validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub ignore_checksum: bool,

    #[serde(default)]
    pub ignore_counter: bool,

    /// Counter faults after which frames are rejected (default: 5)
    #[serde(default = "default_max_bad_counter")]
    pub max_bad_counter: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            ignore_checksum: false,
            ignore_counter: false,
            max_bad_counter: default_max_bad_counter(),
        }
    }
}

impl ValidationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: skip checksum comparison
    pub fn with_ignore_checksum(mut self, ignore: bool) -> Self {
        self.ignore_checksum = ignore;
        self
    }

    /// Builder method: skip counter tracking
    pub fn with_ignore_counter(mut self, ignore: bool) -> Self {
        self.ignore_counter = ignore;
        self
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|source| DbcError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content)
        .map_err(|e| DbcError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::SignalType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parser_config_builder() {
        let config = ParserConfig::new()
            .with_duplicate_msg_names(true)
            .with_search_path("/opt/dbc")
            .with_builtin_checksums(false);

        assert!(config.allow_duplicate_msg_name);
        assert_eq!(config.search_path, Some(PathBuf::from("/opt/dbc")));
        assert!(config.checksum_for("honda_civic").is_none());
    }

    #[test]
    fn test_checksum_selection() {
        let config = ParserConfig::new();
        assert_eq!(
            config.checksum_for("toyota_prius").unwrap().checksum_type,
            SignalType::ToyotaChecksum
        );
        assert!(config.checksum_for("generic").is_none());

        let explicit = ChecksumState::for_dbc("chrysler_pacifica").unwrap();
        let config = ParserConfig::new().with_checksum(explicit.clone());
        assert_eq!(config.checksum_for("toyota_prius"), Some(explicit));
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.parser.builtin_checksums);
        assert!(!config.parser.allow_duplicate_msg_name);
        assert_eq!(config.validation.max_bad_counter, 5);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [parser]
            allow_duplicate_msg_name = true
            search_path = "dbc"

            [parser.checksum]
            checksum_size = 8
            checksum_start_bit = 0
            little_endian = true
            checksum_type = "xor_checksum"

            [validation]
            ignore_counter = true
            "#
        )
        .unwrap();
        file.flush().unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(config.parser.allow_duplicate_msg_name);
        assert_eq!(config.parser.search_path, Some(PathBuf::from("dbc")));
        assert_eq!(
            config.parser.checksum.unwrap().checksum_type,
            SignalType::XorChecksum
        );
        assert!(config.validation.ignore_counter);
        assert!(!config.validation.ignore_checksum);
    }

    #[test]
    fn test_load_config_errors() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[parser]\nallow_duplicate_msg_name = \"yes\"\n").unwrap();
        file.flush().unwrap();
        assert!(matches!(load_config(file.path()), Err(DbcError::Config(_))));

        assert!(matches!(
            load_config(Path::new("/nonexistent/dbc.toml")),
            Err(DbcError::Io { .. })
        ));
    }
}
