//! Database registry
//!
//! Build-once cache of assembled databases keyed by name. Entries are added
//! lazily and never replaced or evicted; every caller asking for the same name
//! shares one [`Arc<Dbc>`].

use crate::checksum::ChecksumState;
use crate::config::ParserConfig;
use crate::database::Dbc;
use crate::loader;
use crate::types::{DbcError, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Registry of assembled databases
#[derive(Debug, Default)]
pub struct DbcRegistry {
    config: ParserConfig,
    /// Published, immutable databases
    databases: RwLock<HashMap<String, Arc<Dbc>>>,
    /// Per-name build locks, held while a database is being constructed
    building: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DbcRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry using `config` for path-based loads
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create an empty registry that loads `<dir>/<name>.dbc` on demand
    pub fn with_search_path(dir: impl Into<std::path::PathBuf>) -> Self {
        Self::with_config(ParserConfig::new().with_search_path(dir))
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Get an already registered database. Never parses.
    pub fn lookup(&self, name: &str) -> Result<Arc<Dbc>> {
        self.databases
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DbcError::NotFound(name.to_string()))
    }

    /// Return the database registered as `name`, building it with `build` if
    /// it is not registered yet
    ///
    /// `build` runs at most once per name, also under concurrent first access.
    /// If it fails nothing is registered, the build lock is released and the
    /// error is returned; a later call may build again.
    pub fn get_or_insert_with<F>(&self, name: &str, build: F) -> Result<Arc<Dbc>>
    where
        F: FnOnce() -> Result<Dbc>,
    {
        if let Ok(dbc) = self.lookup(name) {
            return Ok(dbc);
        }

        let build_lock = self
            .building
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        let _guard = build_lock.lock();

        // Another thread may have finished the build while we waited
        if let Ok(dbc) = self.lookup(name) {
            return Ok(dbc);
        }

        // Publish before releasing the build lock so late callers see the entry
        let result = build().map(|dbc| self.publish(name, dbc));
        self.release_build_lock(name, &build_lock);
        result
    }

    fn publish(&self, name: &str, dbc: Dbc) -> Arc<Dbc> {
        let mut databases = self.databases.write();
        let entry = databases
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(dbc));
        log::info!("Registered database {}", name);
        Arc::clone(entry)
    }

    fn release_build_lock(&self, name: &str, build_lock: &Arc<Mutex<()>>) {
        let mut building = self.building.lock();
        if building
            .get(name)
            .map_or(false, |current| Arc::ptr_eq(current, build_lock))
        {
            building.remove(name);
        }
    }

    /// Parse DBC text and register it as `name`
    ///
    /// If `name` is already registered the cached database is returned and
    /// `text` is not parsed.
    pub fn parse_and_register(
        &self,
        name: &str,
        text: &str,
        checksum: Option<&ChecksumState>,
        allow_duplicate_msg_name: bool,
    ) -> Result<Arc<Dbc>> {
        self.get_or_insert_with(name, || {
            loader::parse_database_from_text(name, text, checksum, allow_duplicate_msg_name)
        })
    }

    /// Parse a DBC file and register it under its file stem
    pub fn register_path(&self, path: &Path) -> Result<Arc<Dbc>> {
        let name = loader::dbc_name_from_path(path);
        self.get_or_insert_with(&name, || {
            loader::parse_database_from_path_with(path, &self.config)
        })
    }

    /// Get a database, loading `<search_path>/<name>.dbc` on first use
    pub fn load(&self, name: &str) -> Result<Arc<Dbc>> {
        if let Ok(dbc) = self.lookup(name) {
            return Ok(dbc);
        }

        let dir = self
            .config
            .search_path
            .as_deref()
            .ok_or_else(|| DbcError::NotFound(name.to_string()))?;
        let path = dir.join(format!("{}.dbc", name));
        if !path.is_file() {
            return Err(DbcError::NotFound(name.to_string()));
        }

        self.get_or_insert_with(name, || {
            loader::parse_database_from_path_with(&path, &self.config)
        })
    }

    /// Registered names plus `.dbc` files in the search path, sorted
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.read().keys().cloned().collect();

        if let Some(dir) = &self.config.search_path {
            match std::fs::read_dir(dir) {
                Ok(entries) => names.extend(
                    entries
                        .filter_map(|entry| entry.ok())
                        .map(|entry| entry.path())
                        .filter(|path| path.extension().map_or(false, |ext| ext == "dbc"))
                        .map(|path| loader::dbc_name_from_path(&path)),
                ),
                Err(e) => log::warn!("Cannot list DBC directory {:?}: {}", dir, e),
            }
        }

        names.sort_unstable();
        names.dedup();
        names
    }

    /// Number of registered databases
    pub fn len(&self) -> usize {
        self.databases.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-wide registry, created empty on first use
pub fn global() -> &'static DbcRegistry {
    static REGISTRY: OnceLock<DbcRegistry> = OnceLock::new();
    REGISTRY.get_or_init(DbcRegistry::new)
}

/// Look up a database in the process-wide registry
pub fn lookup_database(name: &str) -> Result<Arc<Dbc>> {
    global().lookup(name)
}

/// Names known to the process-wide registry
pub fn list_database_names() -> Vec<String> {
    global().list_names()
}
