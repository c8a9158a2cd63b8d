//! Reference documentation database stored in a single redb file.
//!
//! # Tables
//!
//! ```text
//! properties  &str -> &str   database metadata (version, encoding)
//! libraries   &str -> u64    library name -> number of entries
//! entries     &str -> &str   entry name -> JSON-encoded `Entry`
//! ```
//!
//! All writes go through [`RefDatabase::transaction`], which commits when the
//! closure succeeds and aborts otherwise, so a failed bulk update leaves no
//! trace in the file.

pub mod source;

use crate::error::{db_error, BuildError};
use crate::paths;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use source::{Entry, EntryKind};

const PROPERTIES: TableDefinition<&str, &str> = TableDefinition::new("properties");
const LIBRARIES: TableDefinition<&str, u64> = TableDefinition::new("libraries");
const ENTRIES: TableDefinition<&str, &str> = TableDefinition::new("entries");

/// Counts produced by a bulk update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub libraries: usize,
    pub entries: usize,
}

pub struct RefDatabase {
    prefix: PathBuf,
    db: Database,
}

impl RefDatabase {
    /// Create a fresh database under `prefix`. Fails if one already exists.
    pub fn init(prefix: &Path) -> Result<Self, BuildError> {
        let file = paths::database_file(prefix);
        if file.exists() {
            return Err(BuildError::AlreadyExists(prefix.to_path_buf()));
        }
        std::fs::create_dir_all(prefix).map_err(|e| BuildError::io("create", prefix, e))?;
        let db = Database::create(&file).map_err(db_error)?;

        let wt = db.begin_write().map_err(db_error)?;
        wt.open_table(PROPERTIES).map_err(db_error)?;
        wt.open_table(LIBRARIES).map_err(db_error)?;
        wt.open_table(ENTRIES).map_err(db_error)?;
        wt.commit().map_err(db_error)?;

        debug!(prefix = %prefix.display(), "database initialized");
        Ok(Self {
            prefix: prefix.to_path_buf(),
            db,
        })
    }

    /// Open an existing database under `prefix`.
    pub fn open(prefix: &Path) -> Result<Self, BuildError> {
        let db = Database::open(paths::database_file(prefix)).map_err(db_error)?;
        Ok(Self {
            prefix: prefix.to_path_buf(),
            db,
        })
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Run `f` inside one write transaction.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, BuildError>
    where
        F: FnOnce(&mut Transaction) -> Result<T, BuildError>,
    {
        let mut tx = Transaction {
            inner: self.db.begin_write().map_err(db_error)?,
        };
        match f(&mut tx) {
            Ok(value) => {
                tx.inner.commit().map_err(db_error)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = tx.inner.abort() {
                    warn!(error = %abort_err, "failed to abort transaction");
                }
                Err(err)
            }
        }
    }

    pub fn property(&self, key: &str) -> Result<Option<String>, BuildError> {
        let rt = self.db.begin_read().map_err(db_error)?;
        let table = rt.open_table(PROPERTIES).map_err(db_error)?;
        let value = table
            .get(key)
            .map_err(db_error)?
            .map(|v| v.value().to_string());
        Ok(value)
    }

    /// Library names in key order.
    pub fn libraries(&self) -> Result<Vec<String>, BuildError> {
        let rt = self.db.begin_read().map_err(db_error)?;
        let table = rt.open_table(LIBRARIES).map_err(db_error)?;
        let mut names = Vec::new();
        for item in table.iter().map_err(db_error)? {
            let (name, _) = item.map_err(db_error)?;
            names.push(name.value().to_string());
        }
        Ok(names)
    }

    pub fn entry(&self, name: &str) -> Result<Option<Entry>, BuildError> {
        let rt = self.db.begin_read().map_err(db_error)?;
        let table = rt.open_table(ENTRIES).map_err(db_error)?;
        let Some(raw) = table.get(name).map_err(db_error)? else {
            return Ok(None);
        };
        let entry = serde_json::from_str(raw.value()).map_err(|source| BuildError::Encode {
            name: name.to_string(),
            source,
        })?;
        Ok(Some(entry))
    }
}

/// Write access handed to [`RefDatabase::transaction`] closures.
pub struct Transaction {
    inner: WriteTransaction,
}

impl Transaction {
    pub fn propset(&mut self, key: &str, value: &str) -> Result<(), BuildError> {
        let mut table = self.inner.open_table(PROPERTIES).map_err(db_error)?;
        table.insert(key, value).map_err(db_error)?;
        Ok(())
    }

    /// Load every library listed in `tree`'s index.
    pub fn update_from_source_tree(&mut self, tree: &Path) -> Result<UpdateStats, BuildError> {
        let names = source::read_library_index(tree)?;
        let mut libraries = self.inner.open_table(LIBRARIES).map_err(db_error)?;
        let mut entries = self.inner.open_table(ENTRIES).map_err(db_error)?;
        let mut stats = UpdateStats::default();

        for name in names {
            let doc = source::read_library(tree, &name)?;
            for entry in &doc.entries {
                let exists = entries
                    .get(entry.name.as_str())
                    .map_err(db_error)?
                    .is_some();
                if exists {
                    return Err(BuildError::DuplicateEntry {
                        name: entry.name.clone(),
                        library: doc.name.clone(),
                    });
                }
                let json = serde_json::to_string(entry).map_err(|source| BuildError::Encode {
                    name: entry.name.clone(),
                    source,
                })?;
                entries
                    .insert(entry.name.as_str(), json.as_str())
                    .map_err(db_error)?;
            }
            libraries
                .insert(doc.name.as_str(), doc.entries.len() as u64)
                .map_err(db_error)?;
            debug!(library = %doc.name, entries = doc.entries.len(), "library loaded");
            stats.libraries += 1;
            stats.entries += doc.entries.len();
        }
        Ok(stats)
    }
}
