use crate::error::{RefdbError, Result};
use crate::io;
use crate::record::ErrorRecord;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Last reported failure, used to send each distinct failure only once.
///
/// Absence of the file means the last run succeeded or nothing has been
/// reported yet.
#[derive(Debug, Clone)]
pub struct ErrorLedger {
    path: PathBuf,
}

impl ErrorLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True unless the ledger holds exactly `record`'s canonical text.
    ///
    /// An unreadable ledger counts as new.
    pub fn is_new(&self, record: &ErrorRecord) -> bool {
        match std::fs::read(&self.path) {
            Ok(bytes) => bytes != record.canonical_text().as_bytes(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ledger unreadable, treating failure as new");
                true
            }
        }
    }

    pub fn save(&self, record: &ErrorRecord) -> Result<()> {
        io::atomic_write(&self.path, record.canonical_text().as_bytes())?;
        debug!(path = %self.path.display(), "ledger saved");
        Ok(())
    }

    /// Returns true if a ledger file was removed.
    pub fn clear(&self) -> Result<bool> {
        io::remove_file_if_exists(&self.path).map_err(|e| RefdbError::path("remove", &self.path, e))
    }
}
