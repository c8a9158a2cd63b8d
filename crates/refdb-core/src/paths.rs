use crate::error::{RefdbError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Work root layout
// ---------------------------------------------------------------------------

pub const SOURCE_DIR: &str = "src";
pub const VAR_DIR: &str = "var";

pub const LIBRARIES_FILE: &str = "LIBRARIES";
pub const DOCUMENT_EXT: &str = "rd";

// ---------------------------------------------------------------------------
// State directory layout
// ---------------------------------------------------------------------------

pub const SCRATCH_DIR: &str = "db.tmp";
pub const STAGING_DIR: &str = "db";
pub const LEDGER_FILE: &str = "lasterror.log";
pub const LOCK_FILE: &str = "update.lock";

// ---------------------------------------------------------------------------
// Database layout
// ---------------------------------------------------------------------------

pub const DATABASE_FILE: &str = "refdb.redb";
pub const BACKUP_SUFFIX: &str = ".old";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn source_tree(work_root: &Path) -> PathBuf {
    work_root.join(SOURCE_DIR)
}

pub fn live_dir(work_root: &Path, version: &str) -> PathBuf {
    work_root.join(VAR_DIR).join(version)
}

/// Sibling of `live` that holds the previous artifact during a swap.
pub fn backup_path(live: &Path) -> PathBuf {
    let mut name = live.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

pub fn scratch_dir(state_dir: &Path) -> PathBuf {
    state_dir.join(SCRATCH_DIR)
}

pub fn staging_dir(scratch: &Path) -> PathBuf {
    scratch.join(STAGING_DIR)
}

pub fn ledger_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LEDGER_FILE)
}

pub fn lock_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOCK_FILE)
}

pub fn database_file(prefix: &Path) -> PathBuf {
    prefix.join(DATABASE_FILE)
}

pub fn library_index(tree: &Path) -> PathBuf {
    tree.join(LIBRARIES_FILE)
}

pub fn library_document(tree: &Path, library: &str) -> PathBuf {
    tree.join(format!("{library}.{DOCUMENT_EXT}"))
}

// ---------------------------------------------------------------------------
// Version validation
// ---------------------------------------------------------------------------

static VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn version_re() -> &'static Regex {
    VERSION_RE.get_or_init(|| Regex::new(r"^[0-9A-Za-z][0-9A-Za-z._\-]*$").unwrap())
}

/// A version names a directory under `var/`, so it must be a single path
/// component.
pub fn validate_version(version: &str) -> Result<()> {
    if version.len() > 64 || !version_re().is_match(version) || version.contains("..") {
        return Err(RefdbError::InvalidVersion(version.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
