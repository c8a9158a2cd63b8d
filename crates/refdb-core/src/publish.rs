//! Atomic swap of a freshly built database into its live path.
//!
//! The live artifact is first renamed to a sibling backup (`<live>.old`), then
//! the staging artifact is renamed into the live path. A crash between the two
//! renames leaves the old artifact under the backup name; [`Publisher::recover`]
//! puts it back before the next run touches anything.

use crate::error::PublishError;
use crate::io;
use crate::paths;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct Publisher {
    live: PathBuf,
    backup: PathBuf,
    scratch: PathBuf,
}

impl Publisher {
    pub fn new(live: impl Into<PathBuf>, scratch: impl Into<PathBuf>) -> Self {
        let live = live.into();
        Self {
            backup: paths::backup_path(&live),
            live,
            scratch: scratch.into(),
        }
    }

    pub fn live_path(&self) -> &Path {
        &self.live
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    pub fn staging_path(&self) -> PathBuf {
        paths::staging_dir(&self.scratch)
    }

    /// Restore the backup if an interrupted swap left the live path empty.
    /// Returns true if something was restored.
    pub fn recover(&self) -> Result<bool, PublishError> {
        if self.live.exists() || !self.backup.exists() {
            return Ok(false);
        }
        warn!(
            live = %self.live.display(),
            backup = %self.backup.display(),
            "live artifact missing after interrupted publish, restoring backup"
        );
        std::fs::rename(&self.backup, &self.live).map_err(|source| PublishError::Rename {
            from: self.backup.clone(),
            to: self.live.clone(),
            source,
        })?;
        Ok(true)
    }

    /// Clear leftovers from a previous run and create an empty scratch area.
    ///
    /// The returned guard runs [`Publisher::cleanup`] when dropped.
    pub fn prepare(&self) -> Result<Cleanup<'_>, PublishError> {
        if io::remove_tree_if_exists(&self.scratch)
            .map_err(|e| PublishError::io("remove", &self.scratch, e))?
        {
            warn!(scratch = %self.scratch.display(), "removed stale scratch area");
        }
        std::fs::create_dir_all(&self.scratch)
            .map_err(|e| PublishError::io("create", &self.scratch, e))?;
        Ok(Cleanup { publisher: self })
    }

    /// Backup-then-promote. If promotion fails the backup is moved back.
    pub fn publish(&self) -> Result<(), PublishError> {
        let staging = self.staging_path();
        if !staging.is_dir() {
            return Err(PublishError::MissingStaging(staging));
        }
        if let Some(parent) = self.live.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PublishError::io("create", parent, e))?;
        }

        let had_live = self.live.exists();
        if had_live {
            // Stale only: recover() already restored it if the live path was empty.
            io::remove_tree_if_exists(&self.backup)
                .map_err(|e| PublishError::io("remove", &self.backup, e))?;
            std::fs::rename(&self.live, &self.backup).map_err(|source| PublishError::Rename {
                from: self.live.clone(),
                to: self.backup.clone(),
                source,
            })?;
        }

        if let Err(source) = std::fs::rename(&staging, &self.live) {
            if had_live {
                if let Err(e) = std::fs::rename(&self.backup, &self.live) {
                    error!(
                        backup = %self.backup.display(),
                        error = %e,
                        "rollback failed, previous artifact left at backup path"
                    );
                }
            }
            return Err(PublishError::Rename {
                from: staging,
                to: self.live.clone(),
                source,
            });
        }

        info!(live = %self.live.display(), "database published");
        Ok(())
    }

    /// Remove the backup and the scratch area. Never fails; problems are logged.
    ///
    /// The backup is kept if the live path is empty, since it is then the only
    /// remaining copy.
    pub fn cleanup(&self) {
        if self.live.exists() {
            if let Err(e) = io::remove_tree_if_exists(&self.backup) {
                warn!(path = %self.backup.display(), error = %e, "failed to remove backup");
            }
        } else if self.backup.exists() {
            warn!(
                path = %self.backup.display(),
                "live artifact missing, keeping backup"
            );
        }
        if let Err(e) = io::remove_tree_if_exists(&self.scratch) {
            warn!(path = %self.scratch.display(), error = %e, "failed to remove scratch area");
        }
    }
}

/// Runs [`Publisher::cleanup`] on drop, including during unwinding.
#[must_use = "cleanup runs when the guard is dropped"]
pub struct Cleanup<'a> {
    publisher: &'a Publisher,
}

impl Drop for Cleanup<'_> {
    fn drop(&mut self) {
        self.publisher.cleanup();
    }
}
