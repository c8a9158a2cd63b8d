use crate::config::UpdateConfig;
use crate::database::{RefDatabase, UpdateStats};
use crate::error::BuildError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Inputs of one database build, fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub work_directory: PathBuf,
    pub source_tree: PathBuf,
    pub version: String,
    pub encoding: String,
}

impl BuildRequest {
    pub fn from_config(config: &UpdateConfig) -> Self {
        Self {
            work_directory: config.work_root.clone(),
            source_tree: config.source_tree(),
            version: config.version.clone(),
            encoding: config.encoding.clone(),
        }
    }
}

/// Build a complete database at `staging`.
///
/// Metadata and documents are committed in two independent transactions; the
/// database handle is closed before returning so the directory can be moved.
pub fn build(staging: &Path, request: &BuildRequest) -> Result<UpdateStats, BuildError> {
    let db = RefDatabase::init(staging)?;
    db.transaction(|tx| {
        tx.propset("version", &request.version)?;
        tx.propset("encoding", &request.encoding)
    })?;
    let stats = db.transaction(|tx| tx.update_from_source_tree(&request.source_tree))?;
    info!(
        staging = %staging.display(),
        libraries = stats.libraries,
        entries = stats.entries,
        "database built"
    );
    Ok(stats)
}
