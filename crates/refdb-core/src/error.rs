use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Failures raised while constructing a database in the staging area.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("database already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("library index not found: {0}")]
    MissingIndex(PathBuf),

    #[error("library '{library}' has no document at {path}")]
    MissingDocument { library: String, path: PathBuf },

    #[error("{path}: document is not valid UTF-8")]
    Encoding { path: PathBuf },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("entry '{name}' in library '{library}' is already defined")]
    DuplicateEntry { name: String, library: String },

    #[error("failed to {action} {path}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database operation failed")]
    Database(#[from] redb::Error),

    #[error("failed to encode entry '{name}'")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl BuildError {
    pub fn kind(&self) -> &'static str {
        match self {
            BuildError::AlreadyExists(_) => "BuildError::AlreadyExists",
            BuildError::MissingIndex(_) => "BuildError::MissingIndex",
            BuildError::MissingDocument { .. } => "BuildError::MissingDocument",
            BuildError::Encoding { .. } => "BuildError::Encoding",
            BuildError::Parse { .. } => "BuildError::Parse",
            BuildError::DuplicateEntry { .. } => "BuildError::DuplicateEntry",
            BuildError::Io { .. } => "BuildError::Io",
            BuildError::Database(_) => "BuildError::Database",
            BuildError::Encode { .. } => "BuildError::Encode",
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Map any redb error family into a `BuildError`.
pub(crate) fn db_error(err: impl Into<redb::Error>) -> BuildError {
    BuildError::Database(err.into())
}

/// Failures while swapping the staging artifact into the live path.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("staging artifact missing: {0}")]
    MissingStaging(PathBuf),

    #[error("failed to move {from} to {to}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to {action} {path}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::MissingStaging(_) => "PublishError::MissingStaging",
            PublishError::Rename { .. } => "PublishError::Rename",
            PublishError::Io { .. } => "PublishError::Io",
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PublishError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// A failed build or publish. These are recorded and reported, never fatal.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl UpdateError {
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateError::Build(e) => e.kind(),
            UpdateError::Publish(e) => e.kind(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail address '{address}'")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to compose failure report")]
    Compose(#[from] lettre::error::Error),

    #[error("mail relay {host}:{port} did not accept the failure report")]
    Transport {
        host: String,
        port: u16,
        #[source]
        source: lettre::transport::smtp::Error,
    },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed: {command} ({status})")]
    Failed { command: String, status: ExitStatus },
}

/// Failures of the job's own bookkeeping: ledger, lock, configuration.
#[derive(Debug, Error)]
pub enum RefdbError {
    #[error("invalid version '{0}': must start with an alphanumeric and contain only [A-Za-z0-9._-]")]
    InvalidVersion(String),

    #[error("invalid mail configuration: {0}")]
    MailConfig(String),

    #[error("failed to parse {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to {action} {path}")]
    Path {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RefdbError {
    pub(crate) fn path(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RefdbError::Path {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RefdbError>;
