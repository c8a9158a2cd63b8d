use crate::error::{RefdbError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_VERSION: &str = "1.9.0";
pub const DEFAULT_ENCODING: &str = "utf-8";
pub const DEFAULT_SMTP_PORT: u16 = 25;

// ---------------------------------------------------------------------------
// MailConfig
// ---------------------------------------------------------------------------

/// Mail settings as read from a config file and/or command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            from: None,
            to: None,
        }
    }
}

/// A fully specified relay: where to connect and who sends to whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub from: String,
    pub to: String,
}

impl MailConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            std::fs::read_to_string(path).map_err(|e| RefdbError::path("read", path, e))?;
        serde_yaml::from_str(&data).map_err(|source| RefdbError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay explicitly given values on top of `self`.
    pub fn override_with(
        mut self,
        smtp_host: Option<String>,
        smtp_port: Option<u16>,
        from: Option<String>,
        to: Option<String>,
    ) -> Self {
        if smtp_host.is_some() {
            self.smtp_host = smtp_host;
        }
        if let Some(port) = smtp_port {
            self.smtp_port = port;
        }
        if from.is_some() {
            self.from = from;
        }
        if to.is_some() {
            self.to = to;
        }
        self
    }

    /// `None` when no relay host is configured. A host without both
    /// addresses is a configuration error.
    pub fn relay(&self) -> Result<Option<SmtpSettings>> {
        let Some(host) = self.smtp_host.as_deref().filter(|h| !h.is_empty()) else {
            return Ok(None);
        };
        let from = self
            .from
            .clone()
            .ok_or_else(|| RefdbError::MailConfig("--smtp-host requires --from".into()))?;
        let to = self
            .to
            .clone()
            .ok_or_else(|| RefdbError::MailConfig("--smtp-host requires --to".into()))?;
        Ok(Some(SmtpSettings {
            host: host.to_string(),
            port: self.smtp_port,
            from,
            to,
        }))
    }
}

// ---------------------------------------------------------------------------
// UpdateConfig
// ---------------------------------------------------------------------------

/// Everything one update run needs to locate its inputs, outputs and state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateConfig {
    /// Contains `src/` and `var/<version>/`.
    pub work_root: PathBuf,
    pub version: String,
    pub encoding: String,
    /// Holds the scratch area, the ledger and the lock file.
    pub state_dir: PathBuf,
}

impl UpdateConfig {
    pub fn new(work_root: impl Into<PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
            version: DEFAULT_VERSION.to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
            state_dir: PathBuf::from("."),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_state_dir(mut self, state_dir: impl Into<PathBuf>) -> Self {
        self.state_dir = state_dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        paths::validate_version(&self.version)
    }

    pub fn source_tree(&self) -> PathBuf {
        paths::source_tree(&self.work_root)
    }

    pub fn live_dir(&self) -> PathBuf {
        paths::live_dir(&self.work_root, &self.version)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        paths::scratch_dir(&self.state_dir)
    }

    pub fn ledger_path(&self) -> PathBuf {
        paths::ledger_path(&self.state_dir)
    }

    pub fn lock_path(&self) -> PathBuf {
        paths::lock_path(&self.state_dir)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = UpdateConfig::new("/srv/refdb");
        assert_eq!(config.version, "1.9.0");
        assert_eq!(config.encoding, "utf-8");
        assert_eq!(config.live_dir(), PathBuf::from("/srv/refdb/var/1.9.0"));
        assert_eq!(config.source_tree(), PathBuf::from("/srv/refdb/src"));
        assert_eq!(config.ledger_path(), PathBuf::from("./lasterror.log"));
        assert_eq!(MailConfig::default().smtp_port, 25);
    }

    #[test]
    fn invalid_version_rejected() {
        let config = UpdateConfig::new("/srv/refdb").with_version("../escape");
        assert!(matches!(
            config.validate(),
            Err(RefdbError::InvalidVersion(_))
        ));
    }

    #[test]
    fn no_host_means_no_relay() {
        let mail = MailConfig::default().override_with(
            None,
            None,
            Some("ops@example.org".into()),
            None,
        );
        assert_eq!(mail.relay().unwrap(), None);
    }

    #[test]
    fn host_requires_addresses() {
        let mail = MailConfig::default().override_with(
            Some("mail.example.org".into()),
            None,
            Some("ops@example.org".into()),
            None,
        );
        assert!(matches!(mail.relay(), Err(RefdbError::MailConfig(_))));
    }

    #[test]
    fn relay_uses_configured_port() {
        let mail = MailConfig::default().override_with(
            Some("mail.example.org".into()),
            Some(2525),
            Some("refdb@example.org".into()),
            Some("ops@example.org".into()),
        );
        let relay = mail.relay().unwrap().unwrap();
        assert_eq!(relay.host, "mail.example.org");
        assert_eq!(relay.port, 2525);
        assert_eq!(relay.to, "ops@example.org");
    }

    #[test]
    fn load_from_yaml_then_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mail.yaml");
        std::fs::write(
            &path,
            "smtp_host: relay.internal\nfrom: refdb@example.org\nto: docs@example.org\n",
        )
        .unwrap();
        let mail = MailConfig::load(&path)
            .unwrap()
            .override_with(None, Some(587), None, Some("ops@example.org".into()));
        assert_eq!(mail.smtp_host.as_deref(), Some("relay.internal"));
        assert_eq!(mail.smtp_port, 587);
        assert_eq!(mail.from.as_deref(), Some("refdb@example.org"));
        assert_eq!(mail.to.as_deref(), Some("ops@example.org"));
    }

    #[test]
    fn load_reports_bad_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mail.yaml");
        std::fs::write(&path, "smtp_port: [not, a, port]\n").unwrap();
        assert!(matches!(
            MailConfig::load(&path),
            Err(RefdbError::Config { .. })
        ));
    }
}
