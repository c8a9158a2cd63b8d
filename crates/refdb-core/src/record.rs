//! Canonical text form of a failed update.
//!
//! The same text is persisted in the ledger and sent as the email body, so two
//! failures are "the same" exactly when their canonical text is identical.

use crate::error::UpdateError;
use std::error::Error;
use std::fmt;

pub const SUBJECT_PREFIX: &str = "[build error] ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub message: String,
    pub kind: String,
    /// Cause chain, outermost first.
    pub frames: Vec<String>,
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>, kind: impl Into<String>, frames: Vec<String>) -> Self {
        Self {
            message: message.into(),
            kind: kind.into(),
            frames,
        }
    }

    pub fn from_update_error(err: &UpdateError) -> Self {
        Self::from_error(err.kind(), err)
    }

    /// Capture `err` and every `source()` beneath it.
    pub fn from_error(kind: &str, err: &(dyn Error + 'static)) -> Self {
        let mut frames = Vec::new();
        let mut cause = err.source();
        while let Some(e) = cause {
            frames.push(e.to_string());
            cause = e.source();
        }
        Self::new(err.to_string(), kind, frames)
    }

    pub fn subject(&self) -> String {
        format!("{SUBJECT_PREFIX}{}", self.message)
    }

    /// `"{message} ({kind})"` followed by one tab-indented line per frame.
    pub fn canonical_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.frames.len() + 1);
        lines.push(format!("{} ({})", self.message, self.kind));
        lines.extend(self.frames.iter().map(|f| format!("\t{f}")));
        lines.join("\n")
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BuildError, PublishError};
    use std::path::PathBuf;

    #[test]
    fn canonical_text_without_frames_is_one_line() {
        let record = ErrorRecord::new("boom", "BuildError::Parse", vec![]);
        assert_eq!(record.canonical_text(), "boom (BuildError::Parse)");
    }

    #[test]
    fn canonical_text_indents_frames() {
        let record = ErrorRecord::new(
            "failed to read src/LIBRARIES",
            "BuildError::Io",
            vec!["permission denied".into(), "os error 13".into()],
        );
        assert_eq!(
            record.to_string(),
            "failed to read src/LIBRARIES (BuildError::Io)\n\tpermission denied\n\tos error 13"
        );
    }

    #[test]
    fn subject_is_prefixed() {
        let record = ErrorRecord::new("boom", "BuildError::Parse", vec![]);
        assert_eq!(record.subject(), "[build error] boom");
    }

    #[test]
    fn from_update_error_collects_cause_chain() {
        let err = UpdateError::from(BuildError::Io {
            action: "read",
            path: PathBuf::from("src/LIBRARIES"),
            source: std::io::Error::other("disk on fire"),
        });
        let record = ErrorRecord::from_update_error(&err);
        assert_eq!(record.message, "failed to read src/LIBRARIES");
        assert_eq!(record.kind, "BuildError::Io");
        assert_eq!(record.frames, vec!["disk on fire".to_string()]);
    }

    #[test]
    fn from_update_error_keeps_publish_kind() {
        let err = UpdateError::from(PublishError::MissingStaging(PathBuf::from("db.tmp/db")));
        let record = ErrorRecord::from_update_error(&err);
        assert_eq!(record.kind, "PublishError::MissingStaging");
        assert!(record.frames.is_empty());
    }

    #[test]
    fn identical_failures_share_canonical_text() {
        let make = || {
            UpdateError::from(BuildError::Parse {
                path: PathBuf::from("src/set.rd"),
                line: 3,
                message: "method declared outside of a class or module".into(),
            })
        };
        let a = ErrorRecord::from_update_error(&make());
        let b = ErrorRecord::from_update_error(&make());
        assert_eq!(a.canonical_text(), b.canonical_text());
    }
}
