//! Reader for documentation source trees.
//!
//! A tree holds a `LIBRARIES` index (one library name per line, `#` comments
//! and blank lines ignored) and one `<library>.rd` document per listed name.
//! Inside a document, `= class NAME` and `= module NAME` open an entry and
//! `--- SIGNATURE` declares a method of the entry currently open. All other
//! lines are prose.

use crate::error::BuildError;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Class,
    Module,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    pub library: String,
    #[serde(default)]
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDoc {
    pub name: String,
    pub entries: Vec<Entry>,
}

fn read_text(path: &Path) -> Result<String, BuildError> {
    let bytes = std::fs::read(path).map_err(|e| BuildError::io("read", path, e))?;
    String::from_utf8(bytes).map_err(|_| BuildError::Encoding {
        path: path.to_path_buf(),
    })
}

pub fn read_library_index(tree: &Path) -> Result<Vec<String>, BuildError> {
    let path = paths::library_index(tree);
    if !path.is_file() {
        return Err(BuildError::MissingIndex(path));
    }
    let text = read_text(&path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect())
}

pub fn read_library(tree: &Path, library: &str) -> Result<LibraryDoc, BuildError> {
    let path = paths::library_document(tree, library);
    if !path.is_file() {
        return Err(BuildError::MissingDocument {
            library: library.to_string(),
            path,
        });
    }
    let text = read_text(&path)?;
    let entries = parse_document(library, &path, &text)?;
    Ok(LibraryDoc {
        name: library.to_string(),
        entries,
    })
}

fn heading(line: &str) -> Option<(EntryKind, &str)> {
    for (prefix, kind) in [("= class", EntryKind::Class), ("= module", EntryKind::Module)] {
        if let Some(rest) = line.strip_prefix(prefix) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return Some((kind, rest));
            }
        }
    }
    None
}

pub fn parse_document(library: &str, path: &Path, text: &str) -> Result<Vec<Entry>, BuildError> {
    let parse_error = |line: usize, message: &str| BuildError::Parse {
        path: path.to_path_buf(),
        line,
        message: message.to_string(),
    };

    let mut entries: Vec<Entry> = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        if let Some((kind, rest)) = heading(line) {
            // `= class Foo < Bar` names Foo.
            let name = rest
                .split_whitespace()
                .next()
                .ok_or_else(|| parse_error(lineno, "heading without a name"))?;
            entries.push(Entry {
                name: name.to_string(),
                kind,
                library: library.to_string(),
                methods: Vec::new(),
            });
        } else if let Some(sig) = line.strip_prefix("---") {
            let sig = sig.trim();
            if sig.is_empty() {
                return Err(parse_error(lineno, "empty method signature"));
            }
            let entry = entries.last_mut().ok_or_else(|| {
                parse_error(lineno, "method declared outside of a class or module")
            })?;
            entry.methods.push(sig.to_string());
        }
    }
    Ok(entries)
}
