// src/engine/script.rs

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::errors::Result;

/// Identity a session is keyed by; at most one active run per id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptId(String);

impl ScriptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScriptId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A script snapshot; sessions hold it behind an `Arc` and never see later edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub id: ScriptId,
    pub name: String,
    pub source: Arc<str>,
}

impl Script {
    pub fn new(id: impl Into<ScriptId>, name: impl Into<String>, source: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source: source.into(),
        }
    }

    /// Load a script file; id = canonical path, name = file stem.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {:?}", path))?;
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("script")
            .to_string();

        Ok(Self {
            id: ScriptId::new(canonical.display().to_string()),
            name,
            source: source.into(),
        })
    }
}

impl From<String> for ScriptId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
