// Artifact Registry
//
// Named, append-only version histories for tracked datasets and models.
// The registry is always handled as a whole: load, mutate in memory, save.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::version;

pub mod store;

pub use store::{FileRegistryStore, InMemoryRegistryStore, RegistryStore};

/// A single published revision of an artifact.
///
/// Field order matches the on-disk record: `md5`, `description`, `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    #[serde(rename = "md5")]
    pub checksum: String,
    pub description: String,
    pub version: String,
}

/// Append-ordered history of one artifact.
///
/// NOTE:
/// Entries are never sorted, edited or removed. Duplicate version
/// strings are tolerated; lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactHistory {
    entries: Vec<VersionEntry>,
}

impl ArtifactHistory {
    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&VersionEntry> {
        self.entries.last()
    }

    pub fn find(&self, version: &str) -> Option<&VersionEntry> {
        self.entries.iter().find(|e| e.version == version)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("registry I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Mapping from artifact name to its history, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    artifacts: IndexMap<String, ArtifactHistory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version string of the last-appended entry for `name`.
    pub fn latest_version(&self, name: &str) -> Option<&str> {
        self.artifacts
            .get(name)
            .and_then(ArtifactHistory::latest)
            .map(|e| e.version.as_str())
    }

    /// Add `entry` to the end of `name`'s history, creating it if absent.
    pub fn append(&mut self, name: &str, entry: VersionEntry) {
        self.artifacts
            .entry(name.to_string())
            .or_default()
            .entries
            .push(entry);
    }

    /// First entry of `name` whose version equals `version`.
    pub fn find_version(&self, name: &str, version: &str) -> Option<&VersionEntry> {
        self.artifacts.get(name).and_then(|h| h.find(version))
    }

    pub fn history(&self, name: &str) -> Option<&ArtifactHistory> {
        self.artifacts.get(name)
    }

    /// Entries of `name` ordered by version string (lexicographic).
    pub fn sorted_versions(&self, name: &str) -> Vec<&VersionEntry> {
        let mut entries: Vec<_> = self
            .artifacts
            .get(name)
            .map(|h| h.entries.iter().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| version::compare(&a.version, &b.version));
        entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Render in the persisted layout: 4-space indented JSON, no trailing newline.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only ever emits valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
