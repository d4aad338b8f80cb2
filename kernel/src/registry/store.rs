// Registry Storage
//
// Durability boundary for the registry. Every operation loads the whole
// registry up front and saves the whole registry back at the end.
//
// NOTE:
// There is no locking. Two processes running load → mutate → save at the
// same time can lose one another's updates.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Registry, RegistryError};
use crate::persist;

/// Storage backend for the registry.
pub trait RegistryStore {
    /// Load the full registry. A store that has never been written yields
    /// an empty registry.
    fn load(&self) -> Result<Registry, RegistryError>;

    /// Replace the persisted registry with `registry`.
    fn save(&mut self, registry: &Registry) -> Result<(), RegistryError>;
}

/// JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileRegistryStore {
    path: PathBuf,
}

impl FileRegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RegistryStore for FileRegistryStore {
    fn load(&self) -> Result<Registry, RegistryError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no registry file, starting empty");
                return Ok(Registry::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let registry = Registry::from_json(&json).map_err(|e| RegistryError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        debug!(path = %self.path.display(), "registry loaded");
        Ok(registry)
    }

    fn save(&mut self, registry: &Registry) -> Result<(), RegistryError> {
        let json = registry.to_json().map_err(|e| RegistryError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        // Write-then-rename so a crash never leaves a truncated registry.
        persist::replace_file(&self.path, json.as_bytes()).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "registry saved");
        Ok(())
    }
}

/// Registry kept as serialized text in memory. Used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistryStore {
    contents: Option<String>,
}

impl InMemoryRegistryStore {
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl RegistryStore for InMemoryRegistryStore {
    fn load(&self) -> Result<Registry, RegistryError> {
        match &self.contents {
            None => Ok(Registry::new()),
            Some(json) => Registry::from_json(json).map_err(|e| RegistryError::Corrupt {
                path: PathBuf::from("<memory>"),
                reason: e.to_string(),
            }),
        }
    }

    fn save(&mut self, registry: &Registry) -> Result<(), RegistryError> {
        let json = registry.to_json().map_err(|e| RegistryError::Corrupt {
            path: PathBuf::from("<memory>"),
            reason: e.to_string(),
        })?;
        self.contents = Some(json);
        Ok(())
    }
}
