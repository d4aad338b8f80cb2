// Workspace
//
// Explicit handle on one local project: its root directory, its
// configuration and the registry store. Every workflow takes a workspace
// instead of reaching for process-wide state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::adapters::{DvcTracker, GitRecorder};
use crate::registry::{FileRegistryStore, Registry, RegistryError, RegistryStore};

/// Workspace configuration loaded from JSON.
///
/// Missing fields take their built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Registry file name, relative to the workspace root.
    pub registry_file: String,

    /// Extension of pointer descriptors, without the dot.
    pub descriptor_extension: String,

    /// Executable of the content-tracking tool.
    pub content_tool: String,

    /// Executable of the version-control system.
    pub provenance_tool: String,
}

impl WorkspaceConfig {
    /// Built-in configuration (used if no config is provided).
    pub fn default_config() -> Self {
        Self {
            registry_file: "model_registry.json".into(),
            descriptor_extension: "dvc".into(),
            content_tool: "dvc".into(),
            provenance_tool: "git".into(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

#[derive(Debug)]
pub struct Workspace<S: RegistryStore = FileRegistryStore> {
    root: PathBuf,
    config: WorkspaceConfig,
    store: S,
}

impl Workspace<FileRegistryStore> {
    /// Open the workspace rooted at `root`, persisting the registry to
    /// `<root>/<registry_file>`.
    pub fn open(root: impl Into<PathBuf>, config: WorkspaceConfig) -> Self {
        let root = root.into();
        let store = FileRegistryStore::new(root.join(&config.registry_file));
        Self {
            root,
            config,
            store,
        }
    }
}

impl<S: RegistryStore> Workspace<S> {
    pub fn with_store(root: impl Into<PathBuf>, config: WorkspaceConfig, store: S) -> Self {
        Self {
            root: root.into(),
            config,
            store,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(&self.config.registry_file)
    }

    /// Pointer descriptor for artifact `name`: `<root>/<name>.<ext>`.
    pub fn descriptor_path(&self, name: &str) -> PathBuf {
        self.root
            .join(format!("{name}.{}", self.config.descriptor_extension))
    }

    pub fn load_registry(&self) -> Result<Registry, RegistryError> {
        self.store.load()
    }

    pub fn save_registry(&mut self, registry: &Registry) -> Result<(), RegistryError> {
        self.store.save(registry)
    }

    /// Content tracker driving the configured tool in this workspace.
    pub fn content_tracker(&self) -> DvcTracker {
        DvcTracker::new(&self.root, &self.config.content_tool)
    }

    /// Provenance recorder driving the configured tool in this workspace.
    pub fn provenance_recorder(&self) -> GitRecorder {
        GitRecorder::new(&self.root, &self.config.provenance_tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::VersionEntry;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: WorkspaceConfig =
            serde_json::from_str(r#"{ "registry_file": "registry.json" }"#).unwrap();

        assert_eq!(config.registry_file, "registry.json");
        assert_eq!(config.descriptor_extension, "dvc");
        assert_eq!(config.content_tool, "dvc");
        assert_eq!(config.provenance_tool, "git");
    }

    #[test]
    fn paths_derive_from_root_and_name() {
        let ws = Workspace::open("/work", WorkspaceConfig::default_config());

        assert_eq!(ws.registry_path(), PathBuf::from("/work/model_registry.json"));
        assert_eq!(ws.descriptor_path("m1"), PathBuf::from("/work/m1.dvc"));
    }

    #[test]
    fn open_persists_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = Workspace::open(dir.path(), WorkspaceConfig::default_config());

        let mut registry = ws.load_registry().unwrap();
        registry.append(
            "m1",
            VersionEntry {
                checksum: "abc123".into(),
                description: "first cut".into(),
                version: "v1.0.0".into(),
            },
        );
        ws.save_registry(&registry).unwrap();

        assert!(dir.path().join("model_registry.json").exists());
        assert_eq!(ws.load_registry().unwrap(), registry);
    }
}
