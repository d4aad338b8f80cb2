// Version Switching
//
// Resolves a recorded version of an artifact to its checksum and points
// the artifact's descriptor at it, optionally fetching the content.
//
// log → resolve → rewrite descriptor → (fetch)

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::adapters::{ContentTracker, DelegateError};
use crate::descriptor::{self, DescriptorError};
use crate::registry::{RegistryError, RegistryStore};
use crate::workspace::Workspace;

/// What happened to the optional fetch after the descriptor rewrite.
#[derive(Debug, PartialEq, Eq)]
pub enum FetchStatus {
    Skipped,
    Fetched,

    /// The descriptor already points at the new version; a later fetch
    /// can still succeed without switching again.
    Failed(DelegateError),
}

#[derive(Debug, PartialEq, Eq)]
pub struct SwitchOutcome {
    pub name: String,
    pub version: String,
    pub checksum: String,
    pub descriptor: PathBuf,
    pub fetch: FetchStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("no entries found for `{0}` in registry")]
    UnknownArtifact(String),

    #[error("version {version} of `{name}` not found in registry")]
    UnknownVersion { name: String, version: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Point artifact `name` at `version`.
///
/// The descriptor rewrite is durable: a failed fetch is reported in the
/// outcome and never rolls it back.
pub fn switch_version<S, T>(
    workspace: &Workspace<S>,
    tracker: &mut T,
    name: &str,
    version: &str,
    also_fetch: bool,
) -> Result<SwitchOutcome, SwitchError>
where
    S: RegistryStore,
    T: ContentTracker,
{
    let registry = workspace.load_registry()?;

    if !registry.contains(name) {
        return Err(SwitchError::UnknownArtifact(name.to_string()));
    }

    let entry = registry
        .find_version(name, version)
        .ok_or_else(|| SwitchError::UnknownVersion {
            name: name.to_string(),
            version: version.to_string(),
        })?;

    let descriptor_path = workspace.descriptor_path(name);
    descriptor::write_checksum(&descriptor_path, &entry.checksum)?;
    info!(
        artifact = name,
        version,
        checksum = %entry.checksum,
        "descriptor switched"
    );

    let fetch = if also_fetch {
        match tracker.fetch(Path::new(name)) {
            Ok(()) => FetchStatus::Fetched,
            Err(e) => {
                warn!(artifact = name, error = %e, "fetch after switch failed");
                FetchStatus::Failed(e)
            }
        }
    } else {
        FetchStatus::Skipped
    };

    Ok(SwitchOutcome {
        name: name.to_string(),
        version: entry.version.clone(),
        checksum: entry.checksum.clone(),
        descriptor: descriptor_path,
        fetch,
    })
}
