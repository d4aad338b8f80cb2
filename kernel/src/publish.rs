// Publish Workflow
//
// Records a new revision of an artifact:
// validate → regression gate → track → read checksum → append + save
// → commit → push content → push history
//
// The registry is saved before any provenance or transfer step, so a
// failure there leaves a consistent registry that can be retried.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::adapters::{ContentTracker, DelegateError, ProvenanceRecorder};
use crate::descriptor::{self, DescriptorError};
use crate::registry::{Registry, RegistryError, RegistryStore, VersionEntry};
use crate::version::{self, VersionError, VersionId};
use crate::workspace::Workspace;

/// What kind of artifact is being published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Data,
    Model,
}

impl ArtifactKind {
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Data => "File/Folder",
            ArtifactKind::Model => "Model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Path handed to the content tracker, relative to the workspace root.
    pub path: PathBuf,
    pub version: String,
    pub name: String,
    pub description: String,
    pub kind: ArtifactKind,
}

/// Result of the side-effect free checks that precede publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishCheck {
    Clear,

    /// The requested version sorts below the latest recorded one and
    /// needs explicit confirmation.
    Regression { latest: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub name: String,
    pub version: String,
    pub checksum: String,
    pub kind: ArtifactKind,
    pub descriptor: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("description must not be empty")]
    EmptyDescription,

    #[error("latest version of `{name}` is {latest}; publishing {requested} was not confirmed")]
    RegressionNotConfirmed {
        name: String,
        latest: String,
        requested: String,
    },

    #[error("checksum unavailable after tracking: {0}")]
    ChecksumUnavailable(#[source] DescriptorError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Delegate(#[from] DelegateError),
}

/// Checks that need nothing but the request itself.
fn validate(request: &PublishRequest) -> Result<VersionId, PublishError> {
    let requested = VersionId::parse(request.version.as_str())?;
    if request.description.trim().is_empty() {
        return Err(PublishError::EmptyDescription);
    }
    Ok(requested)
}

fn check(registry: &Registry, name: &str, requested: &VersionId) -> PublishCheck {
    match registry.latest_version(name) {
        Some(latest) if version::is_regression(requested.as_str(), latest) => {
            PublishCheck::Regression {
                latest: latest.to_string(),
            }
        }
        _ => PublishCheck::Clear,
    }
}

/// Validate `request` against the current registry without touching
/// anything. Callers use this to decide whether to ask for confirmation.
pub fn preflight<S: RegistryStore>(
    workspace: &Workspace<S>,
    request: &PublishRequest,
) -> Result<PublishCheck, PublishError> {
    let requested = validate(request)?;
    let registry = workspace.load_registry()?;
    Ok(check(&registry, &request.name, &requested))
}

/// Publish `request`.
///
/// `confirmed` is the caller's answer to the regression gate; it is only
/// consulted when the requested version sorts below the latest one.
pub fn publish<S, T, P>(
    workspace: &mut Workspace<S>,
    tracker: &mut T,
    recorder: &mut P,
    request: &PublishRequest,
    confirmed: bool,
) -> Result<PublishOutcome, PublishError>
where
    S: RegistryStore,
    T: ContentTracker,
    P: ProvenanceRecorder,
{
    let requested = validate(request)?;
    let mut registry = workspace.load_registry()?;

    if let PublishCheck::Regression { latest } = check(&registry, &request.name, &requested) {
        if !confirmed {
            return Err(PublishError::RegressionNotConfirmed {
                name: request.name.clone(),
                latest,
                requested: request.version.clone(),
            });
        }
        warn!(
            artifact = %request.name,
            %latest,
            requested = %request.version,
            "publishing a version older than the latest"
        );
    }

    // The checksum must come from the descriptor this very track call
    // wrote; a same-named leftover may hold an older revision.
    let descriptor_path = tracker.track(&request.path)?;
    let own_descriptor = workspace.descriptor_path(&request.name);
    if descriptor_path != own_descriptor {
        warn!(
            tracked = %descriptor_path.display(),
            expected = %own_descriptor.display(),
            "tracked descriptor is not named after the artifact; switch will not find it"
        );
    }

    let checksum =
        descriptor::read_checksum(&descriptor_path).map_err(PublishError::ChecksumUnavailable)?;

    registry.append(
        &request.name,
        VersionEntry {
            checksum: checksum.clone(),
            description: request.description.clone(),
            version: request.version.clone(),
        },
    );
    workspace.save_registry(&registry)?;
    info!(
        artifact = %request.name,
        version = %request.version,
        %checksum,
        "registry entry recorded"
    );

    recorder.commit(
        &[
            relative_to_root(workspace, &descriptor_path),
            relative_to_root(workspace, &workspace.registry_path()),
        ],
        &request.description,
    )?;
    tracker.push(&request.path)?;
    recorder.push()?;

    Ok(PublishOutcome {
        name: request.name.clone(),
        version: request.version.clone(),
        checksum,
        kind: request.kind,
        descriptor: descriptor_path,
    })
}

/// `path` as the provenance tool sees it, relative to the root when possible.
fn relative_to_root<S: RegistryStore>(workspace: &Workspace<S>, path: &Path) -> PathBuf {
    path.strip_prefix(workspace.root())
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
