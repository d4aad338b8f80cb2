// Content Retrieval
//
// Fetch artifact content from the remote without touching the registry
// or any descriptor.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::adapters::{ContentTracker, DelegateError};

/// Fetch the whole artifact `name` at the version its descriptor names.
pub fn pull_artifact<T: ContentTracker>(
    tracker: &mut T,
    name: &str,
) -> Result<PathBuf, DelegateError> {
    let target = PathBuf::from(name);
    tracker.fetch(&target)?;
    info!(artifact = name, "artifact pulled");
    Ok(target)
}

/// Fetch a single file or folder `file` inside artifact `name`.
pub fn pull_file<T: ContentTracker>(
    tracker: &mut T,
    name: &str,
    file: &Path,
) -> Result<PathBuf, DelegateError> {
    let target = Path::new(name).join(file);
    tracker.fetch(&target)?;
    info!(artifact = name, file = %file.display(), "file pulled");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::DelegatedStep;

    #[derive(Default)]
    struct RecordingTracker {
        fetched: Vec<PathBuf>,
        fail: bool,
    }

    impl ContentTracker for RecordingTracker {
        fn track(&mut self, path: &Path) -> Result<PathBuf, DelegateError> {
            Ok(path.to_path_buf())
        }

        fn fetch(&mut self, target: &Path) -> Result<(), DelegateError> {
            if self.fail {
                return Err(DelegateError::Failed {
                    step: DelegatedStep::Fetch,
                    command: format!("dvc pull {}", target.display()),
                    reason: "exited with status 1".into(),
                });
            }
            self.fetched.push(target.to_path_buf());
            Ok(())
        }

        fn push(&mut self, _path: &Path) -> Result<(), DelegateError> {
            Ok(())
        }
    }

    #[test]
    fn pulls_artifact_by_name() {
        let mut tracker = RecordingTracker::default();
        let target = pull_artifact(&mut tracker, "m1").unwrap();

        assert_eq!(target, PathBuf::from("m1"));
        assert_eq!(tracker.fetched, vec![PathBuf::from("m1")]);
    }

    #[test]
    fn pulls_file_inside_artifact() {
        let mut tracker = RecordingTracker::default();
        let target = pull_file(&mut tracker, "m1", Path::new("weights/layer0.bin")).unwrap();

        assert_eq!(target, PathBuf::from("m1/weights/layer0.bin"));
        assert_eq!(tracker.fetched, vec![target]);
    }

    #[test]
    fn fetch_failure_propagates() {
        let mut tracker = RecordingTracker {
            fail: true,
            ..Default::default()
        };
        let err = pull_artifact(&mut tracker, "m1").unwrap_err();
        assert_eq!(err.step(), DelegatedStep::Fetch);
    }
}
