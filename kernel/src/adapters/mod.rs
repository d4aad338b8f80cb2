// External Collaborators
//
// Narrow interfaces to the tools that own content storage and provenance.
// The workflows only ever talk to these traits; `dvc` and `git` hold the
// subprocess-backed implementations.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

pub mod dvc;
pub mod git;

pub use dvc::DvcTracker;
pub use git::GitRecorder;

/// Which delegated step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegatedStep {
    Track,
    Fetch,
    PushContent,
    Commit,
    PushHistory,
}

impl fmt::Display for DelegatedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DelegatedStep::Track => "track",
            DelegatedStep::Fetch => "fetch",
            DelegatedStep::PushContent => "push-content",
            DelegatedStep::Commit => "commit",
            DelegatedStep::PushHistory => "push-history",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DelegateError {
    #[error("{step} failed running `{command}`: {reason}")]
    Failed {
        step: DelegatedStep,
        command: String,
        reason: String,
    },
}

impl DelegateError {
    pub fn step(&self) -> DelegatedStep {
        match self {
            DelegateError::Failed { step, .. } => *step,
        }
    }
}

/// Content-addressed storage tool.
///
/// Implementations block until the underlying operation finishes.
pub trait ContentTracker {
    /// Start (or refresh) tracking `path`; returns the pointer descriptor
    /// the tool wrote for it.
    fn track(&mut self, path: &Path) -> Result<PathBuf, DelegateError>;

    /// Materialize content for `target` as its descriptor currently says.
    fn fetch(&mut self, target: &Path) -> Result<(), DelegateError>;

    /// Upload tracked content for `path` to the remote.
    fn push(&mut self, path: &Path) -> Result<(), DelegateError>;
}

/// Version-control system recording provenance.
pub trait ProvenanceRecorder {
    /// Stage `paths` and commit them with `message`.
    fn commit(&mut self, paths: &[PathBuf], message: &str) -> Result<(), DelegateError>;

    /// Push committed history to the remote.
    fn push(&mut self) -> Result<(), DelegateError>;
}

/// Run `program args..` in `cwd`, inheriting stdio, and require success.
pub(crate) fn run_tool<I, A>(
    step: DelegatedStep,
    cwd: &Path,
    program: &str,
    args: I,
) -> Result<(), DelegateError>
where
    I: IntoIterator<Item = A>,
    A: AsRef<std::ffi::OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(cwd);
    let rendered = render(&cmd);
    debug!(%step, command = %rendered, "running delegated command");

    let status = cmd.status().map_err(|e| DelegateError::Failed {
        step,
        command: rendered.clone(),
        reason: format!("could not start: {e}"),
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(DelegateError::Failed {
            step,
            command: rendered,
            reason: match status.code() {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".into(),
            },
        })
    }
}

fn render(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_reports_step() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_tool(
            DelegatedStep::Fetch,
            dir.path(),
            "dvreg-no-such-tool",
            ["pull", "m1"],
        )
        .unwrap_err();

        assert_eq!(err.step(), DelegatedStep::Fetch);
        let msg = err.to_string();
        assert!(msg.starts_with("fetch failed running `dvreg-no-such-tool pull m1`"));
        assert!(msg.contains("could not start"));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_tool(DelegatedStep::Commit, dir.path(), "false", Vec::<&str>::new())
            .unwrap_err();

        assert_eq!(
            err,
            DelegateError::Failed {
                step: DelegatedStep::Commit,
                command: "false".into(),
                reason: "exited with status 1".into(),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        run_tool(DelegatedStep::Track, dir.path(), "true", Vec::<&str>::new()).unwrap();
    }
}
