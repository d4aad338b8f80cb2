// Git Adapter
//
// Provenance recording through the `git` command line.

use std::path::PathBuf;

use super::{run_tool, DelegateError, DelegatedStep, ProvenanceRecorder};

#[derive(Debug, Clone)]
pub struct GitRecorder {
    root: PathBuf,
    program: String,
}

impl GitRecorder {
    pub fn new(root: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            program: program.into(),
        }
    }
}

impl ProvenanceRecorder for GitRecorder {
    fn commit(&mut self, paths: &[PathBuf], message: &str) -> Result<(), DelegateError> {
        let mut add_args = vec![PathBuf::from("add")];
        add_args.extend(paths.iter().cloned());
        run_tool(DelegatedStep::Commit, &self.root, &self.program, &add_args)?;

        run_tool(
            DelegatedStep::Commit,
            &self.root,
            &self.program,
            ["commit", "-m", message],
        )
    }

    fn push(&mut self) -> Result<(), DelegateError> {
        run_tool(DelegatedStep::PushHistory, &self.root, &self.program, ["push"])
    }
}
