// DVC Adapter
//
// Content tracking through the `dvc` command line. Descriptors are the
// `<path>.dvc` files DVC writes next to each tracked path.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use super::{run_tool, ContentTracker, DelegateError, DelegatedStep};

#[derive(Debug, Clone)]
pub struct DvcTracker {
    root: PathBuf,
    program: String,
}

impl DvcTracker {
    /// `program` is the executable to invoke, normally `dvc`.
    pub fn new(root: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            program: program.into(),
        }
    }
}

/// Descriptor DVC writes when tracking `path`.
///
/// Trailing separators are dropped first: `data/` is tracked by `data.dvc`.
pub fn descriptor_for(path: &Path) -> PathBuf {
    let normalized: PathBuf = path.components().collect();
    let mut name = OsString::from(normalized.as_os_str());
    name.push(".dvc");
    PathBuf::from(name)
}

impl ContentTracker for DvcTracker {
    fn track(&mut self, path: &Path) -> Result<PathBuf, DelegateError> {
        run_tool(
            DelegatedStep::Track,
            &self.root,
            &self.program,
            [OsStr::new("add"), path.as_os_str()],
        )?;
        Ok(self.root.join(descriptor_for(path)))
    }

    fn fetch(&mut self, target: &Path) -> Result<(), DelegateError> {
        run_tool(
            DelegatedStep::Fetch,
            &self.root,
            &self.program,
            [OsStr::new("pull"), target.as_os_str()],
        )
    }

    fn push(&mut self, path: &Path) -> Result<(), DelegateError> {
        run_tool(
            DelegatedStep::PushContent,
            &self.root,
            &self.program,
            [OsStr::new("push"), path.as_os_str()],
        )
    }
}
