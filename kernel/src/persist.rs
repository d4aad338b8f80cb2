// Atomic File Replacement
//
// Writes go to a uniquely named temporary file in the target's directory
// and are then renamed over the target, so readers never observe a
// partial file and no neighbouring file is ever reused as scratch space.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Replace the contents of `path` with `contents`.
pub(crate) fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn replaces_target_and_leaves_neighbours_alone() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("m1.dvc");
        fs::write(&target, "old").unwrap();
        fs::write(dir.path().join("m1.tmp"), "user notes").unwrap();
        fs::write(dir.path().join("m1.dvc.tmp"), "more notes").unwrap();

        replace_file(&target, b"new").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        assert_eq!(fs::read_to_string(dir.path().join("m1.tmp")).unwrap(), "user notes");
        assert_eq!(
            fs::read_to_string(dir.path().join("m1.dvc.tmp")).unwrap(),
            "more notes"
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn creates_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("model_registry.json");

        replace_file(&target, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{}");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
