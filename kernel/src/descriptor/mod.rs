// Pointer Descriptor Codec
//
// Reads and rewrites the content checksum held in a per-artifact pointer
// descriptor (`outs[0].md5`). Every other byte of the descriptor belongs
// to the content-tracking tool and is carried through untouched.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::persist;

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("pointer descriptor {0} does not exist")]
    Missing(PathBuf),

    #[error("pointer descriptor {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("pointer descriptor I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Extract the content checksum of the first tracked output.
pub fn read_checksum(path: &Path) -> Result<String, DescriptorError> {
    let text = read_descriptor(path)?;
    let doc = parse(path, &text)?;
    checksum_of(path, &doc)
}

/// Replace the first output's checksum with `checksum`, keeping the rest
/// of the file as it was.
pub fn write_checksum(path: &Path, checksum: &str) -> Result<(), DescriptorError> {
    let text = read_descriptor(path)?;
    let doc = parse(path, &text)?;
    let previous = checksum_of(path, &doc)?;

    let mut expected = doc;
    if let Some(slot) = md5_slot(&mut expected) {
        *slot = Value::String(checksum.to_string());
    }

    let rewritten = match rewrite_first_md5(&text, checksum) {
        Some(candidate) if parses_to(&candidate, &expected) => candidate,
        _ => {
            warn!(
                path = %path.display(),
                "could not rewrite descriptor in place, re-serializing"
            );
            serde_yaml::to_string(&expected).map_err(|e| malformed(path, e.to_string()))?
        }
    };

    persist::replace_file(path, rewritten.as_bytes()).map_err(|e| io_error(path, e))?;

    debug!(
        path = %path.display(),
        from = %previous,
        to = %checksum,
        "descriptor checksum rewritten"
    );
    Ok(())
}

fn read_descriptor(path: &Path) -> Result<String, DescriptorError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DescriptorError::Missing(path.to_path_buf()),
        _ => io_error(path, e),
    })
}

fn parse(path: &Path, text: &str) -> Result<Value, DescriptorError> {
    serde_yaml::from_str(text).map_err(|e| malformed(path, e.to_string()))
}

fn checksum_of(path: &Path, doc: &Value) -> Result<String, DescriptorError> {
    let first = doc
        .get("outs")
        .and_then(Value::as_sequence)
        .and_then(|outs| outs.first())
        .ok_or_else(|| malformed(path, "no `outs` entries".into()))?;

    match first.get("md5") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(malformed(path, "`md5` is not a scalar".into())),
        None => Err(malformed(path, "first output has no `md5` field".into())),
    }
}

fn md5_slot(doc: &mut Value) -> Option<&mut Value> {
    doc.get_mut("outs")?.get_mut(0)?.get_mut("md5")
}

fn parses_to(text: &str, expected: &Value) -> bool {
    serde_yaml::from_str::<Value>(text)
        .map(|v| &v == expected)
        .unwrap_or(false)
}

fn malformed(path: &Path, reason: String) -> DescriptorError {
    DescriptorError::Malformed {
        path: path.to_path_buf(),
        reason,
    }
}

fn io_error(path: &Path, source: std::io::Error) -> DescriptorError {
    DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_filler(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Rewrite the `md5:` value of the first item under a block-style
/// top-level `outs:` key. Returns `None` when the layout is not the plain
/// block form this understands.
fn rewrite_first_md5(text: &str, checksum: &str) -> Option<String> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();

    let outs_idx = lines.iter().position(|line| {
        let body = line.trim_end_matches(['\n', '\r']);
        body.strip_prefix("outs:")
            .map(is_filler)
            .unwrap_or(false)
    })?;

    let mut idx = outs_idx + 1;
    while idx < lines.len() && is_filler(lines[idx]) {
        idx += 1;
    }
    let item_line = *lines.get(idx)?;
    let dash_col = indent_of(item_line);
    let after_dash = item_line[dash_col..].strip_prefix('-')?;
    let key_col = dash_col + 1 + indent_of(after_dash);

    let target = if item_line[key_col..].starts_with("md5:") {
        idx
    } else {
        let mut found = None;
        for (offset, line) in lines[idx + 1..].iter().enumerate() {
            if is_filler(line) {
                continue;
            }
            let indent = indent_of(line);
            if indent <= dash_col {
                break;
            }
            if indent == key_col && line[key_col..].starts_with("md5:") {
                found = Some(idx + 1 + offset);
                break;
            }
        }
        found?
    };

    let line = lines[target];
    let value_start = key_col + "md5:".len();
    let (head, rest) = line.split_at(value_start);
    let body = rest.trim_end_matches(['\n', '\r']);
    let ending = &rest[body.len()..];
    let spacing = &body[..body.len() - body.trim_start().len()];
    let value_and_comment = body.trim_start();
    let value_len = value_and_comment
        .find(" #")
        .map(|at| value_and_comment[..at].trim_end().len())
        .unwrap_or_else(|| value_and_comment.trim_end().len());
    let trailer = &value_and_comment[value_len..];
    let spacing = if spacing.is_empty() { " " } else { spacing };

    let mut out = String::with_capacity(text.len() + checksum.len());
    for line in &lines[..target] {
        out.push_str(line);
    }
    out.push_str(head);
    out.push_str(spacing);
    out.push_str(checksum);
    out.push_str(trailer);
    out.push_str(ending);
    for line in &lines[target + 1..] {
        out.push_str(line);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = "\
# managed by the data tool
outs:
- md5: a304afb96060aad90176268345e10355.dir
  size: 1024
  nfiles: 3
  hash: md5
  path: m1
- md5: ffffffffffffffffffffffffffffffff
  path: other
meta:
  owner: team-data
";

    fn write_descriptor(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m1.dvc");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn reads_first_output_checksum() {
        let (_dir, path) = write_descriptor(DESCRIPTOR);
        assert_eq!(
            read_checksum(&path).unwrap(),
            "a304afb96060aad90176268345e10355.dir"
        );
    }

    #[test]
    fn missing_descriptor_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_checksum(&dir.path().join("nope.dvc")).unwrap_err();
        assert!(matches!(err, DescriptorError::Missing(_)));
    }

    #[test]
    fn malformed_descriptors_are_rejected() {
        for contents in [
            "outs: [unclosed",
            "path: m1\n",
            "outs: []\n",
            "outs:\n- path: m1\n",
            "outs:\n- md5: [a, b]\n",
            "- md5: abc\n",
        ] {
            let (_dir, path) = write_descriptor(contents);
            let err = read_checksum(&path).unwrap_err();
            assert!(
                matches!(err, DescriptorError::Malformed { .. }),
                "{contents:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn numeric_checksum_is_read_as_text() {
        let (_dir, path) = write_descriptor("outs:\n- md5: 123456\n");
        assert_eq!(read_checksum(&path).unwrap(), "123456");
    }

    #[test]
    fn rewrite_touches_only_the_first_checksum() {
        let (_dir, path) = write_descriptor(DESCRIPTOR);

        write_checksum(&path, "0123456789abcdef0123456789abcdef").unwrap();

        let expected = DESCRIPTOR.replace(
            "a304afb96060aad90176268345e10355.dir",
            "0123456789abcdef0123456789abcdef",
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), expected);
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn rewrite_finds_checksum_after_other_keys() {
        let original = "outs:\n  - path: m1\n    md5: old  # pinned\n    size: 7\n";
        let (_dir, path) = write_descriptor(original);

        write_checksum(&path, "new").unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "outs:\n  - path: m1\n    md5: new  # pinned\n    size: 7\n"
        );
    }

    #[test]
    fn flow_style_falls_back_to_reserialization() {
        let (_dir, path) = write_descriptor("outs: [{md5: old, path: m1, size: 3}]\n");

        write_checksum(&path, "new").unwrap();

        let doc: Value = serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["outs"][0]["md5"], Value::String("new".into()));
        assert_eq!(doc["outs"][0]["path"], Value::String("m1".into()));
        assert_eq!(doc["outs"][0]["size"].as_u64(), Some(3));
    }

    #[test]
    fn rewrite_of_malformed_descriptor_leaves_file_alone() {
        let (_dir, path) = write_descriptor("outs:\n- path: m1\n");

        let err = write_checksum(&path, "new").unwrap_err();

        assert!(matches!(err, DescriptorError::Malformed { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "outs:\n- path: m1\n");
    }

    #[test]
    fn rewrite_of_missing_descriptor_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m1.dvc");
        let err = write_checksum(&path, "abc").unwrap_err();
        assert!(matches!(err, DescriptorError::Missing(_)));
        assert!(!path.exists());
    }

    #[test]
    fn rewrite_keeps_similarly_named_user_files() {
        let (dir, path) = write_descriptor(DESCRIPTOR);
        let notes = dir.path().join("m1.tmp");
        fs::write(&notes, "user notes").unwrap();

        write_checksum(&path, "0123456789abcdef0123456789abcdef").unwrap();

        assert_eq!(fs::read_to_string(&notes).unwrap(), "user notes");
    }
}
