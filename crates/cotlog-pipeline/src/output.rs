//! Artifact naming and atomic writes.
//!
//! Every artifact lands beside its source file (or in a caller-chosen
//! directory) and is written through a temporary file in the destination
//! directory, so a crash never leaves a partially written log behind.

use cotlog_core::{require_file, CotLogError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Prefix of deduplicated logs.
pub const DEDUP_PREFIX: &str = "NoDuplicates_";

/// Prefix of time-shifted logs.
pub const TIME_SHIFT_PREFIX: &str = "TimeAdjusted_";

/// Reads a whole source log after checking it is a regular file.
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    require_file(path)?;
    let content = fs::read(path)?;
    debug!("Read {} bytes from {}", content.len(), path.display());
    Ok(content)
}

/// Directory holding `path`, or the current directory for bare names.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `<dir>/<prefix><file name>`.
pub fn prefixed_sibling(source: &Path, prefix: &str) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| CotLogError::not_a_file(source))?
        .to_string_lossy();
    Ok(parent_dir(source).join(format!("{}{}", prefix, name)))
}

/// `<dir>/<stem>_Log<number>.txt`.
pub fn segment_path(source: &Path, number: usize) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .ok_or_else(|| CotLogError::not_a_file(source))?
        .to_string_lossy();
    Ok(parent_dir(source).join(format!("{}_Log{}.txt", stem, number)))
}

/// Writes `contents` to `path` via a temporary file and a rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(&dir)?;

    let mut file = NamedTempFile::new_in(&dir)?;
    file.write_all(contents)?;
    file.flush()?;
    file.persist(path).map_err(|e| CotLogError::Io(e.error))?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_names() {
        let source = Path::new("/logs/feed.2024.txt");
        assert_eq!(
            prefixed_sibling(source, DEDUP_PREFIX).unwrap(),
            PathBuf::from("/logs/NoDuplicates_feed.2024.txt")
        );
        assert_eq!(
            prefixed_sibling(source, TIME_SHIFT_PREFIX).unwrap(),
            PathBuf::from("/logs/TimeAdjusted_feed.2024.txt")
        );
        assert_eq!(
            segment_path(source, 3).unwrap(),
            PathBuf::from("/logs/feed.2024_Log3.txt")
        );
    }

    #[test]
    fn test_bare_name_resolves_to_current_dir() {
        assert_eq!(
            prefixed_sibling(Path::new("feed.txt"), DEDUP_PREFIX).unwrap(),
            PathBuf::from("./NoDuplicates_feed.txt")
        );
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_read_source_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_source(dir.path()).unwrap_err();
        assert!(matches!(err, CotLogError::NotAFile { .. }));
    }
}
