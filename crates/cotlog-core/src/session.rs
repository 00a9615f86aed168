//! Caller-owned selection of the log files a pass should work on.

use crate::error::{CotLogError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// The files chosen for processing.
///
/// A session is created from a user-supplied path and handed to each pass
/// explicitly. Passes that produce a new log (dedup, time shift) select
/// their output so the next pass picks it up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    selected: Vec<PathBuf>,
}

impl Session {
    /// Loads a single file, or every regular file beneath a folder.
    ///
    /// Surrounding double quotes (as pasted from a file manager) are ignored.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = normalize_path(path.as_ref());

        if path.is_file() {
            info!("Loaded file: {}", path.display());
            return Ok(Self {
                selected: vec![path],
            });
        }

        if path.is_dir() {
            let mut selected = Vec::new();
            for entry in WalkDir::new(&path).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    CotLogError::Io(e.into_io_error().unwrap_or_else(|| {
                        std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")
                    }))
                })?;
                if entry.file_type().is_file() {
                    debug!("Selected {}", entry.path().display());
                    selected.push(entry.into_path());
                }
            }
            info!("Loaded folder: {} ({} files)", path.display(), selected.len());
            return Ok(Self { selected });
        }

        Err(CotLogError::not_a_file(path))
    }

    /// Replaces the selection with a single file.
    pub fn select(&mut self, path: impl Into<PathBuf>) {
        self.selected = vec![path.into()];
    }

    /// The file single-file passes operate on.
    pub fn primary(&self) -> Option<&Path> {
        self.selected.first().map(PathBuf::as_path)
    }

    /// All selected files, in walk order.
    pub fn files(&self) -> &[PathBuf] {
        &self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(s.trim().trim_matches('"')),
        None => path.to_path_buf(),
    }
}

/// Fails with `NotAFile` unless `path` is a regular file.
pub fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CotLogError::not_a_file(path))
    }
}
