//! Atomic write and publish primitives
//!
//! Uses the temp→rename pattern so a reader never sees a partial file.
//! Finished archives are written next to their destination as
//! `.<title>.zip.partial` and renamed into place in one step.

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file
///
/// Uses temp file + rename to ensure atomic write
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create_parent_dir", parent, e))?;
    }

    let temp_path = target_path.with_extension("tmp");
    fs::write(&temp_path, content).map_err(|e| io_error("write_temp", &temp_path, e))?;
    fs::rename(&temp_path, target_path).map_err(|e| io_error("rename_temp", target_path, e))?;

    Ok(())
}

/// Final location of an archive
pub fn archive_path(dest_dir: &Path, title: &str) -> PathBuf {
    dest_dir.join(format!("{}.zip", title))
}

/// Where an archive is assembled before publishing
pub fn partial_path(dest_dir: &Path, title: &str) -> PathBuf {
    dest_dir.join(format!(".{}.zip.partial", title))
}

/// A file being assembled; removed on drop unless published
#[derive(Debug)]
pub struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename into `target`, replacing any file already there
    pub fn publish(mut self, target: &Path) -> Result<()> {
        fs::rename(&self.path, target).map_err(|e| io_error("publish_archive", target, e))?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial file");
            }
        }
    }
}
