//! Scratch workspaces
//!
//! Every run starts by wiping its workspace, so nothing from an earlier or
//! interrupted run can leak into a new archive or restore.

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, Result};
use cassnap_core::errors::{ExError, ExErrorKind};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A directory owned by one run
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create the directory if missing and empty it
    pub fn prepare(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| io_error("prepare_workspace", &root, e))?;
        clear_dir(&root)?;
        tracing::debug!(workspace = %root.display(), "Workspace prepared");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a member, creating its parent directories
    pub fn member(&self, relative: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("create_member_dir", parent, e))?;
        }
        Ok(path)
    }

    /// Prepare a nested workspace
    pub fn child(&self, name: &str) -> Result<Workspace> {
        Workspace::prepare(self.root.join(name))
    }

    /// Remove the workspace and everything in it
    pub fn discard(self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root).map_err(|e| io_error("discard_workspace", &self.root, e))?;
        }
        Ok(())
    }
}

/// Remove every entry of `dir`, keeping `dir` itself
pub fn clear_dir(dir: &Path) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| io_error("clear_dir", dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_error("clear_dir", dir, e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| io_error("clear_dir", &path, e))?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| io_error("clear_dir", &path, e))?;
        } else {
            fs::remove_file(&path).map_err(|e| io_error("clear_dir", &path, e))?;
        }
    }
    Ok(())
}

/// Copy the regular files and directories under `src` into `dst`
///
/// Returns the number of files copied. Symlinks are not followed.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<u64> {
    fs::create_dir_all(dst).map_err(|e| io_error("copy_tree", dst, e))?;

    let mut copied = 0;
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("copy_tree")
                .with_subject(src.display().to_string())
                .with_message(format!("walkdir error: {}", e))
        })?;
        let path = entry.path();
        let rel = path.strip_prefix(src).map_err(|e| {
            ExError::new(ExErrorKind::Internal)
                .with_op("copy_tree")
                .with_message(format!("strip_prefix failed: {}", e))
        })?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let out = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&out).map_err(|e| io_error("copy_tree", &out, e))?;
        } else if entry.file_type().is_file() {
            fs::copy(path, &out).map_err(|e| io_error("copy_tree", path, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}
