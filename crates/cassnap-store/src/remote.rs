//! Remote archive naming and selection
//!
//! Archives live in a flat object store under keys of the form
//! `cassandra-snapshot-<title>`. Keys without the prefix are someone
//! else's objects and are never listed or offered.

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, Result};
use cassnap_core::collaborators::ObjectStore;
use cassnap_core::errors::{ExError, ExErrorKind, SnapError};
use cassnap_core::OperatorPrompt;
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of every archive key
pub const REMOTE_PREFIX: &str = "cassandra-snapshot-";

/// Archive view over an object store
pub struct RemoteStore<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> RemoteStore<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Key an archive titled `title` is uploaded under
    pub fn key_for(title: &str) -> String {
        format!("{}{}", REMOTE_PREFIX, title)
    }

    /// Accept either a full key or a bare title
    pub fn normalize_key(input: &str) -> String {
        if input.starts_with(REMOTE_PREFIX) {
            input.to_string()
        } else {
            Self::key_for(input)
        }
    }

    fn is_archive_key(key: &str) -> bool {
        key.len() > REMOTE_PREFIX.len()
            && key.starts_with(REMOTE_PREFIX)
            && !key.chars().any(char::is_whitespace)
    }

    /// Archive keys in the store, sorted
    pub fn list_archives(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .store
            .list()?
            .into_iter()
            .filter(|k| Self::is_archive_key(k))
            .collect();
        keys.sort();
        Ok(keys)
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.list_archives()?.iter().any(|k| k == key))
    }

    /// Normalize `key_or_title` and check that it is listed
    pub fn require(&self, key_or_title: &str) -> Result<String> {
        let key = Self::normalize_key(key_or_title);
        if self.exists(&key)? {
            Ok(key)
        } else {
            Err(SnapError::RemoteKeyNotFound { key }.into())
        }
    }

    /// Offer the listed archives by title; `None` if there are none or the
    /// operator backed out
    pub fn select(&self, prompt: &dyn OperatorPrompt) -> Result<Option<String>> {
        let keys = self.list_archives()?;
        if keys.is_empty() {
            tracing::info!("No remote archives found");
            return Ok(None);
        }
        let titles: Vec<String> = keys
            .iter()
            .map(|k| k[REMOTE_PREFIX.len()..].to_string())
            .collect();
        Ok(prompt
            .choose("Select a snapshot", &titles)?
            .and_then(|i| keys.get(i).cloned()))
    }

    pub fn upload(&self, key: &str, source: &Path) -> Result<()> {
        tracing::info!(key = key, source = %source.display(), "Uploading archive");
        self.store.put(key, source)
    }

    pub fn download(&self, key: &str, destination: &Path) -> Result<()> {
        tracing::info!(key = key, destination = %destination.display(), "Downloading archive");
        self.store.get(key, destination)
    }
}

/// Object store backed by a local (or mounted) directory
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let single = Path::new(key).components().count() == 1
            && !key.contains('/')
            && key != "."
            && key != "..";
        if key.is_empty() || !single {
            return Err(ExError::new(ExErrorKind::Validation)
                .with_op("object_path")
                .with_subject(key)
                .with_message("Object keys must be a single path component"));
        }
        Ok(self.root.join(key))
    }
}

impl ObjectStore for DirectoryObjectStore {
    fn put(&self, key: &str, source: &Path) -> Result<()> {
        let target = self.object_path(key)?;
        fs::create_dir_all(&self.root).map_err(|e| io_error("object_put", &self.root, e))?;
        fs::copy(source, &target).map_err(|e| io_error("object_put", &target, e))?;
        Ok(())
    }

    fn get(&self, key: &str, destination: &Path) -> Result<()> {
        let source = self.object_path(key)?;
        if !source.is_file() {
            return Err(SnapError::RemoteKeyNotFound {
                key: key.to_string(),
            }
            .into());
        }
        fs::copy(&source, destination).map_err(|e| io_error("object_get", destination, e))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|e| io_error("object_list", &self.root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_error("object_list", &self.root, e))?;
            if let Ok(name) = entry.file_name().into_string() {
                keys.push(name);
            }
        }
        Ok(keys)
    }
}
