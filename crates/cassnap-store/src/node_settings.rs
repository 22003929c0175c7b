//! Node settings from `cassandra.yaml`
//!
//! Only the handful of keys this tool needs are read; everything else in
//! the file is ignored.

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, settings_error, Result};
use cassnap_core::errors::{ExError, ExErrorKind};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Where package installs put `cassandra.yaml`, searched in order
pub const YAML_LOCATIONS: [&str; 3] = [
    "/etc/cassandra/conf/cassandra.yaml",
    "/etc/cassandra/cassandra.yaml",
    "/etc/dse/cassandra/cassandra.yaml",
];

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSettings {
    #[serde(default)]
    pub data_file_directories: Vec<PathBuf>,
    #[serde(default)]
    pub rpc_address: Option<String>,
    #[serde(default)]
    pub commitlog_directory: Option<PathBuf>,
    #[serde(default)]
    pub saved_caches_directory: Option<PathBuf>,
    #[serde(skip)]
    source: PathBuf,
}

impl NodeSettings {
    /// Read `override_path`, or the first standard location that exists
    pub fn discover(override_path: Option<&Path>) -> Result<Self> {
        match override_path {
            Some(path) => Self::from_file(path),
            None => {
                let found = YAML_LOCATIONS
                    .iter()
                    .map(Path::new)
                    .find(|p| p.is_file())
                    .ok_or_else(|| {
                        ExError::new(ExErrorKind::NotFound)
                            .with_op("node_settings")
                            .with_message(format!(
                                "cassandra.yaml not found in {}; set node.cassandra_yaml",
                                YAML_LOCATIONS.join(", ")
                            ))
                    })?;
                Self::from_file(found)
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| io_error("node_settings", path, e))?;
        let mut settings = Self::from_yaml_str(&text).map_err(|e| e.with_subject(path.display().to_string()))?;
        settings.source = path.to_path_buf();
        Ok(settings)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| {
            settings_error(Path::new("cassandra.yaml"), format!("Invalid cassandra.yaml: {}", e))
        })
    }

    /// First data directory; the only one this tool manages
    pub fn data_dir(&self) -> Result<&Path> {
        self.data_file_directories
            .first()
            .map(PathBuf::as_path)
            .ok_or_else(|| settings_error(&self.source, "data_file_directories is not set"))
    }

    /// Address cqlsh should connect to
    pub fn rpc_address(&self) -> &str {
        self.rpc_address.as_deref().unwrap_or("localhost")
    }

    /// Directories wiped by a hard reset: commitlog, saved caches, data
    pub fn state_directories(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        dirs.extend(self.commitlog_directory.clone());
        dirs.extend(self.saved_caches_directory.clone());
        dirs.extend(self.data_file_directories.first().cloned());
        dirs
    }
}
