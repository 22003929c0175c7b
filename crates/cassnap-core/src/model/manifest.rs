//! Archive manifest
//!
//! Stored as `manifest.json` at the root of every archive.
//!
//! ## Fields
//!
//! - `format_version`: archive layout version (currently 1)
//! - `title`: snapshot title, also the archive file stem
//! - `created_at`: RFC3339 timestamp
//! - `origin_host`: host the snapshot was taken from
//! - `tables`: keyspace → tables whose payload was captured
//! - `ring_info`: whether `ring_info.txt` is present
//! - `file_sha256`: archive member path → SHA-256 hex digest

use crate::model::scope::ResolvedScope;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current archive layout version
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveManifest {
    pub format_version: u32,
    pub title: String,
    pub created_at: String,
    pub origin_host: String,
    pub tables: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub ring_info: bool,
    #[serde(default)]
    pub file_sha256: BTreeMap<String, String>,
}

impl ArchiveManifest {
    /// Manifest for a freshly captured scope, stamped with the current time
    pub fn new(title: &str, origin_host: &str, scope: &ResolvedScope) -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            title: title.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            origin_host: origin_host.to_string(),
            tables: scope
                .iter()
                .map(|(k, tables)| {
                    (
                        k.to_string(),
                        tables.iter().map(|t| t.to_string()).collect(),
                    )
                })
                .collect(),
            ring_info: false,
            file_sha256: BTreeMap::new(),
        }
    }
}
