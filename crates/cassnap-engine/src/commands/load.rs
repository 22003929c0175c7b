//! Archive loading
//!
//! An archive is always unpacked into a freshly cleared workspace before
//! anything reads it. Its schema comes from the DDL in `schema.cql`, never
//! from the payload directory names.

#![allow(clippy::result_large_err)]

use super::snapshot::discard_quietly;
use cassnap_core::errors::{ExError, ExErrorKind, Result, SnapError};
use cassnap_core::model::MANIFEST_FORMAT_VERSION;
use cassnap_core::parse::parse_archive_schema;
use cassnap_core::{log_op_end, log_op_error, log_op_start};
use cassnap_core::{ArchiveManifest, ArchiveSchema, KeyspaceName, OperatorPrompt, TableName};
use cassnap_store::archive::{
    extract_archive, extract_schemas, keyspace_schema_member, read_manifest,
    table_payload_member, verify_digests, SCHEMAS_DIR, SCHEMA_FILE,
};
use cassnap_store::errors::{archive_error, io_error};
use cassnap_store::{RemoteStore, Workspace};
use std::fs;
use std::path::{Path, PathBuf};

/// Where an archive comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    Local(PathBuf),
    /// Full key or bare title
    Remote(String),
    /// Pick from the remote listing
    RemoteInteractive,
}

impl ArchiveSource {
    /// Build from CLI arguments; `remote` is `Some(None)` when the flag was
    /// given without a key
    pub fn from_args(path: Option<PathBuf>, remote: Option<Option<String>>) -> Result<Self> {
        match (path, remote) {
            (Some(_), Some(_)) => Err(SnapError::ArchiveSource {
                reason: "both a local path and a remote key were given".to_string(),
            }
            .into()),
            (None, None) => Err(SnapError::ArchiveSource {
                reason: "neither a local path nor a remote key was given".to_string(),
            }
            .into()),
            (Some(path), None) => Ok(ArchiveSource::Local(path)),
            (None, Some(Some(key))) => Ok(ArchiveSource::Remote(key)),
            (None, Some(None)) => Ok(ArchiveSource::RemoteInteractive),
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, ArchiveSource::Local(_))
    }
}

/// An archive unpacked into a workspace
#[derive(Debug)]
pub struct LoadedArchive {
    workspace: Workspace,
    root: PathBuf,
    title: String,
    manifest: Option<ArchiveManifest>,
    schema: ArchiveSchema,
}

impl LoadedArchive {
    /// Keyspace → tables declared by the archived DDL
    pub fn archive_schema(&self) -> &ArchiveSchema {
        &self.schema
    }

    /// Directory the archive was extracted into
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn manifest(&self) -> Option<&ArchiveManifest> {
        self.manifest.as_ref()
    }

    pub fn full_ddl_path(&self) -> PathBuf {
        self.root.join(SCHEMA_FILE)
    }

    pub fn keyspace_ddl_path(&self, keyspace: &KeyspaceName) -> PathBuf {
        self.root
            .join(SCHEMAS_DIR)
            .join(keyspace_schema_member(keyspace.as_str()))
    }

    /// Recorded payload directory of a table, if the archive carries one
    pub fn payload_dir(&self, keyspace: &KeyspaceName, table: &TableName) -> Option<PathBuf> {
        let dir = self
            .root
            .join(table_payload_member(keyspace.as_str(), table.as_str()));
        dir.is_dir().then_some(dir)
    }

    /// Remove the workspace
    pub fn discard(self) -> Result<()> {
        self.workspace.discard()
    }
}

/// Fetch (if remote), unpack and check an archive
///
/// Returns `Ok(None)` when interactive selection found nothing or the
/// operator backed out.
///
/// # Errors
///
/// - `Validation` if a remote source is requested without a remote store
/// - `NotFound` for a missing local file or unlisted remote key
/// - `Serialization` for a corrupt archive, a digest mismatch, a member
///   escaping the workspace, or a missing `schema.cql`
pub fn load_archive(
    source: &ArchiveSource,
    remote: Option<&RemoteStore<'_>>,
    prompt: &dyn OperatorPrompt,
    scratch: &Path,
) -> Result<Option<LoadedArchive>> {
    log_op_start!("load_archive");
    let start = std::time::Instant::now();

    let loaded = load_archive_impl(source, remote, prompt, scratch).map_err(|e| {
        log_op_error!(
            "load_archive",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "load_archive",
        duration_ms = start.elapsed().as_millis() as u64,
        loaded = loaded.is_some()
    );
    Ok(loaded)
}

fn load_archive_impl(
    source: &ArchiveSource,
    remote: Option<&RemoteStore<'_>>,
    prompt: &dyn OperatorPrompt,
    scratch: &Path,
) -> Result<Option<LoadedArchive>> {
    let remote_store = || {
        remote.ok_or_else(|| {
            ExError::from(SnapError::ArchiveSource {
                reason: "a remote key was given but no remote store is configured".to_string(),
            })
        })
    };

    // Resolve the remote key before touching the workspace
    let key = match source {
        ArchiveSource::Local(path) => {
            if !path.is_file() {
                return Err(ExError::new(ExErrorKind::NotFound)
                    .with_op("load_archive")
                    .with_subject(path.display().to_string())
                    .with_message("Archive file not found"));
            }
            None
        }
        ArchiveSource::Remote(key) => Some(remote_store()?.require(key)?),
        ArchiveSource::RemoteInteractive => match remote_store()?.select(prompt)? {
            Some(key) => Some(key),
            None => return Ok(None),
        },
    };

    let workspace = Workspace::prepare(scratch)?;
    match unpack(source, key.as_deref(), remote, &workspace) {
        Ok((root, title, manifest, schema)) => Ok(Some(LoadedArchive {
            workspace,
            root,
            title,
            manifest,
            schema,
        })),
        Err(e) => {
            discard_quietly(workspace);
            Err(e)
        }
    }
}

type Unpacked = (PathBuf, String, Option<ArchiveManifest>, ArchiveSchema);

fn unpack(
    source: &ArchiveSource,
    key: Option<&str>,
    remote: Option<&RemoteStore<'_>>,
    workspace: &Workspace,
) -> Result<Unpacked> {
    let (zip_path, fallback_title) = match (source, key, remote) {
        (ArchiveSource::Local(path), _, _) => (
            path.clone(),
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ),
        (_, Some(key), Some(remote)) => {
            let download = workspace.member("download.zip")?;
            remote.download(key, &download)?;
            let title = key
                .strip_prefix(cassnap_store::REMOTE_PREFIX)
                .unwrap_or(key)
                .to_string();
            (download, title)
        }
        _ => {
            return Err(ExError::new(ExErrorKind::Internal)
                .with_op("load_archive")
                .with_message("remote source resolved without a key"))
        }
    };

    let root = workspace.child("archive")?.root().to_path_buf();
    let files = extract_archive(&zip_path, &root)?;
    extract_schemas(&root)?;
    tracing::debug!(archive = %zip_path.display(), files = files, "Archive extracted");

    let manifest = read_manifest(&root)?;
    if let Some(manifest) = &manifest {
        if manifest.format_version > MANIFEST_FORMAT_VERSION {
            return Err(archive_error(
                "load_archive",
                &zip_path,
                format!(
                    "archive format version {} is newer than supported version {}",
                    manifest.format_version, MANIFEST_FORMAT_VERSION
                ),
            ));
        }
        verify_digests(&root, manifest)?;
    } else {
        tracing::warn!(archive = %zip_path.display(), "Archive has no manifest; digests not verified");
    }

    let ddl_path = root.join(SCHEMA_FILE);
    if !ddl_path.is_file() {
        return Err(archive_error(
            "load_archive",
            &zip_path,
            format!("archive has no {}", SCHEMA_FILE),
        ));
    }
    let ddl = fs::read_to_string(&ddl_path).map_err(|e| io_error("load_archive", &ddl_path, e))?;
    let schema = parse_archive_schema(&ddl)?;

    let title = manifest
        .as_ref()
        .map(|m| m.title.clone())
        .unwrap_or(fallback_title);
    Ok((root, title, manifest, schema))
}
