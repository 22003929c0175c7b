//! Unpacking and checking an archive

#![allow(clippy::result_large_err)]

use super::writer::file_sha256;
use super::{member_name, MANIFEST_FILE, SCHEMAS_DIR, SCHEMAS_ZIP};
use crate::errors::{archive_error, from_zip, io_error, Result};
use cassnap_core::ArchiveManifest;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use zip::ZipArchive;

/// Extract every member of `archive` under `dest`
///
/// Members whose names would land outside `dest` are rejected before
/// anything is written for them. Returns the number of files extracted.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive).map_err(|e| io_error("extract_archive", archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| from_zip("extract_archive", archive, e))?;

    fs::create_dir_all(dest).map_err(|e| io_error("extract_archive", dest, e))?;

    let mut extracted = 0;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| from_zip("extract_archive", archive, e))?;
        let raw_name = entry.name().to_string();
        let name = member_name(Path::new(raw_name.trim_end_matches('/'))).ok_or_else(|| {
            archive_error(
                "extract_archive",
                archive,
                format!("member '{}' escapes the extraction directory", raw_name),
            )
        })?;
        let out = dest.join(&name);

        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| io_error("extract_archive", &out, e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("extract_archive", parent, e))?;
        }
        let mut target = File::create(&out).map_err(|e| io_error("extract_archive", &out, e))?;
        io::copy(&mut entry, &mut target).map_err(|e| io_error("extract_archive", &out, e))?;
        extracted += 1;
    }

    Ok(extracted)
}

/// Expand `<root>/schemas.zip` into `<root>/schemas/`
pub fn extract_schemas(root: &Path) -> Result<usize> {
    let nested = root.join(SCHEMAS_ZIP);
    if !nested.exists() {
        return Ok(0);
    }
    extract_archive(&nested, &root.join(SCHEMAS_DIR))
}

/// Load `<root>/manifest.json`, if the archive has one
pub fn read_manifest(root: &Path) -> Result<Option<ArchiveManifest>> {
    let path = root.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(&path).map_err(|e| io_error("read_manifest", &path, e))?;
    let manifest = serde_json::from_slice(&bytes)
        .map_err(|e| archive_error("read_manifest", &path, format!("Invalid manifest: {}", e)))?;
    Ok(Some(manifest))
}

/// Check every digest recorded in the manifest against the extracted files
pub fn verify_digests(root: &Path, manifest: &ArchiveManifest) -> Result<()> {
    for (name, expected) in &manifest.file_sha256 {
        let path = member_name(Path::new(name))
            .map(|n| root.join(n))
            .ok_or_else(|| {
                archive_error(
                    "verify_digests",
                    root,
                    format!("manifest entry '{}' escapes the archive", name),
                )
            })?;
        if !path.is_file() {
            return Err(archive_error(
                "verify_digests",
                &path,
                format!("member '{}' listed in manifest is missing", name),
            ));
        }
        let actual = file_sha256(&path)?;
        if &actual != expected {
            return Err(archive_error(
                "verify_digests",
                &path,
                format!(
                    "digest mismatch for '{}': expected {}, got {}",
                    name, expected, actual
                ),
            ));
        }
    }
    Ok(())
}
