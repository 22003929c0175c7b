//! Packing a filled workspace into an archive

#![allow(clippy::result_large_err)]

use super::{member_name, MANIFEST_FILE};
use crate::atomic::atomic_write;
use crate::errors::{archive_error, from_zip, io_error, Result};
use cassnap_core::ArchiveManifest;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Regular files under `root` as (member name, path), sorted by name
fn members(root: &Path) -> Result<Vec<(String, std::path::PathBuf)>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| archive_error("list_members", root, e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| archive_error("list_members", root, e.to_string()))?;
        let name = member_name(rel).ok_or_else(|| {
            archive_error(
                "list_members",
                entry.path(),
                "file name is not representable as an archive member",
            )
        })?;
        out.push((name, entry.path().to_path_buf()));
    }
    Ok(out)
}

/// SHA-256 of a file as lowercase hex
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| io_error("hash_file", path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| io_error("hash_file", path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Record every member's digest in `manifest` and write `manifest.json`
pub fn seal_manifest(root: &Path, manifest: &mut ArchiveManifest) -> Result<()> {
    let mut digests = BTreeMap::new();
    for (name, path) in members(root)? {
        if name == MANIFEST_FILE {
            continue;
        }
        digests.insert(name, file_sha256(&path)?);
    }
    manifest.file_sha256 = digests;

    let json = serde_json::to_vec_pretty(manifest)
        .map_err(|e| archive_error("seal_manifest", root, e.to_string()))?;
    atomic_write(&root.join(MANIFEST_FILE), &json)
}

/// Compress every file under `root` into a new zip at `target`
///
/// Returns the number of members written.
pub fn pack_directory(root: &Path, target: &Path) -> Result<usize> {
    let file = File::create(target).map_err(|e| io_error("pack_archive", target, e))?;
    let mut zip = ZipWriter::new(file);

    let members = members(root)?;
    for (name, path) in &members {
        let size = fs::metadata(path)
            .map_err(|e| io_error("pack_archive", path, e))?
            .len();
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(size >= ZIP64_THRESHOLD);
        zip.start_file(name.as_str(), options)
            .map_err(|e| from_zip("pack_archive", target, e))?;
        let mut source = File::open(path).map_err(|e| io_error("pack_archive", path, e))?;
        io::copy(&mut source, &mut zip).map_err(|e| io_error("pack_archive", target, e))?;
    }

    zip.finish().map_err(|e| from_zip("pack_archive", target, e))?;
    Ok(members.len())
}

/// Build `schemas.zip` from a directory of `<ks>/<ks>_schema.cql` files
pub fn pack_schemas(schemas_dir: &Path, target: &Path) -> Result<usize> {
    pack_directory(schemas_dir, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn manifest() -> ArchiveManifest {
        ArchiveManifest::new("t", "localhost", &BTreeMap::new())
    }

    #[test]
    fn test_seal_records_every_member_but_manifest() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("app/t1")).unwrap();
        fs::write(temp.path().join("schema.cql"), b"CREATE KEYSPACE app;").unwrap();
        fs::write(temp.path().join("app/t1/a-Data.db"), b"rows").unwrap();

        let mut m = manifest();
        seal_manifest(temp.path(), &mut m).unwrap();

        let keys: Vec<&str> = m.file_sha256.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["app/t1/a-Data.db", "schema.cql"]);
        assert!(temp.path().join(MANIFEST_FILE).exists());
    }

    #[test]
    fn test_digest_of_known_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abc");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_pack_counts_members() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        fs::create_dir_all(root.join("ks/t")).unwrap();
        fs::write(root.join("schema.cql"), b"x").unwrap();
        fs::write(root.join("ks/t/f.db"), b"y").unwrap();

        let count = pack_directory(&root, &temp.path().join("out.zip")).unwrap();
        assert_eq!(count, 2);
    }
}
