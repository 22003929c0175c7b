//! In-memory single-node cluster for engine tests
//!
//! `FakeNode` answers the queries the engine issues with cqlsh-shaped text,
//! executes DDL and drops, and keeps the data directory on disk in step with
//! its schema the way the database does: one `<table>-<id>` directory per
//! table, snapshots under `<table dir>/snapshots/<title>/`.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use cassnap_core::collaborators::{
    BulkLoader, CqlClient, JobParams, RemoteExecutor, ServiceControl, SnapshotTool,
};
use cassnap_core::errors::{ExError, ExErrorKind, Result};
use cassnap_core::parse::parse_archive_schema;
use cassnap_core::{KeyspaceName, OperatorPrompt, TableName};
use cassnap_engine::NodeContext;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

pub const HOST: &str = "127.0.0.1";

#[derive(Debug, Default)]
struct Schema {
    keyspaces: BTreeMap<String, BTreeMap<String, Uuid>>,
}

pub struct FakeNode {
    pub data_dir: PathBuf,
    schema: RefCell<Schema>,
    pub queries: RefCell<Vec<String>>,
    pub reachable: Cell<bool>,
    /// Statement prefix that makes `query` fail
    pub fail_on: RefCell<Option<String>>,
    pub snapshot_calls: RefCell<Vec<(String, Vec<String>, Option<String>)>>,
    pub clear_calls: Cell<usize>,
}

impl FakeNode {
    pub fn new(data_dir: &Path) -> Self {
        let node = Self {
            data_dir: data_dir.to_path_buf(),
            schema: RefCell::new(Schema::default()),
            queries: RefCell::new(Vec::new()),
            reachable: Cell::new(true),
            fail_on: RefCell::new(None),
            snapshot_calls: RefCell::new(Vec::new()),
            clear_calls: Cell::new(0),
        };
        node.create_keyspace("system");
        node.create_table("system", "local");
        node.create_keyspace("system_schema");
        node.create_table("system_schema", "tables");
        for ks in ["system_auth", "system_distributed", "system_traces"] {
            node.create_keyspace(ks);
        }
        node
    }

    pub fn create_keyspace(&self, keyspace: &str) {
        self.schema
            .borrow_mut()
            .keyspaces
            .entry(keyspace.to_string())
            .or_default();
        fs::create_dir_all(self.data_dir.join(keyspace)).unwrap();
    }

    /// Create a table with one SSTable on disk; returns its directory
    pub fn create_table(&self, keyspace: &str, table: &str) -> PathBuf {
        self.create_keyspace(keyspace);
        let id = Uuid::new_v4();
        self.schema
            .borrow_mut()
            .keyspaces
            .get_mut(keyspace)
            .unwrap()
            .insert(table.to_string(), id);
        let dir = self.table_dir(keyspace, table).unwrap();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("nb-1-big-Data.db"), format!("{}.{}", keyspace, table)).unwrap();
        dir
    }

    pub fn table_dir(&self, keyspace: &str, table: &str) -> Option<PathBuf> {
        let schema = self.schema.borrow();
        let id = schema.keyspaces.get(keyspace)?.get(table)?;
        Some(
            self.data_dir
                .join(keyspace)
                .join(format!("{}-{}", table, id.simple())),
        )
    }

    pub fn user_keyspaces(&self) -> Vec<String> {
        self.schema
            .borrow()
            .keyspaces
            .keys()
            .filter(|k| !k.starts_with("system"))
            .cloned()
            .collect()
    }

    pub fn tables(&self, keyspace: &str) -> Vec<String> {
        self.schema
            .borrow()
            .keyspaces
            .get(keyspace)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn queries_starting_with(&self, prefix: &str) -> Vec<String> {
        self.queries
            .borrow()
            .iter()
            .filter(|q| q.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn keyspace_ddl(&self, keyspace: &str) -> Option<String> {
        let schema = self.schema.borrow();
        let tables = schema.keyspaces.get(keyspace)?;
        let mut ddl = format!(
            "CREATE KEYSPACE {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': '1'}}  AND durable_writes = true;\n",
            keyspace
        );
        for table in tables.keys() {
            ddl.push_str(&format!(
                "\nCREATE TABLE {}.{} (\n    id uuid PRIMARY KEY,\n    value text\n) WITH comment = '';\n",
                keyspace, table
            ));
        }
        Some(ddl)
    }

    fn table_listing(&self, keyspace: &str) -> String {
        let schema = self.schema.borrow();
        let mut out = String::from("\n table_name | id\n------------+--------------------------------------\n");
        let tables = schema.keyspaces.get(keyspace).cloned().unwrap_or_default();
        for (table, id) in &tables {
            out.push_str(&format!(" {:>10} | {}\n", table, id.hyphenated()));
        }
        out.push_str(&format!("\n({} rows)\n", tables.len()));
        out
    }

    fn drop_keyspace(&self, keyspace: &str) -> Result<()> {
        if self.schema.borrow_mut().keyspaces.remove(keyspace).is_none() {
            return Err(ExError::new(ExErrorKind::Internal)
                .with_message(format!("Keyspace '{}' doesn't exist", keyspace)));
        }
        // The database keeps dropped data on disk until it is cleaned up.
        Ok(())
    }

    /// Apply DDL statement by statement; a repeated CREATE without
    /// IF NOT EXISTS fails with AlreadyExists like the server does
    fn execute_ddl(&self, ddl: &str) -> Result<()> {
        for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let guarded = statement.to_ascii_uppercase().contains("IF NOT EXISTS");
            let parsed = parse_archive_schema(statement)?;
            for (keyspace, tables) in parsed.keyspaces() {
                let keyspace = keyspace.as_str();
                let is_keyspace_statement = tables.is_empty();
                if is_keyspace_statement {
                    if self.schema.borrow().keyspaces.contains_key(keyspace) && !guarded {
                        return Err(already_exists(&format!("Keyspace {}", keyspace)));
                    }
                    self.create_keyspace(keyspace);
                    continue;
                }
                if !self.schema.borrow().keyspaces.contains_key(keyspace) {
                    return Err(ExError::new(ExErrorKind::Internal)
                        .with_message(format!("Keyspace '{}' does not exist", keyspace)));
                }
                for table in tables {
                    if self.table_dir(keyspace, table.as_str()).is_some() {
                        if guarded {
                            continue;
                        }
                        return Err(already_exists(&format!("Table {}.{}", keyspace, table)));
                    }
                    let id = Uuid::new_v4();
                    self.schema
                        .borrow_mut()
                        .keyspaces
                        .get_mut(keyspace)
                        .unwrap()
                        .insert(table.to_string(), id);
                    fs::create_dir_all(self.table_dir(keyspace, table.as_str()).unwrap()).unwrap();
                }
            }
        }
        Ok(())
    }
}

fn already_exists(what: &str) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_message(format!("AlreadyExists: {} already exists", what))
}

fn statement_arg<'a>(cql: &'a str, prefix: &str) -> Option<&'a str> {
    cql.strip_prefix(prefix)
        .map(|rest| {
            rest.trim_end_matches(';')
                .trim()
                .trim_matches(|c| c == '\'' || c == '"')
        })
}

impl CqlClient for FakeNode {
    fn query(&self, host: &str, cql: &str) -> Result<String> {
        let cql = cql.trim();
        self.queries.borrow_mut().push(cql.to_string());

        if !self.reachable.get() {
            return Err(ExError::new(ExErrorKind::Connectivity)
                .with_subject(host)
                .with_message("Connection refused"));
        }
        if let Some(prefix) = self.fail_on.borrow().as_deref() {
            if cql.starts_with(prefix) {
                return Err(ExError::new(ExErrorKind::Internal)
                    .with_message(format!("injected failure for '{}'", prefix)));
            }
        }

        if cql == "DESCRIBE KEYSPACES;" {
            let names: Vec<String> = self.schema.borrow().keyspaces.keys().cloned().collect();
            return Ok(format!("\n{}\n\n", names.join("  ")));
        }
        if cql.starts_with("SELECT release_version") {
            return Ok("\n release_version\n-----------------\n           4.1.3\n\n(1 rows)\n".into());
        }
        if let Some(rest) = cql.strip_prefix("SELECT table_name, id FROM system_schema.tables WHERE keyspace_name=") {
            let keyspace = rest.trim_end_matches(';').trim_matches('\'');
            return Ok(self.table_listing(keyspace));
        }
        if cql == "DESCRIBE SCHEMA;" {
            return Ok(self
                .user_keyspaces()
                .iter()
                .filter_map(|k| self.keyspace_ddl(k))
                .collect::<Vec<_>>()
                .join("\n"));
        }
        if let Some(keyspace) = statement_arg(cql, "DESCRIBE KEYSPACE ") {
            return self.keyspace_ddl(keyspace).ok_or_else(|| {
                ExError::new(ExErrorKind::Internal)
                    .with_message(format!("'{}' not found in keyspaces", keyspace))
            });
        }
        if let Some(keyspace) = statement_arg(cql, "DROP KEYSPACE ") {
            self.drop_keyspace(keyspace)?;
            return Ok(String::new());
        }
        self.execute_ddl(cql)?;
        Ok(String::new())
    }
}

impl SnapshotTool for FakeNode {
    fn clear_snapshots(&self) -> Result<()> {
        self.clear_calls.set(self.clear_calls.get() + 1);
        for keyspace in self.schema.borrow().keyspaces.keys() {
            let ks_dir = self.data_dir.join(keyspace);
            let Ok(entries) = fs::read_dir(&ks_dir) else { continue };
            for entry in entries.flatten() {
                let snapshots = entry.path().join("snapshots");
                if snapshots.is_dir() {
                    fs::remove_dir_all(&snapshots).unwrap();
                }
            }
        }
        Ok(())
    }

    fn snapshot(&self, title: &str, keyspaces: &[KeyspaceName], table: Option<&TableName>) -> Result<()> {
        self.snapshot_calls.borrow_mut().push((
            title.to_string(),
            keyspaces.iter().map(|k| k.to_string()).collect(),
            table.map(|t| t.to_string()),
        ));
        for keyspace in keyspaces {
            let tables = match table {
                Some(t) => vec![t.to_string()],
                None => self.tables(keyspace.as_str()),
            };
            for t in tables {
                let dir = self.table_dir(keyspace.as_str(), &t).unwrap();
                let snap = dir.join("snapshots").join(title);
                fs::create_dir_all(&snap).unwrap();
                for entry in fs::read_dir(&dir).unwrap().flatten() {
                    if entry.file_type().unwrap().is_file() {
                        fs::copy(entry.path(), snap.join(entry.file_name())).unwrap();
                    }
                }
            }
        }
        Ok(())
    }

    fn ring(&self) -> Result<String> {
        Ok("Datacenter: datacenter1\n127.0.0.1  rack1  Up  Normal  100 KiB  100.0%  -9223372036854775808\n".into())
    }
}

/// Records every load; statuses are looked up by `<ks>/<table>`
#[derive(Default)]
pub struct RecordingLoader {
    pub calls: RefCell<Vec<(Vec<String>, PathBuf)>>,
    pub failing: RefCell<Vec<String>>,
}

impl BulkLoader for RecordingLoader {
    fn load(&self, hosts: &[String], source_dir: &Path) -> Result<i32> {
        self.calls
            .borrow_mut()
            .push((hosts.to_vec(), source_dir.to_path_buf()));
        let mut parts = source_dir.iter().rev().take(2).map(|p| p.to_string_lossy().into_owned());
        let table = parts.next().unwrap_or_default();
        let keyspace = parts.next().unwrap_or_default();
        let key = format!("{}/{}", keyspace, table);
        Ok(if self.failing.borrow().contains(&key) { 1 } else { 0 })
    }
}

pub struct FakeExecutor {
    pub status: i32,
    pub runs: RefCell<Vec<(String, JobParams)>>,
    /// Files written into the job's `path` parameter, as the snapshot job
    /// would after fetching from nodes
    pub fetched: Vec<(String, Vec<u8>)>,
}

impl FakeExecutor {
    pub fn with_status(status: i32) -> Self {
        Self {
            status,
            runs: RefCell::new(Vec::new()),
            fetched: Vec::new(),
        }
    }
}

impl RemoteExecutor for FakeExecutor {
    fn run(&self, job: &str, params: &JobParams) -> Result<i32> {
        self.runs.borrow_mut().push((job.to_string(), params.clone()));
        if let Some(cassnap_core::collaborators::JobParam::Text(path)) = params.get("path") {
            if job == "snapshot" {
                for (name, bytes) in &self.fetched {
                    let out = Path::new(path).join(name);
                    fs::create_dir_all(out.parent().unwrap()).unwrap();
                    fs::write(out, bytes).unwrap();
                }
            }
        }
        Ok(self.status)
    }
}

#[derive(Default)]
pub struct FakeService {
    pub actions: RefCell<Vec<&'static str>>,
}

impl ServiceControl for FakeService {
    fn stop(&self) -> Result<()> {
        self.actions.borrow_mut().push("stop");
        Ok(())
    }

    fn start(&self) -> Result<()> {
        self.actions.borrow_mut().push("start");
        Ok(())
    }
}

/// A node with `app {t1, t2}` and `audit {events}`
pub fn populated(temp: &TempDir) -> FakeNode {
    let node = FakeNode::new(&temp.path().join("data"));
    node.create_table("app", "t1");
    node.create_table("app", "t2");
    node.create_table("audit", "events");
    node
}

pub fn context<'a>(node: &'a FakeNode, prompt: &'a dyn OperatorPrompt) -> NodeContext<'a> {
    NodeContext {
        host: HOST.to_string(),
        data_dir: node.data_dir.clone(),
        cql: node,
        snapshots: node,
        prompt,
    }
}

/// Sorted member names of a zip
pub fn zip_members(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    names
}

pub fn ks(name: &str) -> KeyspaceName {
    KeyspaceName::new(name).unwrap()
}

pub fn tb(name: &str) -> TableName {
    TableName::new(name).unwrap()
}

/// Build `<temp>/archives/<title>.zip` from `node` with the given keyspace filter
pub fn build_archive(node: &FakeNode, temp: &TempDir, keyspaces: &[&str], title: &str) -> PathBuf {
    use cassnap_core::{AssumeYes, ScopeRequest};
    use cassnap_engine::commands::snapshot::{snapshot, SnapshotRequest};

    let ctx = context(node, &AssumeYes);
    let request = SnapshotRequest {
        scope: ScopeRequest::from_raw(
            &keyspaces.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
            &[],
        )
        .unwrap(),
        title: Some(title.to_string()),
        destination: temp.path().join("archives"),
        overwrite: false,
        include_ring: false,
    };
    snapshot(&ctx, &temp.path().join("scratch"), &request)
        .unwrap()
        .archive
}

/// Read one member of a zip as text
pub fn zip_text(path: &Path, member: &str) -> String {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut text = String::new();
    archive
        .by_name(member)
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    text
}
