//! Collaborators backed by external programs
//!
//! Each type wraps one tool: cqlsh, nodetool, sstableloader,
//! ansible-playbook, the aws CLI, the service manager and the terminal.
//! Output is returned raw; all parsing happens in `cassnap_core::parse`.

#![allow(clippy::result_large_err)]

use cassnap_core::collaborators::{
    BulkLoader, CqlClient, JobParams, ObjectStore, RemoteExecutor, ServiceControl, SnapshotTool,
};
use cassnap_core::config::RemoteConfig;
use cassnap_core::errors::{ExError, ExErrorKind, Result, SnapError};
use cassnap_core::{KeyspaceName, OperatorPrompt, TableName};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

fn spawn_error(program: &str, err: io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op("run_tool")
        .with_subject(program)
        .with_message(format!("failed to run {}: {}", program, err))
}

/// Run to completion with `input` on stdin
fn run_with_input(mut command: Command, program: &str, input: &str) -> Result<Output> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|e| spawn_error(program, e))?;
    }
    drop(child.stdin.take());

    child.wait_with_output().map_err(|e| spawn_error(program, e))
}

/// Run with inherited stdio; returns the exit status
fn run_status(mut command: Command, program: &str) -> Result<i32> {
    tracing::debug!(command = ?command, "Running");
    let status = command.status().map_err(|e| spawn_error(program, e))?;
    Ok(status.code().unwrap_or(-1))
}

/// Run capturing stdout; a non-zero status is an error
fn run_checked(mut command: Command, program: &str, job: &str) -> Result<String> {
    tracing::debug!(command = ?command, "Running");
    let output = command.output().map_err(|e| spawn_error(program, e))?;
    if !output.status.success() {
        tracing::warn!(
            job = job,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "Tool failed"
        );
        return Err(SnapError::JobFailed {
            job: job.to_string(),
            status: output.status.code().unwrap_or(-1),
        }
        .into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub struct Cqlsh {
    pub program: String,
}

impl CqlClient for Cqlsh {
    fn query(&self, host: &str, cql: &str) -> Result<String> {
        let mut command = Command::new(&self.program);
        command.arg(host);
        let output = run_with_input(command, &self.program, cql)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let reason = stderr.trim().to_string();
            if reason.contains("Unable to connect") || reason.contains("Connection refused") {
                return Err(SnapError::HostUnreachable {
                    host: host.to_string(),
                    reason,
                }
                .into());
            }
            return Err(ExError::new(ExErrorKind::Internal)
                .with_op("cql_query")
                .with_subject(host)
                .with_message(format!("cqlsh failed: {}", reason)));
        }
        // cqlsh reports statement errors on stderr with a zero status
        if stderr.contains("Error") {
            return Err(ExError::new(ExErrorKind::Internal)
                .with_op("cql_query")
                .with_subject(host)
                .with_message(stderr.trim().to_string()));
        }
        Ok(stdout)
    }
}

pub struct Nodetool {
    pub program: String,
}

impl Nodetool {
    fn command(&self) -> Command {
        Command::new(&self.program)
    }
}

impl SnapshotTool for Nodetool {
    fn clear_snapshots(&self) -> Result<()> {
        let mut command = self.command();
        command.args(["clearsnapshot", "--all"]);
        run_checked(command, &self.program, "nodetool clearsnapshot").map(|_| ())
    }

    fn snapshot(&self, title: &str, keyspaces: &[KeyspaceName], table: Option<&TableName>) -> Result<()> {
        let mut command = self.command();
        command.args(["snapshot", "-t", title]);
        if let Some(table) = table {
            command.args(["-cf", table.as_str()]);
        }
        command.args(keyspaces.iter().map(KeyspaceName::as_str));
        run_checked(command, &self.program, "nodetool snapshot").map(|_| ())
    }

    fn ring(&self) -> Result<String> {
        let mut command = self.command();
        command.arg("ring");
        run_checked(command, &self.program, "nodetool ring")
    }
}

pub struct SstableLoader {
    pub program: String,
}

impl BulkLoader for SstableLoader {
    fn load(&self, hosts: &[String], source_dir: &Path) -> Result<i32> {
        let mut command = Command::new(&self.program);
        command.arg("-d").arg(hosts.join(",")).arg(source_dir);
        run_status(command, &self.program)
    }
}

pub struct AnsiblePlaybook {
    pub playbook_dir: PathBuf,
}

impl RemoteExecutor for AnsiblePlaybook {
    fn run(&self, job: &str, params: &JobParams) -> Result<i32> {
        let extra_vars = serde_json::to_string(params).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("ansible_playbook")
                .with_subject(job)
                .with_message(e.to_string())
        })?;
        let mut command = Command::new("ansible-playbook");
        command
            .arg(self.playbook_dir.join(format!("{}.yml", job)))
            .arg("--extra-vars")
            .arg(extra_vars);
        run_status(command, "ansible-playbook")
    }
}

/// S3 bucket through the aws CLI
pub struct AwsS3 {
    remote: RemoteConfig,
}

impl AwsS3 {
    pub fn new(remote: RemoteConfig) -> Self {
        Self { remote }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.remote.aws_cli);
        command.arg("s3").args(["--region", &self.remote.region]);
        if let Some(key) = &self.remote.access_key {
            command.env("AWS_ACCESS_KEY_ID", key.expose());
        }
        if let Some(secret) = &self.remote.secret_key {
            command.env("AWS_SECRET_ACCESS_KEY", secret.expose());
        }
        command
    }

    fn url(&self, key: &str) -> String {
        format!("s3://{}/{}", self.remote.bucket, key)
    }
}

impl ObjectStore for AwsS3 {
    fn put(&self, key: &str, source: &Path) -> Result<()> {
        let mut command = self.command();
        command.arg("cp").arg(source).arg(self.url(key));
        run_checked(command, &self.remote.aws_cli, "aws s3 cp").map(|_| ())
    }

    fn get(&self, key: &str, destination: &Path) -> Result<()> {
        let mut command = self.command();
        command.arg("cp").arg(self.url(key)).arg(destination);
        run_checked(command, &self.remote.aws_cli, "aws s3 cp").map(|_| ())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut command = self.command();
        command.arg("ls").arg(format!("s3://{}/", self.remote.bucket));
        let listing = run_checked(command, &self.remote.aws_cli, "aws s3 ls")?;
        // "2024-01-01 12:00:00    1234 <key>"; prefixes are "PRE <name>/"
        Ok(listing
            .lines()
            .filter(|line| !line.trim_start().starts_with("PRE "))
            .filter_map(|line| line.split_whitespace().nth(3))
            .map(String::from)
            .collect())
    }
}

pub struct SystemService {
    pub name: String,
}

impl SystemService {
    fn run(&self, action: &str) -> Result<()> {
        let mut command = Command::new("sudo");
        command.args(["service", self.name.as_str(), action]);
        let job = format!("service {} {}", self.name, action);
        run_checked(command, "sudo", &job).map(|_| ())
    }
}

impl ServiceControl for SystemService {
    fn stop(&self) -> Result<()> {
        self.run("stop")
    }

    fn start(&self) -> Result<()> {
        self.run("start")
    }
}

/// Questions on stderr, answers from stdin
pub struct TerminalPrompt;

fn read_answer() -> Result<Option<String>> {
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line).map_err(|e| {
        ExError::new(ExErrorKind::Io)
            .with_op("prompt")
            .with_message(e.to_string())
    })?;
    Ok((read > 0).then(|| line.trim().to_string()))
}

impl OperatorPrompt for TerminalPrompt {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        loop {
            eprint!("{} [y/n] ", prompt);
            let Some(answer) = read_answer()? else {
                return Ok(false);
            };
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => continue,
            }
        }
    }

    fn choose(&self, prompt: &str, options: &[String]) -> Result<Option<usize>> {
        eprintln!("\nIndex | Snapshot");
        for (i, option) in options.iter().enumerate() {
            eprintln!("{:5} | {}", i + 1, option);
        }
        loop {
            eprint!("{} (1-{}, empty to cancel): ", prompt, options.len());
            let Some(answer) = read_answer()? else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => continue,
            }
        }
    }
}
