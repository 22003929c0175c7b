//! Command handlers
//!
//! Each submodule parses its arguments, wires process-backed collaborators
//! into an engine context and prints the outcome. All behavior lives in
//! `cassnap_engine::commands`.

use crate::process::{AwsS3, Cqlsh, Nodetool, TerminalPrompt};
use cassnap_core::{AssumeYes, Config, OperatorPrompt, Result as SnapResult, ScopeRequest};
use cassnap_engine::NodeContext;
use cassnap_store::NodeSettings;
use clap::Args;
use std::path::PathBuf;

pub mod clean;
pub mod install;
pub mod reset;
pub mod restore;
pub mod schema;
pub mod snapshot;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file; a missing file means defaults
    #[arg(long, global = true, default_value = "cassnap.toml")]
    pub config: PathBuf,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Correlation id for this run (generated when absent)
    #[arg(long, global = true)]
    pub run_id: Option<String>,
}

impl GlobalArgs {
    pub fn load_config(&self) -> SnapResult<Config> {
        Config::load(&self.config)
    }

    pub fn prompt(&self) -> Box<dyn OperatorPrompt> {
        if self.yes {
            Box::new(AssumeYes)
        } else {
            Box::new(TerminalPrompt)
        }
    }
}

/// `-k`/`-t` filter arguments shared by snapshot, restore and schema
#[derive(Debug, Args, Clone, Default)]
pub struct ScopeArgs {
    /// Keyspaces to include (all non-system keyspaces when omitted)
    #[arg(short = 'k', long = "keyspace", num_args = 1..)]
    pub keyspaces: Vec<String>,

    /// Tables to include; requires exactly one keyspace
    #[arg(short = 't', long = "table", num_args = 1..)]
    pub tables: Vec<String>,
}

impl ScopeArgs {
    /// Parse and shape-check
    pub fn to_request(&self) -> SnapResult<ScopeRequest> {
        let request = ScopeRequest::from_raw(&self.keyspaces, &self.tables)?;
        request.check_shape()?;
        Ok(request)
    }
}

/// Local node collaborators resolved from config and cassandra.yaml
pub struct NodeTools {
    pub host: String,
    pub data_dir: PathBuf,
    pub cql: Cqlsh,
    pub nodetool: Nodetool,
    pub prompt: Box<dyn OperatorPrompt>,
}

impl NodeTools {
    pub fn discover(config: &Config, global: &GlobalArgs) -> SnapResult<Self> {
        let settings = NodeSettings::discover(config.node.cassandra_yaml.as_deref())?;
        let data_dir = settings.data_dir()?.to_path_buf();
        let host = config
            .node
            .host
            .clone()
            .unwrap_or_else(|| settings.rpc_address().to_string());
        tracing::debug!(host = %host, data_dir = %data_dir.display(), "Resolved local node");

        Ok(Self {
            host,
            data_dir,
            cql: Cqlsh {
                program: config.node.cqlsh.clone(),
            },
            nodetool: Nodetool {
                program: config.node.nodetool.clone(),
            },
            prompt: global.prompt(),
        })
    }

    pub fn context(&self) -> NodeContext<'_> {
        NodeContext {
            host: self.host.clone(),
            data_dir: self.data_dir.clone(),
            cql: &self.cql,
            snapshots: &self.nodetool,
            prompt: self.prompt.as_ref(),
        }
    }
}

/// Object store for `[remote]`, or a `Config` error when it is missing
pub fn object_store(config: &Config) -> SnapResult<AwsS3> {
    Ok(AwsS3::new(config.require_remote()?.clone()))
}

/// Scratch directory for one command, under `paths.scratch`
pub fn scratch_dir(config: &Config, command: &str) -> PathBuf {
    config.paths.scratch.join(command)
}
