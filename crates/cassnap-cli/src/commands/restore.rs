//! Restore command

use super::{object_store, scratch_dir, CommandResult, GlobalArgs, NodeTools, ScopeArgs};
use crate::process::{AnsiblePlaybook, SstableLoader};
use cassnap_core::Config;
use cassnap_engine::commands::cluster::{
    cluster_restore, resolve_hosts, ClusterContext, ClusterRestoreOutcome, ClusterRestoreRequest,
};
use cassnap_engine::commands::load::{load_archive, ArchiveSource, LoadedArchive};
use cassnap_engine::commands::restore::{restore, RestoreOutcome, RestoreRequest};
use cassnap_store::RemoteStore;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RestoreArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Local archive to restore
    #[arg(short = 'd', long = "path")]
    pub path: Option<PathBuf>,

    /// Remote archive key or title; without a value, choose from a list
    #[arg(long = "s3", num_args = 0..=1)]
    pub s3: Option<Option<String>>,

    /// Restore on every cluster node
    #[arg(long)]
    pub cluster: bool,

    /// Cluster nodes; for a local restore, the bulk-load targets
    #[arg(short = 'n', long = "nodes", num_args = 1..)]
    pub nodes: Vec<String>,

    /// Restart the service on each node afterwards
    #[arg(long, requires = "cluster")]
    pub reload: bool,

    /// Hard-reset every node before restoring
    #[arg(long, requires = "cluster")]
    pub hard_reset: bool,
}

pub fn execute(args: RestoreArgs, global: &GlobalArgs) -> CommandResult {
    let source = ArchiveSource::from_args(args.path.clone(), args.s3.clone())?;
    let scope = args.scope.to_request()?;
    let config = global.load_config()?;

    let prompt = global.prompt();
    let loaded = if source.is_remote() {
        let store = object_store(&config)?;
        let remote = RemoteStore::new(&store);
        load_archive(&source, Some(&remote), prompt.as_ref(), &scratch_dir(&config, "restore"))?
    } else {
        load_archive(&source, None, prompt.as_ref(), &scratch_dir(&config, "restore"))?
    };
    let Some(archive) = loaded else {
        println!("No archive selected");
        return Ok(());
    };
    println!("Loaded archive {}", archive.title());

    let result = if args.cluster {
        restore_cluster(&args, &config, global, &archive, scope)
    } else {
        restore_node(&args, &config, global, &archive, scope)
    };
    archive.discard()?;
    result
}

fn restore_cluster(
    args: &RestoreArgs,
    config: &Config,
    global: &GlobalArgs,
    archive: &LoadedArchive,
    scope: cassnap_core::ScopeRequest,
) -> CommandResult {
    let hosts = resolve_hosts(&args.nodes, &config.cluster.hosts)?;
    let executor = AnsiblePlaybook {
        playbook_dir: config.cluster.playbook_dir.clone(),
    };
    let prompt = global.prompt();
    let cluster = ClusterContext {
        hosts,
        executor: &executor,
        node_command: config.cluster.node_command.clone(),
        prompt: prompt.as_ref(),
    };
    let request = ClusterRestoreRequest {
        scope,
        reload: args.reload,
        hard_reset: args.hard_reset,
        force: global.yes,
    };
    match cluster_restore(&cluster, archive, &request)? {
        ClusterRestoreOutcome::Declined => println!("Restore cancelled"),
        ClusterRestoreOutcome::Restored => {
            println!("Cluster restore of {} finished", archive.title())
        }
    }
    Ok(())
}

fn restore_node(
    args: &RestoreArgs,
    config: &Config,
    global: &GlobalArgs,
    archive: &LoadedArchive,
    scope: cassnap_core::ScopeRequest,
) -> CommandResult {
    let tools = NodeTools::discover(config, global)?;
    let loader = SstableLoader {
        program: config.node.sstableloader.clone(),
    };
    let request = RestoreRequest {
        scope,
        force: global.yes,
        load_hosts: args.nodes.clone(),
    };

    match restore(&tools.context(), &loader, archive, &request)? {
        RestoreOutcome::Declined => println!("Restore cancelled"),
        RestoreOutcome::Restored(report) => {
            println!(
                "Restored {}: dropped {} keyspaces, removed {} orphaned entries, loaded {} tables",
                archive.title(),
                report.dropped.len(),
                report.reconciled,
                report.loaded.len()
            );
            for (keyspace, table) in &report.schema_only {
                println!("  {}.{} recreated without data", keyspace, table);
            }
        }
    }
    Ok(())
}
