//! Snapshot command

use super::{object_store, scratch_dir, CommandResult, GlobalArgs, NodeTools, ScopeArgs};
use crate::process::{AnsiblePlaybook, AwsS3};
use cassnap_engine::commands::cluster::{
    cluster_snapshot, resolve_hosts, ClusterContext, ClusterSnapshotRequest,
};
use cassnap_engine::commands::snapshot::{snapshot, upload_archive, SnapshotRequest, UploadOutcome};
use cassnap_store::RemoteStore;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Archive title (defaults to the current time)
    #[arg(long)]
    pub title: Option<String>,

    /// Directory the archive is written to (defaults to paths.archives)
    #[arg(short = 'd', long = "path")]
    pub path: Option<PathBuf>,

    /// Replace an existing archive with the same title
    #[arg(long)]
    pub overwrite: bool,

    /// Include `nodetool ring` output
    #[arg(long)]
    pub ring: bool,

    /// Upload the archive to the remote store afterwards
    #[arg(long)]
    pub s3: bool,

    /// Snapshot every cluster node
    #[arg(long)]
    pub cluster: bool,

    /// Cluster nodes (defaults to cluster.hosts)
    #[arg(short = 'n', long = "nodes", num_args = 1.., requires = "cluster")]
    pub nodes: Vec<String>,

    /// Restart the service on each node after the snapshot
    #[arg(long, requires = "cluster")]
    pub reload: bool,
}

pub fn execute(args: SnapshotArgs, global: &GlobalArgs) -> CommandResult {
    let scope = args.scope.to_request()?;
    let config = global.load_config()?;
    let destination = args.path.clone().unwrap_or_else(|| config.paths.archives.clone());
    let store = if args.s3 { Some(object_store(&config)?) } else { None };

    let (title, archive) = if args.cluster {
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
        let outcome = cluster_snapshot(
            &cluster,
            &scratch_dir(&config, "cluster-snapshot"),
            &ClusterSnapshotRequest {
                scope,
                title: args.title.clone(),
                destination,
                overwrite: args.overwrite,
                reload: args.reload,
            },
        )?;
        (outcome.title, outcome.archive)
    } else {
        let tools = NodeTools::discover(&config, global)?;
        let outcome = snapshot(
            &tools.context(),
            &scratch_dir(&config, "snapshot"),
            &SnapshotRequest {
                scope,
                title: args.title.clone(),
                destination,
                overwrite: args.overwrite,
                include_ring: args.ring,
            },
        )?;
        for skipped in &outcome.skipped {
            println!("Skipped (no snapshot files): {}", skipped);
        }
        (outcome.title, outcome.archive)
    };

    println!("Archive written: {}", archive.display());

    if let Some(store) = &store {
        upload(store, global, &archive, &title)?;
    }
    Ok(())
}

fn upload(store: &AwsS3, global: &GlobalArgs, archive: &Path, title: &str) -> CommandResult {
    let remote = RemoteStore::new(store);
    let prompt = global.prompt();
    match upload_archive(&remote, prompt.as_ref(), archive, title)? {
        UploadOutcome::Uploaded { key, bytes } => println!("Uploaded {} ({} bytes)", key, bytes),
        UploadOutcome::Skipped => println!("Upload skipped"),
    }
    Ok(())
}
