//! Install command

use super::{CommandResult, GlobalArgs};
use crate::process::AnsiblePlaybook;
use cassnap_engine::commands::cluster::{install, resolve_hosts, ClusterContext};
use clap::Args;

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Cluster nodes (defaults to cluster.hosts)
    #[arg(short = 'n', long = "nodes", num_args = 1..)]
    pub nodes: Vec<String>,
}

pub fn execute(args: InstallArgs, global: &GlobalArgs) -> CommandResult {
    let config = global.load_config()?;
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
    install(&cluster)?;
    println!("Installed on {} nodes", cluster.hosts.len());
    Ok(())
}
