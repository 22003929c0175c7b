//! cassnap CLI
//!
//! Snapshot, restore and maintain Cassandra nodes and clusters.

use cassnap_core::logging_facility::{init, run_span, Profile};
use cassnap_core_types::RunId;
use clap::{Parser, Subcommand};

mod commands;
mod process;

#[derive(Debug, Parser)]
#[command(name = "cassnap")]
#[command(about = "cassnap - Cassandra snapshot and restore", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: commands::GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Snapshot a node (or a cluster with --cluster) into a zip archive
    Snapshot(commands::snapshot::SnapshotArgs),
    /// Restore an archive, replacing the current schema and data
    Restore(commands::restore::RestoreArgs),
    /// Install this tool on every cluster node
    Install(commands::install::InstallArgs),
    /// Delete data directories that no longer belong to the live schema
    Clean(commands::clean::CleanArgs),
    /// Stop the local node, erase its state and start it again
    Reset(commands::reset::ResetArgs),
    /// Save or load schema DDL (node side of cluster runs)
    Schema(commands::schema::SchemaArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Snapshot(_) => "snapshot",
            Commands::Restore(_) => "restore",
            Commands::Install(_) => "install",
            Commands::Clean(_) => "clean",
            Commands::Reset(_) => "reset",
            Commands::Schema(_) => "schema",
        }
    }
}

fn main() {
    let cli = Cli::parse();

    init(if cli.global.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });
    let run_id = cli
        .global
        .run_id
        .clone()
        .map(RunId::from_string)
        .unwrap_or_default();
    let span = run_span(&run_id, cli.command.name());
    let _entered = span.enter();

    let global = &cli.global;
    let result = match cli.command {
        Commands::Snapshot(args) => commands::snapshot::execute(args, global),
        Commands::Restore(args) => commands::restore::execute(args, global),
        Commands::Install(args) => commands::install::execute(args, global),
        Commands::Clean(args) => commands::clean::execute(args, global),
        Commands::Reset(args) => commands::reset::execute(args, global),
        Commands::Schema(args) => commands::schema::execute(args, global),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
