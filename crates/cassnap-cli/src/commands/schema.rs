//! Schema save/load commands
//!
//! These are the node-side halves of cluster snapshot and restore, but they
//! work standalone too.

use super::{scratch_dir, CommandResult, GlobalArgs, NodeTools, ScopeArgs};
use cassnap_engine::commands::schema::{load_schema, save_schema};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    pub command: SchemaCommand,
}

#[derive(Debug, Subcommand)]
pub enum SchemaCommand {
    /// Write schema.cql and schemas.zip for the given keyspaces
    Save(SaveArgs),
    /// Replay saved DDL against the local node
    Load(LoadArgs),
}

#[derive(Debug, Args)]
pub struct SaveArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    #[arg(long, default_value = ".")]
    pub dest: PathBuf,

    /// Also write `nodetool ring` output
    #[arg(long)]
    pub ring: bool,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Directory holding schema.cql and schemas.zip
    #[arg(long, default_value = ".")]
    pub source: PathBuf,
}

pub fn execute(args: SchemaArgs, global: &GlobalArgs) -> CommandResult {
    match args.command {
        SchemaCommand::Save(save) => execute_save(save, global),
        SchemaCommand::Load(load) => execute_load(load, global),
    }
}

fn execute_save(args: SaveArgs, global: &GlobalArgs) -> CommandResult {
    let scope = args.scope.to_request()?;
    let config = global.load_config()?;
    let tools = NodeTools::discover(&config, global)?;
    let saved = save_schema(
        &tools.context(),
        &scope,
        &args.dest,
        &scratch_dir(&config, "schema"),
        args.ring,
    )?;
    println!(
        "Saved schema of {} keyspaces to {}",
        saved.keyspaces.len(),
        saved.dest.display()
    );
    Ok(())
}

fn execute_load(args: LoadArgs, global: &GlobalArgs) -> CommandResult {
    let scope = args.scope.to_request()?;
    let config = global.load_config()?;
    let tools = NodeTools::discover(&config, global)?;
    let replayed = load_schema(&tools.context(), &args.source, &scope.keyspaces)?;
    println!("Replayed {} DDL files", replayed);
    Ok(())
}
