//! Clean command

use super::{CommandResult, GlobalArgs, NodeTools};
use cassnap_engine::commands::clean::{clean, CleanOutcome, CleanRequest};
use clap::Args;

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Also delete incremental backup files of live tables
    #[arg(long)]
    pub purge_backups: bool,
}

pub fn execute(args: CleanArgs, global: &GlobalArgs) -> CommandResult {
    let config = global.load_config()?;
    let tools = NodeTools::discover(&config, global)?;
    let request = CleanRequest {
        purge_backups: args.purge_backups,
        force: global.yes,
    };
    match clean(&tools.context(), request)? {
        CleanOutcome::Cleaned { removed } => println!("Removed {} orphaned entries", removed),
        CleanOutcome::Declined { planned } => {
            println!("Clean cancelled ({} entries left in place)", planned)
        }
    }
    Ok(())
}
