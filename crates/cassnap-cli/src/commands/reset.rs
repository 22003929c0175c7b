//! Hard reset command

use super::{CommandResult, GlobalArgs};
use crate::process::{Cqlsh, SystemService};
use cassnap_engine::commands::reset::{hard_reset, ReadinessPolicy, ResetOutcome, ResetRequest, ResetStage};
use cassnap_store::NodeSettings;
use clap::{Args, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StageArg {
    /// Stop the service and erase its state
    Shutdown,
    /// Start the service and wait until it answers
    Start,
    /// Both, in order
    All,
}

impl From<StageArg> for ResetStage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Shutdown => ResetStage::Shutdown,
            StageArg::Start => ResetStage::Start,
            StageArg::All => ResetStage::All,
        }
    }
}

#[derive(Debug, Args)]
pub struct ResetArgs {
    #[arg(long, value_enum, default_value = "all")]
    pub stage: StageArg,

    /// Seconds to wait for the node after starting it
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,
}

pub fn execute(args: ResetArgs, global: &GlobalArgs) -> CommandResult {
    let config = global.load_config()?;
    let settings = NodeSettings::discover(config.node.cassandra_yaml.as_deref())?;
    let host = config
        .node
        .host
        .clone()
        .unwrap_or_else(|| settings.rpc_address().to_string());

    let mut directories = settings.state_directories();
    directories.push(config.node.log_dir.clone());

    let service = SystemService {
        name: config.node.service_name.clone(),
    };
    let cql = Cqlsh {
        program: config.node.cqlsh.clone(),
    };
    let prompt = global.prompt();
    let request = ResetRequest {
        stage: args.stage.into(),
        force: global.yes,
        directories,
        readiness: ReadinessPolicy {
            timeout: std::time::Duration::from_secs(args.timeout),
            ..ReadinessPolicy::default()
        },
    };

    match hard_reset(&service, &cql, &host, prompt.as_ref(), &request)? {
        ResetOutcome::Declined => println!("Reset cancelled"),
        ResetOutcome::Done { wiped, ready_after } => {
            if wiped > 0 {
                println!("Emptied {} directories", wiped);
            }
            if let Some(waited) = ready_after {
                println!("{} ready after {}s", host, waited.as_secs());
            }
        }
    }
    Ok(())
}
