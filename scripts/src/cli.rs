//! Definitions of CLI arguments and commands for the governance scripts

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    commands::{check, deploy, execute, gov_params, plan},
    constants::{DEFAULT_CONFIG_PATH, DEFAULT_MAX_CONCURRENCY, DEFAULT_VERIFY_DELAY_SECS, NUM_DEPLOY_CONFIRMATIONS},
    errors::ScriptError,
    executor::RetryPolicy,
    types::Network,
};

/// Deploy the governance contracts and generate the batches configuring them
#[derive(Parser)]
#[command(name = "governance-scripts", version)]
pub struct Cli {
    /// Options shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// The network to operate on
    #[arg(short, long, global = true)]
    pub network: Option<Network>,

    /// Path to the deployment configuration
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Directory every output is written under
    #[arg(short, long, global = true, default_value = ".")]
    pub out_dir: PathBuf,

    /// Network RPC URL, overriding the configured one
    #[arg(short, long, global = true, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Private key of the deployer
    #[arg(short, long, global = true, env = "DEPLOYER_PRIVATE_KEY", hide_env_values = true)]
    pub priv_key: Option<String>,

    /// API key of the block explorer, used for source verification
    #[arg(long, global = true, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    pub etherscan_api_key: Option<String>,
}

/// The available commands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy every contract, then write the registry and the wiring batch
    Deploy(DeployArgs),
    /// Rebuild the wiring batch from a deployments file
    Plan(PlanArgs),
    /// Build the governance parameter batch from the configuration
    GovParams(PlanArgs),
    /// Execute a Safe batch from a single key
    Execute(ExecuteArgs),
    /// Check that a Safe batch and an EOA script carry the same calls
    Check(CheckArgs),
}

impl Command {
    /// Run the command
    pub async fn run(self, global: GlobalArgs) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args, &global).await,
            Command::Plan(args) => plan(args, &global),
            Command::GovParams(args) => gov_params(args, &global),
            Command::Execute(args) => execute(args, &global).await,
            Command::Check(args) => check(args, &global),
        }
    }
}

/// Deploy the governance system
#[derive(Args)]
pub struct DeployArgs {
    /// Directory holding the compiled contract artifacts
    #[arg(short, long, default_value = "artifacts")]
    pub artifacts: PathBuf,

    /// Maximum number of deployments in flight within a wave
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Confirmations to wait for each deployment
    #[arg(long, default_value_t = NUM_DEPLOY_CONFIRMATIONS)]
    pub confirmations: u64,

    /// Reuse the contracts recorded in an existing deployments file
    #[arg(long)]
    pub resume: bool,

    /// Skip source verification
    #[arg(long)]
    pub no_verify: bool,

    /// Seconds to let the explorer index a contract before verifying it
    #[arg(long, default_value_t = DEFAULT_VERIFY_DELAY_SECS)]
    pub verify_delay: u64,

    /// Also export every ABI and bytecode under `abi/` in the output
    /// directory
    #[arg(long)]
    pub export_abis: bool,
}

/// Build a batch from recorded deployments
#[derive(Args)]
pub struct PlanArgs {
    /// The deployments file, `deployments.<network>.json` in the output
    /// directory by default
    #[arg(short, long)]
    pub deployments: Option<PathBuf>,
}

/// Execute a Safe batch directly
#[derive(Args)]
pub struct ExecuteArgs {
    /// The batch to execute, `safeBatchTransaction.json` in the output
    /// directory by default
    #[arg(short, long)]
    pub batch: Option<PathBuf>,

    /// What to do after a transaction fails
    #[arg(long, value_enum, default_value_t = OnFailure::Prompt)]
    pub on_failure: OnFailure,
}

/// Check two exported artifacts against each other
#[derive(Args)]
pub struct CheckArgs {
    /// The Safe batch, `safeBatchTransaction.json` in the output directory
    /// by default
    #[arg(short, long)]
    pub batch: Option<PathBuf>,

    /// The EOA script, `executeTransactions.js` in the output directory by
    /// default
    #[arg(short, long)]
    pub script: Option<PathBuf>,
}

/// The failure handling of `execute`
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OnFailure {
    /// Skip the failed transaction
    Continue,
    /// Stop at the failed transaction
    Abort,
    /// Ask on the terminal
    Prompt,
}

impl OnFailure {
    /// The fixed answer of this mode, `None` when the operator is asked
    pub fn fixed(&self) -> Option<RetryPolicy> {
        match self {
            OnFailure::Continue => Some(RetryPolicy::ContinueWithNext),
            OnFailure::Abort => Some(RetryPolicy::Abort),
            OnFailure::Prompt => None,
        }
    }
}
