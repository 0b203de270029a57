//! Constants used in the deploy scripts

/// The configuration schema version this build understands
pub const CONFIG_VERSION: u32 = 1;

/// The default path of the deployment configuration file
pub const DEFAULT_CONFIG_PATH: &str = "deploy.config.json";

/// The number of confirmations to wait for a deployment transaction
pub const NUM_DEPLOY_CONFIRMATIONS: u64 = 2;

/// The number of confirmations to wait for a configuration transaction
pub const NUM_CALL_CONFIRMATIONS: u64 = 1;

/// The gas limit assumed for a deployment when estimation fails
pub const DEPLOY_FALLBACK_GAS: u64 = 5_000_000;

/// The gas limit assumed for a contract call when estimation fails
pub const CALL_FALLBACK_GAS: u64 = 300_000;

/// The safety margin added on top of a gas estimate, in percent
pub const GAS_MARGIN_PERCENT: u64 = 20;

/// The default number of deployments in flight within one wave
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// The default number of seconds to wait for the explorer to index a
/// contract before verifying it
pub const DEFAULT_VERIFY_DELAY_SECS: u64 = 60;

/// The Safe batch document format version
pub const SAFE_BATCH_VERSION: &str = "1.0";

/// The Safe transaction builder version the batch documents target
pub const SAFE_TX_BUILDER_VERSION: &str = "1.17.0";

/// The signature of the governance parameter setter
pub const SET_GOVERNANCE_PARAMETER_SIGNATURE: &str =
    "setGovernanceParameterByAdmin(bytes32,uint256)";

/// The governance parameter holding the proposal lifetime
pub const PROPOSAL_LIFETIME_PARAM: &str = "proposalLifetime";

/// The governance parameter holding the vote lock time, which must never
/// drop below the proposal lifetime
pub const VOTE_LOCK_TIME_PARAM: &str = "voteLockTime";

/// The file name of the Solidity address library
pub const SOLIDITY_ADDRESSES_FILE: &str = "DeployedAddresses.sol";

/// The file name of the wiring Safe batch
pub const SAFE_BATCH_FILE: &str = "safeBatchTransaction.json";

/// The file name of the wiring EOA script
pub const EOA_SCRIPT_FILE: &str = "executeTransactions.js";

/// The file name of the governance parameter Safe batch
pub const GOV_PARAMS_SAFE_BATCH_FILE: &str = "governanceParamsTransaction.json";

/// The file name of the governance parameter EOA script
pub const GOV_PARAMS_EOA_SCRIPT_FILE: &str = "executeGovernanceParams.js";

/// The directory under the output root holding ABI exports
pub const ABI_DIR: &str = "abi";

/// The directory under the ABI export holding bytecode exports
pub const BYTECODE_DIR: &str = "bytecode";

/// The registry key of the chain id metadata entry
pub const CHAIN_ID_KEY: &str = "chainId";

/// The registry key of the RPC URL metadata entry
pub const PROVIDER_URL_KEY: &str = "providerUrl";

/// The registry key of the block explorer metadata entry
pub const EXPLORER_LINK_KEY: &str = "explorerLink";

/// The name of the `forge` command used for source verification
pub const FORGE_COMMAND: &str = "forge";

/// The environment variable the EOA script reads its key from
pub const EOA_PRIVATE_KEY_ENV_VAR: &str = "PRIVATE_KEY";

/// The environment variable the EOA script reads its RPC URL from
pub const EOA_RPC_URL_ENV_VAR: &str = "RPC_URL";

/// The name of the deployments file for a network
pub fn deployments_file(network: impl std::fmt::Display) -> String {
    format!("deployments.{network}.json")
}
