//! The versioned deployment configuration and the run context derived from it
//!
//! The configuration file and the CLI are the only places the scripts read
//! ambient state from. Everything downstream receives a [`RunContext`]

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    constants::CONFIG_VERSION,
    errors::ConfigError,
    registry::RegistryMetadata,
    types::Network,
};

/// The default delay of the governor executor, in seconds
const DEFAULT_EXECUTOR_DELAY: u64 = 3600;

/// The deployment configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployConfig {
    /// The schema version
    pub version: u32,
    /// The parameters of each network
    pub networks: BTreeMap<Network, NetworkConfig>,
}

impl DeployConfig {
    /// Load and validate the configuration at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read { path: path.to_path_buf(), reason: e.to_string() })?;
        Self::from_json(&contents).map_err(|e| match e {
            ConfigError::Read { reason, .. } => ConfigError::Read { path: path.to_path_buf(), reason },
            other => other,
        })
    }

    /// Parse and validate a configuration document
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)
            .map_err(|e| ConfigError::Read { path: PathBuf::new(), reason: e.to_string() })?;

        if config.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion { found: config.version, expected: CONFIG_VERSION });
        }

        for network in config.networks.values() {
            network.validate()?;
        }

        Ok(config)
    }

    /// The parameters of one network
    pub fn network(&self, network: Network) -> Result<&NetworkConfig, ConfigError> {
        self.networks.get(&network).ok_or(ConfigError::UnknownNetwork(network))
    }
}

/// The parameters of a deployment to one network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// The RPC URL, the network's public endpoint if unset
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// The admin of every deployed contract
    pub admin: Address,
    /// The multisig proposing the batches, the admin if unset
    #[serde(default)]
    pub safe: Option<Address>,
    /// The SCI token
    pub sci: Address,
    /// The USDC token
    pub usdc: Address,
    /// The wallet receiving research funding
    pub research_funding_wallet: Address,
    /// The signer authorised to sign operations proposals
    pub signer: Address,
    /// The swap contract, recorded in the exports only
    #[serde(default)]
    pub swap_address: Option<Address>,
    /// The metadata URI of the DON and PO tokens
    pub token_uri: String,
    /// The delay of the governor executor, in seconds
    #[serde(default = "default_executor_delay")]
    pub executor_delay: u64,
    /// Governance parameter change sets
    #[serde(default)]
    pub governance: Vec<GovernanceParamsConfig>,
}

/// Serde default for [`NetworkConfig::executor_delay`]
fn default_executor_delay() -> u64 {
    DEFAULT_EXECUTOR_DELAY
}

impl NetworkConfig {
    /// The multisig the batches are created from
    pub fn safe_address(&self) -> Address {
        self.safe.unwrap_or(self.admin)
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_uri.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tokenUri".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        for change_set in &self.governance {
            change_set.current.proposal_lifetime()?;
            change_set.current.vote_lock_time()?;
            for param in &change_set.params {
                param.value()?;
            }
        }

        Ok(())
    }

    /// Addresses recorded in the registry exports that the run does not deploy
    pub fn external_addresses(&self) -> Vec<(String, Address)> {
        let mut external = vec![
            ("admin".to_string(), self.admin),
            ("researchFundingWallet".to_string(), self.research_funding_wallet),
            ("usdc".to_string(), self.usdc),
            ("sci".to_string(), self.sci),
        ];
        if let Some(swap) = self.swap_address {
            external.push(("swapAddress".to_string(), swap));
        }
        external
    }
}

/// One contract's governance parameter changes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceParamsConfig {
    /// The registry name of the governor to reconfigure
    pub contract: String,
    /// The timing parameters currently set on chain
    pub current: CurrentTimings,
    /// The parameters to set, in catalogue order
    pub params: Vec<ParameterSetting>,
}

/// The on-chain values the vote lock invariant is checked against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTimings {
    /// The current proposal lifetime, in seconds
    pub proposal_lifetime: String,
    /// The current vote lock time, in seconds
    pub vote_lock_time: String,
}

impl CurrentTimings {
    /// The parsed proposal lifetime
    pub fn proposal_lifetime(&self) -> Result<U256, ConfigError> {
        parse_uint("current.proposalLifetime", &self.proposal_lifetime)
    }

    /// The parsed vote lock time
    pub fn vote_lock_time(&self) -> Result<U256, ConfigError> {
        parse_uint("current.voteLockTime", &self.vote_lock_time)
    }
}

/// A governance parameter and its new value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterSetting {
    /// The parameter name, packed into a `bytes32` key
    pub name: String,
    /// The new value as a decimal or `0x`-prefixed string
    pub value: String,
}

impl ParameterSetting {
    /// The parsed value
    pub fn value(&self) -> Result<U256, ConfigError> {
        parse_uint(&self.name, &self.value)
    }
}

/// Parse an unsigned integer config value
fn parse_uint(field: &str, value: &str) -> Result<U256, ConfigError> {
    U256::from_str(value.trim())
        .map_err(|e| ConfigError::InvalidValue { field: field.to_string(), reason: e.to_string() })
}

/// Everything a command needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct RunContext {
    /// The selected network
    pub network: Network,
    /// The parameters of the selected network
    pub config: NetworkConfig,
    /// The RPC URL to connect to
    pub rpc_url: String,
    /// The root directory every output is written under
    pub out_dir: PathBuf,
}

impl RunContext {
    /// Resolve the context for a network
    ///
    /// An explicit RPC URL overrides the configured one, which overrides the
    /// network's public endpoint
    pub fn new(
        network: Option<Network>,
        config: &DeployConfig,
        rpc_url: Option<String>,
        out_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        let network = network.ok_or(ConfigError::MissingNetwork)?;
        let network_config = config.network(network)?.clone();

        if !out_dir.is_dir() {
            return Err(ConfigError::MissingRoot(out_dir));
        }

        let rpc_url = rpc_url
            .or_else(|| network_config.rpc_url.clone())
            .unwrap_or_else(|| network.default_rpc_url().to_string());

        Ok(Self { network, config: network_config, rpc_url, out_dir })
    }

    /// The metadata written alongside the address registry
    pub fn registry_metadata(&self) -> RegistryMetadata {
        RegistryMetadata {
            chain_id: self.network.chain_id(),
            provider_url: self.rpc_url.clone(),
            explorer_link: self.network.explorer_link().map(str::to_string),
            external: self.config.external_addresses(),
        }
    }

    /// Resolve a path relative to the output root
    pub fn out_path(&self, file: impl AsRef<Path>) -> PathBuf {
        self.out_dir.join(file)
    }
}

/// Require a signing key, raised before any on-chain action
pub fn require_private_key(priv_key: Option<String>) -> Result<String, ConfigError> {
    priv_key.filter(|k| !k.trim().is_empty()).ok_or(ConfigError::MissingPrivateKey)
}
