//! Type definitions used throughout the scripts

use std::fmt::{self, Display};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The networks the governance system can be deployed to
#[derive(ValueEnum, Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    /// Base mainnet
    BaseMainnet,
    /// The Base Sepolia testnet
    BaseSepolia,
    /// A local development node
    Localhost,
}

impl Network {
    /// The chain id of the network
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::BaseMainnet => 8453,
            Network::BaseSepolia => 84532,
            Network::Localhost => 31337,
        }
    }

    /// The block explorer of the network, if it has one
    pub fn explorer_link(&self) -> Option<&'static str> {
        match self {
            Network::BaseMainnet => Some("https://basescan.org"),
            Network::BaseSepolia => Some("https://sepolia.basescan.org"),
            Network::Localhost => None,
        }
    }

    /// The public RPC endpoint used when none is configured
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::BaseMainnet => "https://mainnet.base.org",
            Network::BaseSepolia => "https://sepolia.base.org",
            Network::Localhost => "http://127.0.0.1:8545",
        }
    }

    /// Whether source verification is skipped on this network
    pub fn skips_verification(&self) -> bool {
        self.explorer_link().is_none()
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::BaseMainnet => write!(f, "base-mainnet"),
            Network::BaseSepolia => write!(f, "base-sepolia"),
            Network::Localhost => write!(f, "localhost"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Network;

    #[test]
    fn test_network_serde_matches_display() {
        for network in [Network::BaseMainnet, Network::BaseSepolia, Network::Localhost] {
            let json = serde_json::to_string(&network).unwrap();
            assert_eq!(json, format!("\"{network}\""));
        }
    }

    #[test]
    fn test_localhost_skips_verification() {
        assert!(Network::Localhost.skips_verification());
        assert!(!Network::BaseSepolia.skips_verification());
        assert_eq!(Network::BaseMainnet.chain_id(), 8453);
    }
}
