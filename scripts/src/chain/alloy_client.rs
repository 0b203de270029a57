//! The chain client backed by an `alloy` HTTP provider and a local signer,
//! with source verification delegated to `forge`

use std::{process::Command, str::FromStr, time::Duration};

use alloy::{
    network::TransactionBuilder,
    primitives::{hex, Address, TxHash},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use tool_utils::run_command_captured;
use tracing::{debug, info};

use crate::{
    constants::FORGE_COMMAND,
    errors::{ChainError, VerificationError},
};

use super::{ChainClient, TxParams, TxReceipt};

/// How long to wait for the confirmations of one transaction
const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

/// The phrase the explorer reports for a contract that is already verified
const ALREADY_VERIFIED: &str = "already verified";

/// A chain client signing with a single local key
#[derive(Clone)]
pub struct AlloyChainClient {
    /// The provider, with the signer installed as its wallet
    provider: DynProvider,
    /// The signer's address
    sender: Address,
    /// The chain id reported by the node at connection time
    chain_id: u64,
    /// The API key passed to the explorer verifier
    etherscan_api_key: Option<String>,
}

impl AlloyChainClient {
    /// Connect to `rpc_url`, signing with `priv_key`
    pub async fn connect(
        rpc_url: &str,
        priv_key: &str,
        etherscan_api_key: Option<String>,
    ) -> Result<Self, ChainError> {
        let signer =
            PrivateKeySigner::from_str(priv_key).map_err(|e| ChainError::ClientInitialization(e.to_string()))?;
        let sender = signer.address();

        let url = Url::parse(rpc_url).map_err(|e| ChainError::ClientInitialization(e.to_string()))?;
        let provider = DynProvider::new(ProviderBuilder::new().wallet(signer).connect_http(url));

        let chain_id = provider.get_chain_id().await.map_err(|e| ChainError::ClientInitialization(e.to_string()))?;
        info!(%sender, chain_id, "connected to {rpc_url}");

        Ok(Self { provider, sender, chain_id, etherscan_api_key })
    }

    /// Convert transaction parameters into an RPC request
    fn to_request(&self, tx: &TxParams) -> TransactionRequest {
        let mut req = TransactionRequest::default().with_from(self.sender).with_value(tx.value);
        req = match tx.to {
            Some(to) => req.with_to(to).with_input(tx.data.clone()),
            None => req.with_deploy_code(tx.data.clone()),
        };

        if let Some(gas_limit) = tx.gas_limit {
            req = req.with_gas_limit(gas_limit);
        }
        if let Some(gas_price) = tx.gas_price {
            req = req.with_gas_price(gas_price);
        }
        if let Some(nonce) = tx.nonce {
            req = req.with_nonce(nonce);
        }

        req.with_chain_id(self.chain_id)
    }
}

impl ChainClient for AlloyChainClient {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.chain_id)
    }

    async fn pending_nonce(&self) -> Result<u64, ChainError> {
        self.provider
            .get_transaction_count(self.sender)
            .pending()
            .await
            .map_err(|e| ChainError::NonceFetching(e.to_string()))
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        self.provider.get_gas_price().await.map_err(|e| ChainError::GasPrice(e.to_string()))
    }

    async fn estimate_gas(&self, tx: &TxParams) -> Result<u64, ChainError> {
        let req = self.to_request(tx);
        self.provider.estimate_gas(req).await.map_err(|e| ChainError::GasEstimation(e.to_string()))
    }

    async fn send_transaction(&self, tx: TxParams) -> Result<TxHash, ChainError> {
        let req = self.to_request(&tx);
        let pending =
            self.provider.send_transaction(req).await.map_err(|e| ChainError::Submission(e.to_string()))?;

        let hash = *pending.tx_hash();
        debug!(%hash, "broadcast transaction");
        Ok(hash)
    }

    async fn wait_for_confirmations(&self, hash: TxHash, confirmations: u64) -> Result<TxReceipt, ChainError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), hash)
            .with_required_confirmations(confirmations)
            .with_timeout(Some(CONFIRMATION_TIMEOUT))
            .get_receipt()
            .await
            .map_err(|e| ChainError::Confirmation { hash, reason: e.to_string() })?;

        Ok(TxReceipt {
            hash,
            contract_address: receipt.contract_address,
            gas_used: receipt.gas_used,
            block_number: receipt.block_number,
            success: receipt.status(),
        })
    }

    async fn verify_source(
        &self,
        address: Address,
        contract_name: &str,
        constructor_args: &[u8],
    ) -> Result<(), VerificationError> {
        let mut cmd = Command::new(FORGE_COMMAND);
        cmd.arg("verify-contract")
            .arg(address.to_checksum(None))
            .arg(contract_name)
            .arg("--chain-id")
            .arg(self.chain_id.to_string())
            .arg("--watch");
        if !constructor_args.is_empty() {
            cmd.arg("--constructor-args").arg(hex::encode_prefixed(constructor_args));
        }
        if let Some(key) = &self.etherscan_api_key {
            cmd.arg("--etherscan-api-key").arg(key);
        }

        let output = tokio::task::spawn_blocking(move || run_command_captured(cmd))
            .await
            .map_err(|e| VerificationError::Launch(e.to_string()))?
            .map_err(|e| VerificationError::Launch(e.to_string()))?;

        if output.success || output.mentions(ALREADY_VERIFIED) {
            return Ok(());
        }

        let reason = if output.stderr.trim().is_empty() { output.stdout } else { output.stderr };
        Err(VerificationError::Rejected { address, reason: reason.trim().to_string() })
    }
}
