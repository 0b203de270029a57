//! The chain client capability the deployment and execution flows run
//! against, and the gas and submission policy shared by both

use std::future::Future;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    constants::GAS_MARGIN_PERCENT,
    errors::{ChainError, VerificationError},
};

pub mod alloy_client;
#[cfg(test)]
pub(crate) mod mock;

pub use alloy_client::AlloyChainClient;

/// The parameters of a transaction to estimate or send
///
/// A transaction without a recipient is a contract creation carrying the
/// init-code as its data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxParams {
    /// The recipient, `None` for a deployment
    pub to: Option<Address>,
    /// The call-data or init-code
    pub data: Bytes,
    /// The value transferred
    pub value: U256,
    /// The gas limit
    pub gas_limit: Option<u64>,
    /// The legacy gas price
    pub gas_price: Option<u128>,
    /// The sender nonce
    pub nonce: Option<u64>,
}

impl TxParams {
    /// A contract creation with the given init-code
    pub fn deploy(init_code: Bytes) -> Self {
        Self { data: init_code, ..Default::default() }
    }

    /// A call to `to` with the given call-data and value
    pub fn call(to: Address, data: Bytes, value: U256) -> Self {
        Self { to: Some(to), data, value, ..Default::default() }
    }
}

/// The receipt of a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// The transaction hash
    pub hash: TxHash,
    /// The created contract, for a deployment
    pub contract_address: Option<Address>,
    /// The gas consumed
    pub gas_used: u64,
    /// The block the transaction was included in
    pub block_number: Option<u64>,
    /// Whether execution succeeded
    pub success: bool,
}

/// The operations the orchestration needs from a network node and signer
///
/// Implementations sign with a single key whose address is [`Self::sender`]
pub trait ChainClient: Send + Sync {
    /// The address transactions are signed by
    fn sender(&self) -> Address;

    /// The chain id of the connected network
    fn chain_id(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// The next nonce of the sender, counting pending transactions
    fn pending_nonce(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// The current gas price
    fn gas_price(&self) -> impl Future<Output = Result<u128, ChainError>> + Send;

    /// Estimate the gas a transaction consumes
    fn estimate_gas(&self, tx: &TxParams) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Sign and broadcast a transaction, returning its hash
    fn send_transaction(&self, tx: TxParams) -> impl Future<Output = Result<TxHash, ChainError>> + Send;

    /// Wait until the transaction has `confirmations` confirmations
    fn wait_for_confirmations(
        &self,
        hash: TxHash,
        confirmations: u64,
    ) -> impl Future<Output = Result<TxReceipt, ChainError>> + Send;

    /// Verify the source of a deployed contract with the block explorer
    fn verify_source(
        &self,
        address: Address,
        contract_name: &str,
        constructor_args: &[u8],
    ) -> impl Future<Output = Result<(), VerificationError>> + Send;
}

// -------
// | Gas |
// -------

/// A gas limit either measured by the node or assumed after estimation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasEstimate {
    /// The node's estimate
    Measured(u64),
    /// The fallback used when estimation failed
    Fallback(u64),
}

impl GasEstimate {
    /// Take the measured estimate, or the fallback if estimation failed
    pub fn from_result(result: Result<u64, ChainError>, fallback: u64) -> Self {
        match result {
            Ok(units) => GasEstimate::Measured(units),
            Err(e) => {
                warn!(fallback, "gas estimation failed, using fallback: {e}");
                GasEstimate::Fallback(fallback)
            },
        }
    }

    /// The estimated units, before the margin
    pub fn units(&self) -> u64 {
        match self {
            GasEstimate::Measured(units) | GasEstimate::Fallback(units) => *units,
        }
    }

    /// Whether the fallback was used
    pub fn is_fallback(&self) -> bool {
        matches!(self, GasEstimate::Fallback(_))
    }

    /// The gas limit to send with: the estimate plus the safety margin
    pub fn with_margin(&self) -> u64 {
        let units = self.units();
        units.saturating_add(units.saturating_mul(GAS_MARGIN_PERCENT) / 100)
    }
}

// --------------
// | Submission |
// --------------

/// Sends transactions from a single key, one submission at a time
///
/// Gas pricing and estimation run concurrently, but fetching the nonce and
/// broadcasting are held under one lock so concurrent callers never sign two
/// transactions with the same nonce
pub struct TransactionSender<'a, C> {
    /// The client to send through
    client: &'a C,
    /// Held from nonce fetch to broadcast
    submit_lock: Mutex<()>,
}

impl<'a, C: ChainClient> TransactionSender<'a, C> {
    /// Create a sender over the given client
    pub fn new(client: &'a C) -> Self {
        Self { client, submit_lock: Mutex::new(()) }
    }

    /// The underlying client
    pub fn client(&self) -> &'a C {
        self.client
    }

    /// Price, estimate and send a transaction
    ///
    /// Returns the hash and the gas estimate the limit was derived from
    pub async fn submit(&self, mut tx: TxParams, fallback_gas: u64) -> Result<(TxHash, GasEstimate), ChainError> {
        let gas_price = self.client.gas_price().await?;
        let estimate = GasEstimate::from_result(self.client.estimate_gas(&tx).await, fallback_gas);

        tx.gas_price = Some(gas_price);
        tx.gas_limit = Some(estimate.with_margin());

        let _guard = self.submit_lock.lock().await;
        let nonce = self.client.pending_nonce().await?;
        tx.nonce = Some(nonce);

        debug!(from = %self.client.sender(), nonce, gas_limit = tx.gas_limit, gas_price, "submitting transaction");
        let hash = self.client.send_transaction(tx).await?;
        Ok((hash, estimate))
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, Bytes, U256};

    use crate::errors::ChainError;

    use super::{mock::MockChainClient, GasEstimate, TransactionSender, TxParams};

    #[test]
    fn test_gas_margin_applies_to_both_branches() {
        assert_eq!(GasEstimate::Measured(100_000).with_margin(), 120_000);
        assert_eq!(GasEstimate::Fallback(300_000).with_margin(), 360_000);
        assert_eq!(GasEstimate::Fallback(5_000_000).with_margin(), 6_000_000);
    }

    #[test]
    fn test_fallback_used_on_estimation_failure() {
        let estimate = GasEstimate::from_result(Err(ChainError::GasEstimation("execution reverted".into())), 300_000);
        assert_eq!(estimate, GasEstimate::Fallback(300_000));
        assert!(estimate.is_fallback());

        let estimate = GasEstimate::from_result(Ok(21_000), 300_000);
        assert_eq!(estimate, GasEstimate::Measured(21_000));
    }

    #[tokio::test]
    async fn test_concurrent_submissions_use_distinct_nonces() {
        let client = MockChainClient::new();
        let sender = TransactionSender::new(&client);
        let to = address!("96f67a852f8D3Bc05464C4F91F97aACE060e247A");

        let submissions = (0..5).map(|i| {
            let tx = TxParams::call(to, Bytes::from(vec![i as u8]), U256::ZERO);
            sender.submit(tx, 300_000)
        });
        let results = futures::future::join_all(submissions).await;
        assert!(results.iter().all(Result::is_ok));

        let mut nonces: Vec<u64> = client.sent().iter().filter_map(|tx| tx.nonce).collect();
        nonces.sort_unstable();
        assert_eq!(nonces, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_submission_applies_margin_to_fallback() {
        let client = MockChainClient::new().failing_estimation();
        let sender = TransactionSender::new(&client);

        let (_, estimate) = sender.submit(TxParams::deploy(Bytes::from(vec![0x60])), 5_000_000).await.unwrap();
        assert_eq!(estimate, GasEstimate::Fallback(5_000_000));
        assert_eq!(client.sent()[0].gas_limit, Some(6_000_000));
    }
}
