//! An in-memory chain client for exercising the deployment and execution
//! flows without a node

use std::sync::{Mutex, MutexGuard};

use alloy::primitives::{address, keccak256, Address, Bytes, TxHash};

use crate::errors::{ChainError, VerificationError};

use super::{ChainClient, TxParams, TxReceipt};

/// The sender of every mock transaction
pub const MOCK_SENDER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// The recorded state of the mock chain
#[derive(Default)]
struct MockState {
    /// Every broadcast transaction, in nonce order
    sent: Vec<TxParams>,
    /// The receipts of broadcast transactions
    receipts: Vec<TxReceipt>,
    /// Contracts passed to `verify_source`
    verified: Vec<(Address, String)>,
}

/// A chain client that mines every transaction instantly
#[derive(Default)]
pub struct MockChainClient {
    /// The mutable chain state
    state: Mutex<MockState>,
    /// Whether gas estimation always fails
    fail_estimation: bool,
    /// Data prefixes whose transactions are mined but revert
    reverting: Vec<Bytes>,
    /// Data prefixes whose transactions the node refuses to accept
    rejected: Vec<Bytes>,
    /// Whether source verification always fails
    fail_verification: bool,
}

impl MockChainClient {
    /// A client where everything succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every gas estimate fail
    pub fn failing_estimation(mut self) -> Self {
        self.fail_estimation = true;
        self
    }

    /// Mine transactions whose data starts with `prefix` as reverted
    pub fn reverting(mut self, prefix: impl Into<Bytes>) -> Self {
        self.reverting.push(prefix.into());
        self
    }

    /// Refuse to broadcast transactions whose data starts with `prefix`
    pub fn rejecting(mut self, prefix: impl Into<Bytes>) -> Self {
        self.rejected.push(prefix.into());
        self
    }

    /// Make source verification fail
    pub fn failing_verification(mut self) -> Self {
        self.fail_verification = true;
        self
    }

    /// The broadcast transactions
    pub fn sent(&self) -> Vec<TxParams> {
        self.state().sent.clone()
    }

    /// The contracts submitted for verification
    pub fn verified(&self) -> Vec<(Address, String)> {
        self.state().verified.clone()
    }

    /// Lock the state
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Whether `data` starts with any of the prefixes
    fn matches(prefixes: &[Bytes], data: &Bytes) -> bool {
        prefixes.iter().any(|p| data.starts_with(p))
    }
}

impl ChainClient for MockChainClient {
    fn sender(&self) -> Address {
        MOCK_SENDER
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(31337)
    }

    async fn pending_nonce(&self) -> Result<u64, ChainError> {
        Ok(self.state().sent.len() as u64)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Ok(1_000_000_000)
    }

    async fn estimate_gas(&self, tx: &TxParams) -> Result<u64, ChainError> {
        if self.fail_estimation {
            return Err(ChainError::GasEstimation("execution reverted".to_string()));
        }

        Ok(21_000 + 16 * tx.data.len() as u64)
    }

    async fn send_transaction(&self, tx: TxParams) -> Result<TxHash, ChainError> {
        // Give concurrent submitters a chance to interleave
        tokio::task::yield_now().await;

        if Self::matches(&self.rejected, &tx.data) {
            return Err(ChainError::Submission("insufficient funds".to_string()));
        }

        let mut state = self.state();
        let nonce = tx.nonce.unwrap_or(state.sent.len() as u64);
        let hash = keccak256([nonce.to_be_bytes().as_slice(), tx.data.as_ref()].concat());
        let success = !Self::matches(&self.reverting, &tx.data);
        let contract_address = (tx.to.is_none() && success).then(|| MOCK_SENDER.create(nonce));

        let block_number = Some(state.sent.len() as u64 + 1);
        state.receipts.push(TxReceipt {
            hash,
            contract_address,
            gas_used: tx.gas_limit.unwrap_or_default() / 2,
            block_number,
            success,
        });
        state.sent.push(tx);
        Ok(hash)
    }

    async fn wait_for_confirmations(&self, hash: TxHash, _confirmations: u64) -> Result<TxReceipt, ChainError> {
        self.state()
            .receipts
            .iter()
            .find(|r| r.hash == hash)
            .cloned()
            .ok_or_else(|| ChainError::Confirmation { hash, reason: "unknown transaction".to_string() })
    }

    async fn verify_source(
        &self,
        address: Address,
        contract_name: &str,
        _constructor_args: &[u8],
    ) -> Result<(), VerificationError> {
        self.state().verified.push((address, contract_name.to_string()));
        if self.fail_verification {
            return Err(VerificationError::Rejected { address, reason: "rate limited".to_string() });
        }

        Ok(())
    }
}
