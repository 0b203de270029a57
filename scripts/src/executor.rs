//! Direct execution of a batch from a single key
//!
//! Mirrors the rendered EOA script: each call is priced, estimated (with the
//! fallback limit when estimation fails), sent and confirmed in order. What
//! happens after a failed call is decided by an injected [`FailurePolicy`]

use std::str::FromStr;

use alloy::primitives::{hex, Address, Bytes, TxHash, U256};
use tracing::{error, info, warn};

use crate::{
    chain::{ChainClient, TransactionSender, TxParams},
    constants::CALL_FALLBACK_GAS,
    errors::{ChainError, ExportError},
    plan::BatchTransaction,
};

/// What to do with the remaining calls after one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Stop, leaving the remaining calls unsent
    Abort,
    /// Skip the failed call and carry on
    ContinueWithNext,
}

/// Decides how execution proceeds after a failed call
pub trait FailurePolicy {
    /// Called once per failed call with its zero-based index
    fn on_failure(&mut self, index: usize, error: &ChainError) -> RetryPolicy;
}

/// Always answers the same way
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy(pub RetryPolicy);

impl FailurePolicy for FixedPolicy {
    fn on_failure(&mut self, _index: usize, _error: &ChainError) -> RetryPolicy {
        self.0
    }
}

/// Asks the operator on the terminal
///
/// A prompt that cannot be read is treated as an abort
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptPolicy;

impl FailurePolicy for PromptPolicy {
    fn on_failure(&mut self, index: usize, error: &ChainError) -> RetryPolicy {
        let prompt = format!("Transaction {index} failed: {error}\nContinue with next transaction?");
        match tool_utils::prompt_for_confirmation(&prompt) {
            Ok(true) => RetryPolicy::ContinueWithNext,
            Ok(false) => RetryPolicy::Abort,
            Err(e) => {
                warn!("error reading answer, aborting: {e}");
                RetryPolicy::Abort
            },
        }
    }
}

/// The outcome of a direct execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// The index and hash of every confirmed call
    pub executed: Vec<(usize, TxHash)>,
    /// The indices of the calls that failed
    pub failed: Vec<usize>,
    /// Whether the policy stopped the run early
    pub aborted: bool,
}

impl ExecutionReport {
    /// The index execution stopped at, if it was aborted
    pub fn aborted_at(&self) -> Option<usize> {
        self.aborted.then(|| self.failed.last().copied()).flatten()
    }
}

/// Replays batch transactions one at a time from the client's key
pub struct PlanExecutor<'a, C> {
    /// The serialized submitter
    sender: TransactionSender<'a, C>,
    /// The confirmations to wait for per call
    confirmations: u64,
}

impl<'a, C: ChainClient> PlanExecutor<'a, C> {
    /// Create an executor over the given client
    pub fn new(client: &'a C, confirmations: u64) -> Self {
        Self { sender: TransactionSender::new(client), confirmations }
    }

    /// Execute the transactions in order
    ///
    /// Every transaction is decoded before the first is sent, so a malformed
    /// batch sends nothing
    pub async fn execute(
        &self,
        transactions: &[BatchTransaction],
        policy: &mut dyn FailurePolicy,
    ) -> Result<ExecutionReport, ExportError> {
        let calls = transactions
            .iter()
            .enumerate()
            .map(|(index, tx)| decode_call(index, tx))
            .collect::<Result<Vec<_>, _>>()?;

        let mut report = ExecutionReport::default();
        for (index, call) in calls.into_iter().enumerate() {
            let to = call.to.unwrap_or_default();
            info!(index, %to, "executing transaction {}/{}", index + 1, transactions.len());

            match self.execute_one(call).await {
                Ok(hash) => report.executed.push((index, hash)),
                Err(e) => {
                    error!(index, "transaction failed: {e}");
                    report.failed.push(index);
                    if policy.on_failure(index, &e) == RetryPolicy::Abort {
                        report.aborted = true;
                        break;
                    }
                },
            }
        }

        info!(
            executed = report.executed.len(),
            failed = report.failed.len(),
            aborted = report.aborted,
            "execution finished"
        );
        Ok(report)
    }

    /// Send one call and wait for it, treating a revert as a failure
    async fn execute_one(&self, call: TxParams) -> Result<TxHash, ChainError> {
        let (hash, gas) = self.sender.submit(call, CALL_FALLBACK_GAS).await?;
        info!(%hash, gas_limit = gas.with_margin(), "transaction sent");

        let receipt = self.sender.client().wait_for_confirmations(hash, self.confirmations).await?;
        if !receipt.success {
            return Err(ChainError::Reverted(hash));
        }

        info!(%hash, block = ?receipt.block_number, gas_used = receipt.gas_used, "transaction confirmed");
        Ok(hash)
    }
}

/// Parse the serialized fields of a batch transaction
fn decode_call(index: usize, tx: &BatchTransaction) -> Result<TxParams, ExportError> {
    let malformed = |reason: String| ExportError::MalformedPlan { index, reason };

    let to = Address::from_str(&tx.to).map_err(|e| malformed(format!("invalid `to` {}: {e}", tx.to)))?;
    let value = U256::from_str(&tx.value).map_err(|e| malformed(format!("invalid `value` {}: {e}", tx.value)))?;
    let data = hex::decode(&tx.data).map_err(|e| malformed(format!("invalid `data`: {e}")))?;
    if to == Address::ZERO || data.is_empty() {
        return Err(malformed("empty `to` or `data`".to_string()));
    }

    Ok(TxParams::call(to, Bytes::from(data), value))
}
