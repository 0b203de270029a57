//! The Safe transaction builder batch document

use std::path::Path;

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{SAFE_BATCH_VERSION, SAFE_TX_BUILDER_VERSION},
    errors::ExportError,
    plan::{checksum, BatchTransaction, TransactionPlan},
    utils::{read_json, write_json},
};

use super::validate_plan;

/// A batch importable into the Safe transaction builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeBatch {
    /// The document format version
    pub version: String,
    /// The chain the batch targets
    pub chain_id: u64,
    /// Milliseconds since the Unix epoch
    pub created_at: u64,
    /// Descriptive metadata
    pub meta: SafeBatchMeta,
    /// The calls, in execution order
    pub transactions: Vec<BatchTransaction>,
    /// keccak256 of the compact JSON of `transactions`
    pub checksum: B256,
}

/// The `meta` block of a [`SafeBatch`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeBatchMeta {
    /// A short title
    pub name: String,
    /// A longer description
    pub description: String,
    /// The transaction builder version the document targets
    pub tx_builder_version: String,
    /// The multisig the batch is proposed from
    pub created_from_safe_address: String,
    /// The proposing owner, left empty
    pub created_from_owner_address: String,
}

impl SafeBatch {
    /// Whether the checksum matches the transactions
    pub fn checksum_matches(&self) -> bool {
        checksum(&self.transactions) == self.checksum
    }

    /// Load a batch from disk
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        read_json(path)
    }

    /// Write the batch to disk, pretty-printed
    pub fn write(&self, path: &Path) -> Result<(), ExportError> {
        write_json(path, self)
    }
}

/// Render a plan as a Safe batch
///
/// Records keep only `to`, `value` and `data`, descriptions are dropped
pub fn render_safe_batch(plan: &TransactionPlan) -> Result<SafeBatch, ExportError> {
    validate_plan(plan)?;
    let metadata = plan.metadata();

    Ok(SafeBatch {
        version: SAFE_BATCH_VERSION.to_string(),
        chain_id: metadata.chain_id,
        created_at: metadata.created_at,
        meta: SafeBatchMeta {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            tx_builder_version: SAFE_TX_BUILDER_VERSION.to_string(),
            created_from_safe_address: metadata.safe_address.to_checksum(None),
            created_from_owner_address: String::new(),
        },
        transactions: plan.batch_transactions(),
        checksum: plan.checksum(),
    })
}
