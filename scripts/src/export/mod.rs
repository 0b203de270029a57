//! Rendering a transaction plan as a Safe batch document and as an EOA
//! execution script, and checking the two against each other

use alloy::primitives::Address;

use crate::{
    errors::{ExportError, ScriptError},
    plan::{BatchTransaction, TransactionPlan},
};

mod eoa_script;
mod safe;

pub use eoa_script::{extract_embedded_transactions, render_eoa_script, ScriptTransaction};
pub use safe::{render_safe_batch, SafeBatch, SafeBatchMeta};

/// Reject plans carrying a record no executor could send
pub fn validate_plan(plan: &TransactionPlan) -> Result<(), ExportError> {
    for (index, record) in plan.records().iter().enumerate() {
        if record.to == Address::ZERO {
            return Err(ExportError::MalformedPlan { index, reason: "empty `to`".to_string() });
        }
        if record.data.is_empty() {
            return Err(ExportError::MalformedPlan { index, reason: "empty `data`".to_string() });
        }
    }

    Ok(())
}

/// Check that a Safe batch and an EOA script carry the same calls in the same
/// order, and that the batch checksum matches its calls
pub fn check_consistency(batch: &SafeBatch, script: &str) -> Result<(), ScriptError> {
    if !batch.checksum_matches() {
        return Err(ScriptError::ArtifactDrift(format!(
            "Safe batch checksum {} does not match its transactions",
            batch.checksum
        )));
    }

    let embedded: Vec<BatchTransaction> =
        extract_embedded_transactions(script)?.into_iter().map(|t| t.transaction).collect();
    if embedded.len() != batch.transactions.len() {
        return Err(ScriptError::ArtifactDrift(format!(
            "Safe batch has {} transactions, EOA script has {}",
            batch.transactions.len(),
            embedded.len()
        )));
    }

    for (index, (safe_tx, script_tx)) in batch.transactions.iter().zip(&embedded).enumerate() {
        if !same_call(safe_tx, script_tx) {
            return Err(ScriptError::ArtifactDrift(format!("transaction {index} differs between the artifacts")));
        }
    }

    Ok(())
}

/// Whether two serialized calls are the same, ignoring hex case
fn same_call(a: &BatchTransaction, b: &BatchTransaction) -> bool {
    a.to.eq_ignore_ascii_case(&b.to) && a.value == b.value && a.data.eq_ignore_ascii_case(&b.data)
}
