//! The standalone script replaying a plan from a single externally owned
//! account

use alloy::primitives::hex;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        CALL_FALLBACK_GAS, EOA_PRIVATE_KEY_ENV_VAR, EOA_RPC_URL_ENV_VAR, GAS_MARGIN_PERCENT,
        NUM_CALL_CONFIRMATIONS,
    },
    errors::ExportError,
    plan::{BatchTransaction, TransactionPlan},
};

use super::validate_plan;

/// The script template, with `{{NAME}}` style placeholders
const TEMPLATE: &str = include_str!("../../templates/execute_transactions.js");

/// The line opening the embedded transaction list
const BEGIN_MARKER: &str = "// BEGIN TRANSACTIONS";
/// The line closing the embedded transaction list
const END_MARKER: &str = "// END TRANSACTIONS";
/// The declaration the list is assigned to
const DECLARATION: &str = "const TRANSACTIONS = ";

/// A call as embedded in the script: the batch fields plus a description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTransaction {
    /// The `{to, value, data}` fields
    #[serde(flatten)]
    pub transaction: BatchTransaction,
    /// A human-readable description
    pub description: String,
}

/// Render a plan as a self-contained Node.js script
pub fn render_eoa_script(plan: &TransactionPlan) -> Result<String, ExportError> {
    validate_plan(plan)?;

    let transactions: Vec<ScriptTransaction> = plan
        .records()
        .iter()
        .map(|r| ScriptTransaction { transaction: r.into(), description: r.description.clone() })
        .collect();
    let embedded = serde_json::to_string_pretty(&transactions).map_err(|e| ExportError::Serde(e.to_string()))?;

    let metadata = plan.metadata();
    let replacements = [
        ("{{NAME}}", metadata.name.replace('\n', " ")),
        ("{{CHAIN_ID}}", metadata.chain_id.to_string()),
        ("{{CHECKSUM}}", hex::encode_prefixed(plan.checksum())),
        ("{{FALLBACK_GAS}}", CALL_FALLBACK_GAS.to_string()),
        ("{{GAS_MARGIN_PERCENT}}", GAS_MARGIN_PERCENT.to_string()),
        ("{{CONFIRMATIONS}}", NUM_CALL_CONFIRMATIONS.to_string()),
        ("{{PRIVATE_KEY_ENV}}", EOA_PRIVATE_KEY_ENV_VAR.to_string()),
        ("{{RPC_URL_ENV}}", EOA_RPC_URL_ENV_VAR.to_string()),
        // Last, so placeholder-like text inside descriptions is left alone
        ("{{TRANSACTIONS}}", embedded),
    ];

    Ok(replacements.iter().fold(TEMPLATE.to_string(), |script, (token, value)| script.replace(token, value)))
}

/// Parse the transaction list back out of a rendered script
///
/// The list is read as one JSON value from its declaration, so marker text
/// inside a description cannot end it early
pub fn extract_embedded_transactions(script: &str) -> Result<Vec<ScriptTransaction>, ExportError> {
    let malformed = |reason: &str| ExportError::Serde(format!("malformed EOA script: {reason}"));

    let start = script.find(BEGIN_MARKER).ok_or_else(|| malformed("missing transaction list"))? + BEGIN_MARKER.len();
    let body = script[start..]
        .trim_start()
        .strip_prefix(DECLARATION)
        .ok_or_else(|| malformed("unexpected transaction declaration"))?;

    let mut values = serde_json::Deserializer::from_str(body).into_iter::<Vec<ScriptTransaction>>();
    let transactions = values
        .next()
        .ok_or_else(|| malformed("missing transaction list"))?
        .map_err(|e| malformed(&e.to_string()))?;

    let terminated = body[values.byte_offset()..]
        .trim_start()
        .strip_prefix(';')
        .is_some_and(|rest| rest.trim_start().starts_with(END_MARKER));
    if !terminated {
        return Err(malformed("unterminated transaction list"));
    }

    Ok(transactions)
}
