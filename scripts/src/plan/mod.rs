//! Transaction plans: the ordered, checksummed calls that configure a set of
//! deployed contracts

use alloy::primitives::{hex, keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::errors::EncodingError;

mod builder;
mod gov_params;

pub use builder::{order_rules, TransactionPlanBuilder};
pub use gov_params::{governance_rules, GovernanceChange};

/// One argument of a [`WiringRule`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    /// The registry address of a contract
    Contract(String),
    /// A literal, coerced against the parameter type
    Value(String),
}

/// A configuration call to make once the contracts it names are deployed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiringRule {
    /// A unique identifier
    pub id: String,
    /// The registry name of the contract called
    pub contract: String,
    /// The function signature, e.g. `setGovExec(address)`
    pub signature: String,
    /// The call arguments
    pub args: Vec<CallArg>,
    /// A human-readable description
    pub description: String,
    /// Rules this rule must be ordered before
    pub must_precede: Vec<String>,
}

impl WiringRule {
    /// Create a rule with no ordering constraints
    pub fn new(
        id: impl Into<String>,
        contract: impl Into<String>,
        signature: impl Into<String>,
        args: Vec<CallArg>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            contract: contract.into(),
            signature: signature.into(),
            args,
            description: description.into(),
            must_precede: Vec::new(),
        }
    }

    /// A rule calling `contract.signature(target)`, the shape of every
    /// address setter
    pub fn setter(
        id: impl Into<String>,
        contract: impl Into<String>,
        signature: impl Into<String>,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(id, contract, signature, vec![CallArg::Contract(target.into())], description)
    }

    /// Require this rule to come before each of `ids`
    pub fn preceding<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.must_precede.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Every registry name the rule needs resolved: the callee first, then the
    /// contract arguments
    pub fn required_contracts(&self) -> impl Iterator<Item = &str> {
        let targets = self.args.iter().filter_map(|arg| match arg {
            CallArg::Contract(name) => Some(name.as_str()),
            CallArg::Value(_) => None,
        });
        std::iter::once(self.contract.as_str()).chain(targets)
    }
}

/// One call of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The contract called
    pub to: Address,
    /// The value sent
    pub value: U256,
    /// The call-data
    pub data: Bytes,
    /// A human-readable description
    pub description: String,
}

/// The `{to, value, data}` view of a record, as serialized into batch
/// documents and hashed into the checksum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTransaction {
    /// The checksummed recipient
    pub to: String,
    /// The value in wei, as a decimal string
    pub value: String,
    /// The `0x`-prefixed call-data
    pub data: String,
}

impl From<&TransactionRecord> for BatchTransaction {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            to: record.to.to_checksum(None),
            value: record.value.to_string(),
            data: hex::encode_prefixed(&record.data),
        }
    }
}

/// The checksum of a transaction list: keccak256 of its compact JSON
/// serialization
pub fn checksum(transactions: &[BatchTransaction]) -> B256 {
    // Serializing plain strings cannot fail
    let json = serde_json::to_string(transactions).unwrap_or_default();
    keccak256(json.as_bytes())
}

/// Why a rule produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A contract the rule needs is absent from the registry
    MissingAddress(String),
    /// The call could not be encoded
    Encoding(EncodingError),
}

/// A rule left out of a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    /// The rule id
    pub rule: String,
    /// Why it was skipped
    pub reason: SkipReason,
}

/// Descriptive metadata carried into the exported documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanMetadata {
    /// The target chain
    pub chain_id: u64,
    /// Milliseconds since the Unix epoch
    pub created_at: u64,
    /// A short title
    pub name: String,
    /// A longer description
    pub description: String,
    /// The multisig the batch is proposed from
    pub safe_address: Address,
}

/// An ordered, checksummed list of calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPlan {
    /// Run metadata
    metadata: PlanMetadata,
    /// The calls, in execution order
    records: Vec<TransactionRecord>,
    /// The rules that produced no record
    skipped: Vec<SkippedRule>,
    /// The checksum over `records`
    checksum: B256,
}

impl TransactionPlan {
    /// Assemble a plan, computing its checksum
    pub fn new(metadata: PlanMetadata, records: Vec<TransactionRecord>, skipped: Vec<SkippedRule>) -> Self {
        let transactions: Vec<BatchTransaction> = records.iter().map(BatchTransaction::from).collect();
        let checksum = checksum(&transactions);
        Self { metadata, records, skipped, checksum }
    }

    /// The run metadata
    pub fn metadata(&self) -> &PlanMetadata {
        &self.metadata
    }

    /// The calls, in execution order
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    /// The rules that produced no record
    pub fn skipped(&self) -> &[SkippedRule] {
        &self.skipped
    }

    /// The checksum over the records
    pub fn checksum(&self) -> B256 {
        self.checksum
    }

    /// The `{to, value, data}` view of the records
    pub fn batch_transactions(&self) -> Vec<BatchTransaction> {
        self.records.iter().map(BatchTransaction::from).collect()
    }

    /// Whether the plan has no calls
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, keccak256, Bytes, U256};

    use super::{BatchTransaction, CallArg, TransactionRecord, WiringRule};

    #[test]
    fn test_batch_transaction_matches_safe_format() {
        let record = TransactionRecord {
            to: address!("96f67a852f8d3bc05464c4f91f97aace060e247a"),
            value: U256::ZERO,
            data: Bytes::from(vec![0xAB, 0xCD]),
            description: "ignored".to_string(),
        };
        let tx = BatchTransaction::from(&record);
        let json = serde_json::to_string(&[tx.clone()]).unwrap();

        assert_eq!(
            json,
            r#"[{"to":"0x96f67a852f8D3Bc05464C4F91F97aACE060e247A","value":"0","data":"0xabcd"}]"#
        );
        assert_eq!(super::checksum(&[tx]), keccak256(json.as_bytes()));
    }

    #[test]
    fn test_required_contracts_lists_callee_first() {
        let rule = WiringRule::new(
            "r",
            "governorOperations",
            "f(address,uint256,address)",
            vec![
                CallArg::Contract("a".to_string()),
                CallArg::Value("1".to_string()),
                CallArg::Contract("b".to_string()),
            ],
            "",
        );
        assert_eq!(rule.required_contracts().collect::<Vec<_>>(), vec!["governorOperations", "a", "b"]);
    }
}
