//! Realizing wiring rules against an address registry

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use alloy::primitives::U256;
use itertools::Itertools;
use tracing::{info, warn};

use crate::{encoder::encode_call_str, errors::PlanError, registry::AddressRegistry};

use super::{CallArg, PlanMetadata, SkipReason, SkippedRule, TransactionPlan, TransactionRecord, WiringRule};

/// Order rules so each comes before every rule in its `must_precede` list
///
/// Among rules free to go next, the one declared first goes first, so a
/// catalogue without annotations keeps its declared order
pub fn order_rules(rules: &[WiringRule]) -> Result<Vec<&WiringRule>, PlanError> {
    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(rules.len());
    for (i, rule) in rules.iter().enumerate() {
        if index_of.insert(rule.id.as_str(), i).is_some() {
            return Err(PlanError::DuplicateRule(rule.id.clone()));
        }
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); rules.len()];
    let mut in_degree = vec![0usize; rules.len()];
    for (i, rule) in rules.iter().enumerate() {
        for later in &rule.must_precede {
            let j = *index_of
                .get(later.as_str())
                .ok_or_else(|| PlanError::UnknownRule { rule: rule.id.clone(), reference: later.clone() })?;
            successors[i].push(j);
            in_degree[j] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> =
        in_degree.iter().positions(|d| *d == 0).map(Reverse).collect();
    let mut ordered = Vec::with_capacity(rules.len());
    while let Some(Reverse(i)) = ready.pop() {
        ordered.push(&rules[i]);
        for &j in &successors[i] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.push(Reverse(j));
            }
        }
    }

    if ordered.len() < rules.len() {
        let cycle = in_degree.iter().positions(|d| *d > 0).map(|i| rules[i].id.clone()).collect();
        return Err(PlanError::OrderingCycle(cycle));
    }

    Ok(ordered)
}

/// Builds transaction plans from a registry of deployed contracts
pub struct TransactionPlanBuilder<'a> {
    /// The addresses resolved by the deployment run
    registry: &'a AddressRegistry,
}

impl<'a> TransactionPlanBuilder<'a> {
    /// Create a builder over a registry
    pub fn new(registry: &'a AddressRegistry) -> Self {
        Self { registry }
    }

    /// Order the rules and realize each into a record
    ///
    /// A rule whose contracts are absent, or whose call cannot be encoded, is
    /// skipped with a warning rather than failing the plan
    pub fn build(&self, rules: &[WiringRule], metadata: PlanMetadata) -> Result<TransactionPlan, PlanError> {
        let mut records = Vec::with_capacity(rules.len());
        let mut skipped = Vec::new();

        for rule in order_rules(rules)? {
            match self.realize(rule) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    match &reason {
                        SkipReason::MissingAddress(name) => {
                            warn!(rule = %rule.id, "skipping rule, `{name}` is not deployed")
                        },
                        SkipReason::Encoding(e) => warn!(rule = %rule.id, "skipping rule: {e}"),
                    }
                    skipped.push(SkippedRule { rule: rule.id.clone(), reason });
                },
            }
        }

        let plan = TransactionPlan::new(metadata, records, skipped);
        info!(
            records = plan.records().len(),
            skipped = plan.skipped().len(),
            checksum = %plan.checksum(),
            "built transaction plan"
        );
        Ok(plan)
    }

    /// Resolve and encode one rule
    fn realize(&self, rule: &WiringRule) -> Result<TransactionRecord, SkipReason> {
        if let Some(missing) = rule.required_contracts().find(|name| !self.registry.is_resolved(name)) {
            return Err(SkipReason::MissingAddress(missing.to_string()));
        }

        let to = self.registry.get(&rule.contract).ok_or_else(|| SkipReason::MissingAddress(rule.contract.clone()))?;
        let args = rule
            .args
            .iter()
            .map(|arg| match arg {
                CallArg::Contract(name) => self
                    .registry
                    .get(name)
                    .map(|addr| addr.to_checksum(None))
                    .ok_or_else(|| SkipReason::MissingAddress(name.clone())),
                CallArg::Value(literal) => Ok(literal.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let data = encode_call_str(&rule.signature, &arg_refs).map_err(SkipReason::Encoding)?;
        Ok(TransactionRecord { to, value: U256::ZERO, data, description: rule.description.clone() })
    }
}
