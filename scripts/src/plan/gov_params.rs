//! Governance parameter change plans
//!
//! A governor requires `voteLockTime >= proposalLifetime` after every call,
//! so when both change the order of the two setters matters. The ordering is
//! derived from the current and target values, and the resulting sequence is
//! simulated before the plan is accepted

use std::collections::HashMap;

use alloy::primitives::{hex, U256};
use tracing::debug;

use crate::{
    config::GovernanceParamsConfig,
    constants::{PROPOSAL_LIFETIME_PARAM, SET_GOVERNANCE_PARAMETER_SIGNATURE, VOTE_LOCK_TIME_PARAM},
    encoder::string_to_bytes32,
    errors::PlanError,
};

use super::{order_rules, CallArg, WiringRule};

/// The config field naming the governor of a change set
const CONTRACT_FIELD: &str = "contract";

/// One parameter assignment on one governor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceChange {
    /// The id of the rule making the call
    pub rule_id: String,
    /// The governor's registry name
    pub contract: String,
    /// The parameter name
    pub param: String,
    /// The new value
    pub value: U256,
}

impl GovernanceChange {
    /// The setter call for this change
    fn to_rule(&self) -> Result<WiringRule, PlanError> {
        let key = string_to_bytes32(&self.param).map_err(|e| self.invalid(e.to_string()))?;

        Ok(WiringRule::new(
            self.rule_id.clone(),
            self.contract.clone(),
            SET_GOVERNANCE_PARAMETER_SIGNATURE,
            vec![CallArg::Value(hex::encode_prefixed(key)), CallArg::Value(self.value.to_string())],
            format!("Set {} to {} on {}", self.param, self.value, self.contract),
        ))
    }

    /// An error about this change
    fn invalid(&self, reason: String) -> PlanError {
        PlanError::InvalidParameter { contract: self.contract.clone(), param: self.param.clone(), reason }
    }
}

/// The setter rules for a list of change sets, with the ordering the vote
/// lock invariant requires
///
/// Fails if no ordering keeps the invariant at every intermediate state
pub fn governance_rules(change_sets: &[GovernanceParamsConfig]) -> Result<Vec<WiringRule>, PlanError> {
    let mut rules = Vec::new();
    let mut changes = Vec::new();
    let mut initial = HashMap::new();

    for set in change_sets {
        let invalid = |param: &str, reason: String| PlanError::InvalidParameter {
            contract: set.contract.clone(),
            param: param.to_string(),
            reason,
        };
        // One set per governor, a second would replace the current timings
        // the simulation starts from
        if initial.contains_key(&set.contract) {
            return Err(invalid(CONTRACT_FIELD, "governor has more than one change set".to_string()));
        }

        let lifetime = set.current.proposal_lifetime().map_err(|e| invalid(PROPOSAL_LIFETIME_PARAM, e.to_string()))?;
        let lock_time = set.current.vote_lock_time().map_err(|e| invalid(VOTE_LOCK_TIME_PARAM, e.to_string()))?;
        initial.insert(set.contract.clone(), Timings { lifetime, lock_time });

        let set_changes = set
            .params
            .iter()
            .map(|p| {
                let value = p.value().map_err(|e| invalid(&p.name, e.to_string()))?;
                Ok(GovernanceChange {
                    rule_id: format!("{}.{}", set.contract, p.name),
                    contract: set.contract.clone(),
                    param: p.name.clone(),
                    value,
                })
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        let mut set_rules = set_changes.iter().map(GovernanceChange::to_rule).collect::<Result<Vec<_>, _>>()?;
        annotate_timing_order(&set_changes, &mut set_rules, Timings { lifetime, lock_time });

        rules.extend(set_rules);
        changes.extend(set_changes);
    }

    check_invariant(&rules, &changes, initial)?;
    Ok(rules)
}

/// The two parameters bound by the invariant
#[derive(Debug, Clone, Copy)]
struct Timings {
    /// The proposal lifetime
    lifetime: U256,
    /// The vote lock time
    lock_time: U256,
}

/// Add the `must_precede` edge between the two timing setters of one governor
///
/// Raising the lifetime past the current lock time needs the lock time raised
/// first. Lowering the lock time below the current lifetime needs the
/// lifetime lowered first
fn annotate_timing_order(changes: &[GovernanceChange], rules: &mut [WiringRule], current: Timings) {
    let position = |param: &str| changes.iter().position(|c| c.param == param);
    let (Some(lifetime_idx), Some(lock_idx)) = (position(PROPOSAL_LIFETIME_PARAM), position(VOTE_LOCK_TIME_PARAM))
    else {
        return;
    };

    let new_lifetime = changes[lifetime_idx].value;
    let new_lock_time = changes[lock_idx].value;

    if new_lifetime > current.lock_time {
        let later = rules[lifetime_idx].id.clone();
        rules[lock_idx].must_precede.push(later);
    } else if new_lock_time < current.lifetime {
        let later = rules[lock_idx].id.clone();
        rules[lifetime_idx].must_precede.push(later);
    }
}

/// Replay the ordered calls and reject any state with `lock_time < lifetime`
fn check_invariant(
    rules: &[WiringRule],
    changes: &[GovernanceChange],
    mut state: HashMap<String, Timings>,
) -> Result<(), PlanError> {
    let by_rule: HashMap<&str, &GovernanceChange> = changes.iter().map(|c| (c.rule_id.as_str(), c)).collect();

    for rule in order_rules(rules)? {
        let Some(change) = by_rule.get(rule.id.as_str()) else {
            continue;
        };
        let Some(timings) = state.get_mut(&change.contract) else {
            continue;
        };

        match change.param.as_str() {
            PROPOSAL_LIFETIME_PARAM => timings.lifetime = change.value,
            VOTE_LOCK_TIME_PARAM => timings.lock_time = change.value,
            _ => continue,
        }

        if timings.lock_time < timings.lifetime {
            return Err(PlanError::Invariant(format!(
                "after `{}`, {} has {VOTE_LOCK_TIME_PARAM} {} below {PROPOSAL_LIFETIME_PARAM} {}",
                rule.id, change.contract, timings.lock_time, timings.lifetime
            )));
        }
        debug!(rule = %rule.id, lifetime = %timings.lifetime, lock_time = %timings.lock_time, "timing state ok");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        config::{CurrentTimings, GovernanceParamsConfig, ParameterSetting},
        errors::PlanError,
        plan::order_rules,
    };

    use super::governance_rules;

    const DAY: u64 = 86_400;

    fn change_set(current: (u64, u64), params: &[(&str, u64)]) -> GovernanceParamsConfig {
        GovernanceParamsConfig {
            contract: "governorOperations".to_string(),
            current: CurrentTimings {
                proposal_lifetime: current.0.to_string(),
                vote_lock_time: current.1.to_string(),
            },
            params: params
                .iter()
                .map(|(name, value)| ParameterSetting { name: name.to_string(), value: value.to_string() })
                .collect(),
        }
    }

    fn ordered_params(set: GovernanceParamsConfig) -> Result<Vec<String>, PlanError> {
        let rules = governance_rules(&[set])?;
        Ok(order_rules(&rules)?.iter().map(|r| r.id.trim_start_matches("governorOperations.").to_string()).collect())
    }

    #[test]
    fn test_raising_lifetime_sets_lock_time_first() {
        // Lifetime 7d -> 10d passes the current 8d lock time
        let params = [("quorum", 1), ("proposalLifetime", 10 * DAY), ("voteLockTime", 11 * DAY)];
        let set = change_set((7 * DAY, 8 * DAY), &params);
        assert_eq!(ordered_params(set).unwrap(), vec!["quorum", "voteLockTime", "proposalLifetime"]);
    }

    #[test]
    fn test_lowering_lock_time_sets_lifetime_first() {
        // Lock time 8d -> 3d drops under the current 7d lifetime
        let set = change_set((7 * DAY, 8 * DAY), &[("voteLockTime", 3 * DAY), ("proposalLifetime", 2 * DAY)]);
        assert_eq!(ordered_params(set).unwrap(), vec!["proposalLifetime", "voteLockTime"]);
    }

    #[test]
    fn test_unconstrained_changes_keep_catalogue_order() {
        let set = change_set((7 * DAY, 8 * DAY), &[("voteLockTime", 8 * DAY), ("proposalLifetime", 7 * DAY)]);
        assert_eq!(ordered_params(set).unwrap(), vec!["voteLockTime", "proposalLifetime"]);
    }

    #[test]
    fn test_unsatisfiable_targets_rejected() {
        let set = change_set((7 * DAY, 8 * DAY), &[("voteLockTime", 5 * DAY), ("proposalLifetime", 6 * DAY)]);
        assert!(matches!(governance_rules(&[set]), Err(PlanError::Invariant(_))));

        // A lone lifetime change past the current lock time has no valid order
        let set = change_set((7 * DAY, 8 * DAY), &[("proposalLifetime", 9 * DAY)]);
        assert!(matches!(governance_rules(&[set]), Err(PlanError::Invariant(_))));
    }

    #[test]
    fn test_second_change_set_for_a_governor_rejected() {
        let first = change_set((7 * DAY, 8 * DAY), &[("quorum", 1)]);
        let second = change_set((DAY, 2 * DAY), &[("proposalLifetime", DAY)]);

        let err = governance_rules(&[first, second]).unwrap_err();
        assert!(matches!(
            err,
            PlanError::InvalidParameter { contract, param, .. }
                if contract == "governorOperations" && param == "contract"
        ));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let set = change_set((7 * DAY, 8 * DAY), &[("aParameterNameFarTooLongForBytes32", 1)]);
        assert!(matches!(governance_rules(&[set]), Err(PlanError::InvalidParameter { .. })));
    }
}
