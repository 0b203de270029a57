//! The governance system: which contracts are deployed in which wave, and
//! the calls wiring them together afterwards

use crate::{
    config::NetworkConfig,
    deploy::{ArgTemplate, ContractSpec},
    plan::WiringRule,
};

/// Name of the wiring batch
pub const WIRING_PLAN_NAME: &str =
    "Setting GovernorExecutor, GovernorGuard, and GovernorOperations addresses for SciManager, Research, and PO Contracts";

/// Description of the wiring batch
pub const WIRING_PLAN_DESCRIPTION: &str =
    "Wires the governor executor, guards, action factories and governor addresses into the deployed governance contracts";

/// Name of the governance parameter batch
pub const GOV_PARAMS_PLAN_NAME: &str = "Setting Governance Parameters for GovernorOperations and GovernorResearch";

/// Description of the governance parameter batch
pub const GOV_PARAMS_PLAN_DESCRIPTION: &str =
    "Updates governance parameters through setGovernanceParameterByAdmin";

// -------------
// | Contracts |
// -------------

/// Every contract of the governance system, by wave
///
/// Wave 0 only depends on external addresses. The governors in wave 1 need
/// the tokens and `sciManager`; the executor, guard and factories in wave 2
/// need the governors
pub fn governance_contracts(config: &NetworkConfig) -> Vec<ContractSpec> {
    let admin = || ArgTemplate::literal(config.admin);
    let uri = || ArgTemplate::literal(&config.token_uri);
    let funding_wallet = || ArgTemplate::literal(config.research_funding_wallet);
    let contract = |name: &str| ArgTemplate::contract(name);

    vec![
        // Wave 0
        ContractSpec::new("don", "Don", 0, vec![uri(), admin()]),
        ContractSpec::new("po", "Po", 0, vec![uri(), admin()]),
        ContractSpec::new("sciManager", "SciManager", 0, vec![admin(), ArgTemplate::literal(config.sci)]),
        ContractSpec::new("transactionResearch", "Transaction", 0, vec![]),
        ContractSpec::new("transactionOperations", "Transaction", 0, vec![]),
        ContractSpec::new("election", "Election", 0, vec![]),
        ContractSpec::new("impeachment", "Impeachment", 0, vec![]),
        ContractSpec::new("parameterChange", "ParameterChange", 0, vec![]),
        // Wave 1
        ContractSpec::new(
            "donation",
            "Donation",
            1,
            vec![funding_wallet(), admin(), ArgTemplate::literal(config.usdc), contract("don")],
        ),
        ContractSpec::new(
            "poToSciExchange",
            "PoToSciExchange",
            1,
            vec![admin(), ArgTemplate::literal(config.sci), contract("po")],
        ),
        ContractSpec::new(
            "governorOperations",
            "GovernorOperations",
            1,
            vec![contract("sciManager"), admin(), contract("po"), ArgTemplate::literal(config.signer)],
        ),
        ContractSpec::new(
            "governorResearch",
            "GovernorResearch",
            1,
            vec![contract("sciManager"), admin(), funding_wallet()],
        ),
        // Wave 2
        ContractSpec::new(
            "governorExecutor",
            "GovernorExecutor",
            2,
            vec![
                admin(),
                ArgTemplate::literal(config.executor_delay),
                contract("governorOperations"),
                contract("governorResearch"),
            ],
        ),
        ContractSpec::new(
            "governorGuard",
            "GovernorGuard",
            2,
            vec![admin(), contract("governorOperations"), contract("governorResearch")],
        ),
        ContractSpec::new(
            "actionCloneFactoryResearch",
            "ActionCloneFactoryResearch",
            2,
            vec![contract("governorResearch"), contract("transactionResearch")],
        ),
        ContractSpec::new(
            "actionCloneFactoryOperations",
            "ActionCloneFactoryOperations",
            2,
            vec![
                contract("governorOperations"),
                contract("transactionOperations"),
                contract("election"),
                contract("impeachment"),
                contract("parameterChange"),
            ],
        ),
    ]
}

// ----------
// | Wiring |
// ----------

/// The post-deployment calls, in execution order
///
/// A governor's executor has to be set before its guard and factory, since
/// both setters are restricted to the executor once one is set
pub fn wiring_rules() -> Vec<WiringRule> {
    vec![
        WiringRule::setter(
            "don.setDonation",
            "don",
            "setDonation(address)",
            "donation",
            "Set Donation address in DON token",
        ),
        WiringRule::setter(
            "sciManager.setGovExec",
            "sciManager",
            "setGovExec(address)",
            "governorExecutor",
            "Set GovernorExecutor for SciManager",
        ),
        WiringRule::setter(
            "governorResearch.setGovExec",
            "governorResearch",
            "setGovExec(address)",
            "governorExecutor",
            "Set GovernorExecutor for Research",
        )
        .preceding(["governorResearch.setFactory", "governorResearch.setGovGuard"]),
        WiringRule::setter(
            "governorOperations.setGovExec",
            "governorOperations",
            "setGovExec(address)",
            "governorExecutor",
            "Set GovernorExecutor for GovernorOperations",
        )
        .preceding(["governorOperations.setGovGuard", "governorOperations.setFactory"]),
        WiringRule::setter(
            "governorOperations.setGovGuard",
            "governorOperations",
            "setGovGuard(address)",
            "governorGuard",
            "Set GovernorGuard for GovernorOperations",
        ),
        WiringRule::setter(
            "governorOperations.setFactory",
            "governorOperations",
            "setFactory(address)",
            "actionCloneFactoryOperations",
            "Set ActionCloneFactory for GovernorOperations",
        ),
        WiringRule::setter(
            "governorResearch.setFactory",
            "governorResearch",
            "setFactory(address)",
            "actionCloneFactoryResearch",
            "Set ActionCloneFactory for Research",
        ),
        WiringRule::setter(
            "governorResearch.setGovGuard",
            "governorResearch",
            "setGovGuard(address)",
            "governorGuard",
            "Set GovernorGuard for Research",
        ),
        WiringRule::setter(
            "po.setGovOps",
            "po",
            "setGovOps(address)",
            "governorOperations",
            "Set GovernorOperations for PO",
        ),
        WiringRule::setter(
            "sciManager.setGovOps",
            "sciManager",
            "setGovOps(address)",
            "governorOperations",
            "Set GovernorOperations for SciManager",
        ),
        WiringRule::setter(
            "sciManager.setGovRes",
            "sciManager",
            "setGovRes(address)",
            "governorResearch",
            "Set Research for SciManager",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use alloy::primitives::{address, Address};

    use crate::{
        config::NetworkConfig,
        deploy::{validate_catalogue, WaveScheduler},
        plan::order_rules,
    };

    use super::{governance_contracts, wiring_rules};

    const ADMIN: Address = address!("96f67a852f8D3Bc05464C4F91F97aACE060e247A");

    fn config() -> NetworkConfig {
        NetworkConfig {
            rpc_url: None,
            admin: ADMIN,
            safe: None,
            sci: address!("25E0A7767d03461EaF88b47cd9853722Fe05DFD3"),
            usdc: address!("036CbD53842c5426634e7929541eC2318f3dCF7e"),
            research_funding_wallet: ADMIN,
            signer: ADMIN,
            swap_address: None,
            token_uri: "ipfs://governance".to_string(),
            executor_delay: 3600,
            governance: Vec::new(),
        }
    }

    #[test]
    fn test_catalogue_is_valid() {
        let specs = governance_contracts(&config());
        validate_catalogue(&specs).unwrap();

        let scheduler = WaveScheduler::new(specs).unwrap();
        let sizes: Vec<_> = scheduler.waves().map(|(wave, specs)| (wave, specs.len())).collect();
        assert_eq!(sizes, vec![(0, 8), (1, 4), (2, 4)]);
    }

    #[test]
    fn test_rules_only_reference_catalogue_contracts() {
        let specs = governance_contracts(&config());
        let names: HashSet<_> = specs.iter().map(|s| s.name.as_str()).collect();

        for rule in wiring_rules() {
            for name in rule.required_contracts() {
                assert!(names.contains(name), "`{}` references unknown `{name}`", rule.id);
            }
        }
    }

    #[test]
    fn test_wiring_order_matches_catalogue() {
        let rules = wiring_rules();
        let ordered: Vec<_> = order_rules(&rules).unwrap().into_iter().map(|r| r.id.clone()).collect();
        let declared: Vec<_> = rules.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ordered, declared);

        let position = |id: &str| ordered.iter().position(|r| r == id).unwrap();
        assert!(position("governorOperations.setGovExec") < position("governorOperations.setGovGuard"));
        assert!(position("governorResearch.setGovExec") < position("governorResearch.setFactory"));
    }
}
