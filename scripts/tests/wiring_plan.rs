//! End-to-end checks of the wiring batch: registry in, both artifacts out

use alloy::primitives::{address, Address, U256};
use governance_scripts::{
    catalogue::{wiring_rules, WIRING_PLAN_NAME},
    encoder::encode_call_str,
    export::{check_consistency, extract_embedded_transactions, render_eoa_script, render_safe_batch, SafeBatch},
    plan::{PlanMetadata, SkipReason, TransactionPlanBuilder},
    registry::AddressRegistry,
};

const SAFE: Address = address!("96f67a852f8D3Bc05464C4F91F97aACE060e247A");

/// Every contract the wiring rules touch, at distinct addresses
const DEPLOYED: [(&str, Address); 11] = [
    ("don", address!("0000000000000000000000000000000000000001")),
    ("donation", address!("0000000000000000000000000000000000000002")),
    ("po", address!("0000000000000000000000000000000000000003")),
    ("sciManager", address!("0000000000000000000000000000000000000004")),
    ("governorOperations", address!("0000000000000000000000000000000000000005")),
    ("governorResearch", address!("0000000000000000000000000000000000000006")),
    ("governorExecutor", address!("0000000000000000000000000000000000000007")),
    ("governorGuard", address!("0000000000000000000000000000000000000008")),
    ("actionCloneFactoryResearch", address!("0000000000000000000000000000000000000009")),
    ("actionCloneFactoryOperations", address!("000000000000000000000000000000000000000a")),
    ("poToSciExchange", address!("000000000000000000000000000000000000000b")),
];

fn registry(without: &[&str]) -> AddressRegistry {
    let mut registry = AddressRegistry::new();
    for (name, address) in DEPLOYED {
        let address = (!without.contains(&name)).then_some(address);
        registry.set(name, address);
    }
    registry
}

fn address_of(name: &str) -> Address {
    DEPLOYED.iter().find(|(n, _)| *n == name).map(|(_, a)| *a).unwrap()
}

fn metadata() -> PlanMetadata {
    PlanMetadata {
        chain_id: 84532,
        created_at: 1_700_000_000_000,
        name: WIRING_PLAN_NAME.to_string(),
        description: "wiring".to_string(),
        safe_address: SAFE,
    }
}

#[test]
fn test_full_registry_wires_every_rule_in_order() {
    let registry = registry(&[]);
    let plan = TransactionPlanBuilder::new(&registry).build(&wiring_rules(), metadata()).unwrap();

    assert_eq!(plan.records().len(), 11);
    assert!(plan.skipped().is_empty());

    let descriptions: Vec<_> = plan.records().iter().map(|r| r.description.as_str()).collect();
    assert_eq!(descriptions[0], "Set Donation address in DON token");
    assert_eq!(descriptions[1], "Set GovernorExecutor for SciManager");
    assert_eq!(descriptions[10], "Set Research for SciManager");

    // The executor is set on each governor before its guard and factory
    let position = |d: &str| descriptions.iter().position(|x| *x == d).unwrap();
    let executor_set = position("Set GovernorExecutor for GovernorOperations");
    assert!(executor_set < position("Set GovernorGuard for GovernorOperations"));
    assert!(position("Set GovernorExecutor for Research") < position("Set ActionCloneFactory for Research"));

    let exec = &plan.records()[1];
    assert_eq!(exec.to, address_of("sciManager"));
    assert_eq!(exec.value, U256::ZERO);
    let expected = encode_call_str("setGovExec(address)", &["0x0000000000000000000000000000000000000007"]).unwrap();
    assert_eq!(exec.data, expected);
}

#[test]
fn test_missing_contracts_skip_their_rules() {
    let registry = registry(&["governorGuard"]);
    let plan = TransactionPlanBuilder::new(&registry).build(&wiring_rules(), metadata()).unwrap();

    assert_eq!(plan.records().len(), 9);
    assert_eq!(plan.skipped().len(), 2);
    for skipped in plan.skipped() {
        assert!(skipped.rule.ends_with("setGovGuard"));
        assert_eq!(skipped.reason, SkipReason::MissingAddress("governorGuard".to_string()));
    }
}

#[test]
fn test_artifacts_agree_and_survive_disk() {
    let registry = registry(&[]);
    let plan = TransactionPlanBuilder::new(&registry).build(&wiring_rules(), metadata()).unwrap();

    let batch = render_safe_batch(&plan).unwrap();
    let script = render_eoa_script(&plan).unwrap();
    check_consistency(&batch, &script).unwrap();

    let embedded = extract_embedded_transactions(&script).unwrap();
    for ((record, batch_tx), script_tx) in plan.records().iter().zip(&batch.transactions).zip(&embedded) {
        assert_eq!(batch_tx, &script_tx.transaction);
        assert_eq!(script_tx.description, record.description);
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("safeBatchTransaction.json");
    batch.write(&path).unwrap();
    let loaded = SafeBatch::load(&path).unwrap();
    assert!(loaded.checksum_matches());
    assert_eq!(loaded.checksum, plan.checksum());
    check_consistency(&loaded, &script).unwrap();
}

#[test]
fn test_checksum_tracks_registry_contents() {
    let full = TransactionPlanBuilder::new(&registry(&[])).build(&wiring_rules(), metadata()).unwrap();
    let again = TransactionPlanBuilder::new(&registry(&[])).build(&wiring_rules(), metadata()).unwrap();
    let partial = TransactionPlanBuilder::new(&registry(&["donation"])).build(&wiring_rules(), metadata()).unwrap();

    assert_eq!(full.checksum(), again.checksum());
    assert_ne!(full.checksum(), partial.checksum());

    // A batch from one registry does not match a script from another
    let batch = render_safe_batch(&full).unwrap();
    let script = render_eoa_script(&partial).unwrap();
    assert!(check_consistency(&batch, &script).is_err());
}
