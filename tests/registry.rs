//! Contract registry integration tests
//!
//! Space assignment must hold steady across process restarts, initializer
//! failures, and registration order churn.

mod common;

use chainhost::testing::MemoryLedger;
use chainhost::{Contract, Error, TableId, FIRST_CONTRACT_SPACE};
use common::TestNode;
use std::collections::BTreeSet;

#[test]
fn space_assignment_is_idempotent_across_restarts() {
    let node = TestNode::new();
    node.install_simple_contract("polls", &[0, 1]);
    node.install_simple_contract("tally", &[0]);
    let polls_space = node.node.registry().space_id("polls").unwrap();
    let tally_space = node.node.registry().space_id("tally").unwrap();

    // Restart: same registry file, fresh process state.
    let (ledger, reopened) = node.restart_with_fresh_ledger();
    // Register in the opposite order; the persisted records win.
    let ok = reopened
        .install_contract(Contract::new("tally", |l: &MemoryLedger, space| {
            l.create_table(space, TableId::new(0));
            true
        }))
        .unwrap();
    assert!(ok);
    let ok = reopened
        .install_contract(Contract::new("polls", |l: &MemoryLedger, space| {
            l.create_table(space, TableId::new(0));
            true
        }))
        .unwrap();
    assert!(ok);

    assert_eq!(reopened.registry().space_id("polls").unwrap(), polls_space);
    assert_eq!(reopened.registry().space_id("tally").unwrap(), tally_space);
    drop(ledger);
}

#[test]
fn spaces_are_pairwise_distinct_and_sequential() {
    let node = TestNode::new();
    let names = ["a", "b", "c", "d", "e"];
    for name in names {
        node.install_simple_contract(name, &[0]);
    }

    let loaded = node.node.registry().loaded_contracts();
    assert_eq!(loaded.len(), names.len());

    let spaces: BTreeSet<u8> = loaded.keys().map(|s| s.value()).collect();
    assert_eq!(spaces.len(), names.len());
    let expected: BTreeSet<u8> = (0..names.len() as u8)
        .map(|i| FIRST_CONTRACT_SPACE.value() + i)
        .collect();
    assert_eq!(spaces, expected);
}

#[test]
fn failed_contract_is_not_live_but_keeps_its_space() {
    let node = TestNode::new();

    let ok = node
        .node
        .install_contract(Contract::new("flaky", |_: &MemoryLedger, _| false))
        .unwrap();
    assert!(!ok);
    assert_eq!(node.node.observed_contract_count(), 0);
    assert!(matches!(
        node.node.registry().space_id("flaky"),
        Err(Error::UnknownContract(_))
    ));

    // A later contract gets the next slot, not the reserved one.
    node.install_simple_contract("solid", &[0]);
    assert_eq!(
        node.node.registry().space_id("solid").unwrap().value(),
        FIRST_CONTRACT_SPACE.value() + 1
    );

    // The failed name retries into its original reservation.
    let ok = node
        .node
        .install_contract(Contract::new("flaky", |l: &MemoryLedger, space| {
            l.create_table(space, TableId::new(0));
            true
        }))
        .unwrap();
    assert!(ok);
    assert_eq!(
        node.node.registry().space_id("flaky").unwrap(),
        FIRST_CONTRACT_SPACE
    );
}

#[test]
fn reserved_space_survives_restart_even_after_failure() {
    let node = TestNode::new();
    node.node
        .install_contract(Contract::new("flaky", |_: &MemoryLedger, _| false))
        .unwrap();
    node.install_simple_contract("solid", &[0]);

    let (_ledger, reopened) = node.restart_with_fresh_ledger();
    let ok = reopened
        .install_contract(Contract::new("flaky", |l: &MemoryLedger, space| {
            l.create_table(space, TableId::new(0));
            true
        }))
        .unwrap();
    assert!(ok);
    assert_eq!(
        reopened.registry().space_id("flaky").unwrap(),
        FIRST_CONTRACT_SPACE
    );
}

#[test]
fn initializer_sees_its_assigned_space() {
    let node = TestNode::new();
    node.install_simple_contract("first", &[0]);

    let seen = std::sync::Arc::new(parking_lot::Mutex::new(None));
    {
        let seen = seen.clone();
        node.node
            .install_contract(Contract::new("second", move |_: &MemoryLedger, space| {
                *seen.lock() = Some(space);
                true
            }))
            .unwrap();
    }
    assert_eq!(
        *seen.lock(),
        Some(node.node.registry().space_id("second").unwrap())
    );
}
