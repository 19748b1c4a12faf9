//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from any top-level test file.

#![allow(dead_code)]

use chainhost::testing::MemoryLedger;
use chainhost::{
    Contract, ContractNode, ObjectChange, ObjectUpdate, ObservationHandle, SyncDelegate, TableId,
    Value,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;

/// A node over an in-memory ledger with a temp-dir registry store.
pub struct TestNode {
    pub dir: TempDir,
    pub ledger: Arc<MemoryLedger>,
    pub node: ContractNode<MemoryLedger>,
}

impl TestNode {
    /// Node over an empty chain.
    pub fn new() -> Self {
        Self::with_blocks(0)
    }

    /// Node over a generated chain `blocks` tall.
    pub fn with_blocks(blocks: u32) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Arc::new(MemoryLedger::with_blocks(blocks));
        let node = ContractNode::open(dir.path().join("contracts.reg"), ledger.clone())
            .expect("open node");
        TestNode { dir, ledger, node }
    }

    /// Re-open the node against the same registry file and a fresh ledger,
    /// as after a process restart with the chain database wiped.
    pub fn restart_with_fresh_ledger(&self) -> (Arc<MemoryLedger>, ContractNode<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new());
        let node = ContractNode::open(self.dir.path().join("contracts.reg"), ledger.clone())
            .expect("reopen node");
        (ledger, node)
    }

    /// Delegate serving this node's chain to peers.
    pub fn delegate(&self) -> SyncDelegate<MemoryLedger> {
        SyncDelegate::new(self.ledger.clone())
    }

    /// Install a contract that creates `tables` observable tables.
    pub fn install_simple_contract(&self, name: &str, tables: &[u8]) {
        let tables = tables.to_vec();
        let ok = self
            .node
            .install_contract(Contract::new(name, move |ledger: &MemoryLedger, space| {
                for table in &tables {
                    ledger.create_table(space, TableId::new(*table));
                }
                true
            }))
            .expect("install contract");
        assert!(ok, "contract {name} must initialize");
    }
}

/// One recorded change event, flattened for easy assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub kind: &'static str,
    pub table: u8,
    pub object: Value,
}

/// Record every event from an observation handle's feed.
pub fn record_events(handle: &ObservationHandle) -> Arc<Mutex<Vec<RecordedEvent>>> {
    let log: Arc<Mutex<Vec<RecordedEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let feed = handle.feed();

    for (kind, signal) in [
        ("loaded", &feed.object_loaded),
        ("created", &feed.object_created),
        ("deleted", &feed.object_deleted),
    ] {
        let log = log.clone();
        signal.connect(move |e: &ObjectChange| {
            log.lock().push(RecordedEvent {
                kind,
                table: e.table.value(),
                object: e.object.clone(),
            });
        });
    }
    {
        let log = log.clone();
        feed.object_modified.connect(move |e: &ObjectUpdate| {
            log.lock().push(RecordedEvent {
                kind: "modified",
                table: e.table.value(),
                object: e.to.clone(),
            });
        });
    }
    log
}

/// A row object with an id field and a payload field.
pub fn row(id: i64, payload: &str) -> Value {
    Value::object([("id", Value::Int(id)), ("payload", Value::from(payload))])
}
