//! Table monitors and contract observation
//!
//! Observing a contract attaches one [`TableMonitor`] to every table in its
//! space. Each monitor translates the object database's raw lifecycle
//! callbacks into typed events on the contract's [`ChangeFeed`].
//!
//! A modification arrives as two callbacks — `about_to_modify(before)` then
//! `object_modified(after)` — which the monitor bridges through a staged
//! snapshot. The staging field is a two-step state machine scoped to one
//! table: empty, or holding the snapshot awaiting its confirming callback.
//! A confirmation with nothing staged means the table implementation broke
//! protocol; the event is dropped and reported, and observation continues.

use crate::events::{ChangeFeed, ObjectChange, ObjectUpdate};
use chainhost_core::{ObjectDatabase, ObserverId, SpaceId, TableId, TableObserver, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Per-table observer feeding a contract's change channels.
struct TableMonitor {
    table: TableId,
    feed: Arc<ChangeFeed>,
    /// Snapshot staged by `about_to_modify`, consumed by `object_modified`.
    pre_modified: Mutex<Option<Value>>,
}

impl TableMonitor {
    fn new(table: TableId, feed: Arc<ChangeFeed>) -> Self {
        TableMonitor {
            table,
            feed,
            pre_modified: Mutex::new(None),
        }
    }
}

impl TableObserver for TableMonitor {
    fn object_loaded(&self, object: &Value) {
        self.feed.object_loaded.emit(&ObjectChange {
            table: self.table,
            object: object.clone(),
        });
    }

    fn object_created(&self, object: &Value) {
        self.feed.object_created.emit(&ObjectChange {
            table: self.table,
            object: object.clone(),
        });
    }

    fn object_removed(&self, object: &Value) {
        self.feed.object_deleted.emit(&ObjectChange {
            table: self.table,
            object: object.clone(),
        });
    }

    fn about_to_modify(&self, before: &Value) {
        *self.pre_modified.lock() = Some(before.clone());
    }

    fn object_modified(&self, after: &Value) {
        match self.pre_modified.lock().take() {
            Some(from) => {
                self.feed.object_modified.emit(&ObjectUpdate {
                    table: self.table,
                    from,
                    to: after.clone(),
                });
            }
            None => {
                error!(
                    target: "chainhost::notify",
                    table = %self.table,
                    object = ?after,
                    "Modification confirmed without a staged pre-modification snapshot; dropping event"
                );
            }
        }
    }
}

/// Live observation of one contract's tables.
///
/// Dropping the handle detaches every monitor; no event fires afterwards.
pub struct ObservationHandle {
    contract_name: String,
    space: SpaceId,
    feed: Arc<ChangeFeed>,
    db: Arc<dyn ObjectDatabase>,
    attached: Vec<(TableId, ObserverId)>,
}

impl ObservationHandle {
    /// Name of the observed contract.
    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    /// Space under observation.
    pub fn space_id(&self) -> SpaceId {
        self.space
    }

    /// The contract's event channels.
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Tables actually under observation (instrumentation-refusing tables
    /// are absent).
    pub fn observed_tables(&self) -> Vec<TableId> {
        self.attached.iter().map(|(table, _)| *table).collect()
    }
}

impl Drop for ObservationHandle {
    fn drop(&mut self) {
        for (table, observer) in self.attached.drain(..) {
            self.db.detach_observer(self.space, table, observer);
        }
        debug!(
            target: "chainhost::notify",
            contract = %self.contract_name,
            space = %self.space,
            "Detached contract observation"
        );
    }
}

impl std::fmt::Debug for ObservationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationHandle")
            .field("contract_name", &self.contract_name)
            .field("space", &self.space)
            .field("tables", &self.observed_tables())
            .finish()
    }
}

/// Attach monitors to every table currently registered under `space`.
///
/// A table that cannot be instrumented is skipped with a warning and the
/// rest are still observed; losing one table's events is better than losing
/// the contract's.
pub fn observe_contract(
    db: Arc<dyn ObjectDatabase>,
    space: SpaceId,
    contract_name: &str,
) -> ObservationHandle {
    let feed = Arc::new(ChangeFeed::new());
    let mut attached = Vec::new();

    for table in db.tables_in_space(space) {
        let monitor = Arc::new(TableMonitor::new(table, feed.clone()));
        match db.attach_observer(space, table, monitor) {
            Ok(observer) => attached.push((table, observer)),
            Err(e) => {
                warn!(
                    target: "chainhost::notify",
                    contract = contract_name,
                    space = %space,
                    table = %table,
                    error = %e,
                    "Failed to monitor table; proceeding with the others"
                );
            }
        }
    }

    debug!(
        target: "chainhost::notify",
        contract = contract_name,
        space = %space,
        tables = attached.len(),
        "Observing contract tables"
    );

    ObservationHandle {
        contract_name: contract_name.to_string(),
        space,
        feed,
        db,
        attached,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainhost_core::testing::MemoryLedger;
    use chainhost_core::Value;

    const SPACE: SpaceId = SpaceId::new(10);
    const TABLE: TableId = TableId::new(0);

    fn ledger_with_table() -> Arc<MemoryLedger> {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.create_table(SPACE, TABLE);
        ledger
    }

    /// Collects every event from a feed as (kind, table, value) triples.
    fn record_all(feed: &ChangeFeed) -> Arc<Mutex<Vec<(&'static str, TableId, Value)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let log = log.clone();
            feed.object_loaded
                .connect(move |e: &ObjectChange| log.lock().push(("loaded", e.table, e.object.clone())));
        }
        {
            let log = log.clone();
            feed.object_created
                .connect(move |e: &ObjectChange| log.lock().push(("created", e.table, e.object.clone())));
        }
        {
            let log = log.clone();
            feed.object_deleted
                .connect(move |e: &ObjectChange| log.lock().push(("deleted", e.table, e.object.clone())));
        }
        {
            let log = log.clone();
            feed.object_modified
                .connect(move |e: &ObjectUpdate| log.lock().push(("modified", e.table, e.to.clone())));
        }
        log
    }

    #[test]
    fn events_fire_in_mutation_order_with_post_state_snapshots() {
        let ledger = ledger_with_table();
        let handle = observe_contract(ledger.clone(), SPACE, "voting");
        let log = record_all(handle.feed());

        ledger.insert_object(SPACE, TABLE, 1, Value::Int(1)).unwrap();
        ledger.modify_object(SPACE, TABLE, 1, Value::Int(2)).unwrap();
        ledger.insert_object(SPACE, TABLE, 2, Value::Int(10)).unwrap();
        ledger.remove_object(SPACE, TABLE, 1).unwrap();

        let events = log.lock().clone();
        assert_eq!(
            events,
            vec![
                ("created", TABLE, Value::Int(1)),
                ("modified", TABLE, Value::Int(2)),
                ("created", TABLE, Value::Int(10)),
                ("deleted", TABLE, Value::Int(2)),
            ]
        );
    }

    #[test]
    fn modified_carries_the_staged_before_snapshot() {
        let ledger = ledger_with_table();
        let handle = observe_contract(ledger.clone(), SPACE, "voting");

        let updates = Arc::new(Mutex::new(Vec::new()));
        {
            let updates = updates.clone();
            handle
                .feed()
                .object_modified
                .connect(move |e: &ObjectUpdate| updates.lock().push(e.clone()));
        }

        ledger.insert_object(SPACE, TABLE, 1, Value::Int(1)).unwrap();
        ledger.modify_object(SPACE, TABLE, 1, Value::Int(2)).unwrap();
        ledger.modify_object(SPACE, TABLE, 1, Value::Int(3)).unwrap();

        let updates = updates.lock();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].from, Value::Int(1));
        assert_eq!(updates[0].to, Value::Int(2));
        assert_eq!(updates[1].from, Value::Int(2));
        assert_eq!(updates[1].to, Value::Int(3));
    }

    #[test]
    fn loaded_events_flow_through() {
        let ledger = ledger_with_table();
        ledger.insert_object(SPACE, TABLE, 1, Value::from("stored")).unwrap();

        let handle = observe_contract(ledger.clone(), SPACE, "voting");
        let log = record_all(handle.feed());

        ledger.load_object(SPACE, TABLE, 1).unwrap();
        assert_eq!(
            log.lock().clone(),
            vec![("loaded", TABLE, Value::from("stored"))]
        );
    }

    #[test]
    fn unstaged_modification_is_dropped_and_observation_continues() {
        let ledger = ledger_with_table();
        let handle = observe_contract(ledger.clone(), SPACE, "voting");
        let log = record_all(handle.feed());

        ledger.insert_object(SPACE, TABLE, 1, Value::Int(1)).unwrap();
        // A misbehaving table confirms a modification it never announced.
        ledger.fire_modified_unstaged(SPACE, TABLE, 1).unwrap();
        // Well-behaved traffic keeps flowing afterwards.
        ledger.modify_object(SPACE, TABLE, 1, Value::Int(2)).unwrap();

        let events = log.lock().clone();
        assert_eq!(
            events,
            vec![
                ("created", TABLE, Value::Int(1)),
                ("modified", TABLE, Value::Int(2)),
            ]
        );
    }

    #[test]
    fn dropping_the_handle_silences_all_events() {
        let ledger = ledger_with_table();
        let handle = observe_contract(ledger.clone(), SPACE, "voting");
        let log = record_all(handle.feed());

        ledger.insert_object(SPACE, TABLE, 1, Value::Int(1)).unwrap();
        drop(handle);
        ledger.modify_object(SPACE, TABLE, 1, Value::Int(2)).unwrap();
        ledger.remove_object(SPACE, TABLE, 1).unwrap();

        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn sealed_tables_are_skipped_but_others_observed() {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.create_table(SPACE, TableId::new(0));
        ledger.create_sealed_table(SPACE, TableId::new(1));
        ledger.create_table(SPACE, TableId::new(2));

        let handle = observe_contract(ledger.clone(), SPACE, "voting");
        assert_eq!(
            handle.observed_tables(),
            vec![TableId::new(0), TableId::new(2)]
        );

        let log = record_all(handle.feed());
        ledger.insert_object(SPACE, TableId::new(2), 1, Value::Int(5)).unwrap();
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn monitors_are_scoped_to_their_space() {
        let ledger = ledger_with_table();
        let other_space = SpaceId::new(11);
        ledger.create_table(other_space, TABLE);

        let handle = observe_contract(ledger.clone(), SPACE, "voting");
        let log = record_all(handle.feed());

        ledger.insert_object(other_space, TABLE, 1, Value::Int(9)).unwrap();
        assert!(log.lock().is_empty());
    }
}
