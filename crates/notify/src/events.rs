//! Change events and per-contract feeds

use chainhost_core::{Signal, TableId, Value};

/// A single-object lifecycle event: something was loaded, created, or
/// deleted in one of a contract's tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectChange {
    /// Table the object lives in.
    pub table: TableId,
    /// Snapshot of the object at the event: its loaded/created state, or
    /// its final state for a deletion.
    pub object: Value,
}

/// A modification event, carrying both sides of the change.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUpdate {
    /// Table the object lives in.
    pub table: TableId,
    /// Snapshot immediately before the modification.
    pub from: Value,
    /// Snapshot immediately after the modification.
    pub to: Value,
}

/// The four independently subscribable channels for one observed contract.
///
/// Delivery is synchronous and in subscription order on every channel; a
/// listener sees events in exactly the order the mutations happened.
#[derive(Debug, Default)]
pub struct ChangeFeed {
    /// An object was loaded from persistent storage.
    pub object_loaded: Signal<ObjectChange>,
    /// A new object was created.
    pub object_created: Signal<ObjectChange>,
    /// An object was deleted; the event carries its prior value.
    pub object_deleted: Signal<ObjectChange>,
    /// An object was updated; the event carries before and after.
    pub object_modified: Signal<ObjectUpdate>,
}

impl ChangeFeed {
    /// A feed with no listeners.
    pub fn new() -> Self {
        ChangeFeed::default()
    }
}
