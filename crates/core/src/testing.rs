//! In-memory reference ledger
//!
//! [`MemoryLedger`] implements both collaborator seams ([`ChainStore`] and
//! [`ObjectDatabase`]) over plain maps. Test suites across the workspace
//! drive it to exercise the sync delegate, the registry, and the
//! change-notification layer without a real ledger engine.
//!
//! The chain side generates deterministic blocks and can register fork
//! branches; the object side fires observer callbacks synchronously inside
//! the mutation call stack, the way the real object database does.

use crate::block::{SignedBlock, SignedTransaction};
use crate::error::{Error, Result};
use crate::traits::{ChainStore, ObjectDatabase, ObserverId, TableObserver};
use crate::types::{BlockId, BlockNum, ChainId, SpaceId, TableId, TransactionId};
use crate::value::Value;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const BLOCK_INTERVAL_SECS: u8 = 5;

struct TableState {
    rows: BTreeMap<u64, Value>,
    observers: Vec<(ObserverId, Arc<dyn TableObserver>)>,
    sealed: bool,
}

impl TableState {
    fn observer_snapshot(&self) -> Vec<Arc<dyn TableObserver>> {
        self.observers.iter().map(|(_, o)| o.clone()).collect()
    }
}

struct Inner {
    chain_id: ChainId,
    genesis_time: DateTime<Utc>,
    /// Main chain; index `i` holds block number `i + 1`.
    blocks: Vec<SignedBlock>,
    ids: Vec<BlockId>,
    fork_blocks: HashMap<BlockId, SignedBlock>,
    transactions: HashMap<TransactionId, SignedTransaction>,
    undo_horizon: BlockNum,
    spaces: BTreeMap<SpaceId, BTreeMap<TableId, TableState>>,
    next_observer: u64,
}

impl Inner {
    fn head_id(&self) -> BlockId {
        self.ids.last().copied().unwrap_or(BlockId::ZERO)
    }

    fn on_main_chain(&self, id: &BlockId) -> bool {
        let num = id.number();
        num >= 1 && self.ids.get(num as usize - 1) == Some(id)
    }

    fn table_mut(&mut self, space: SpaceId, table: TableId) -> Result<&mut TableState> {
        self.spaces
            .get_mut(&space)
            .and_then(|tables| tables.get_mut(&table))
            .ok_or_else(|| Error::InvalidOperation(format!("no table {space}.{table}")))
    }
}

/// In-memory ledger used by the test suites.
pub struct MemoryLedger {
    inner: RwLock<Inner>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        let chain_id = ChainId::from_bytes(sha256_of(b"chainhost test chain"));
        MemoryLedger {
            inner: RwLock::new(Inner {
                chain_id,
                genesis_time: Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
                blocks: Vec::new(),
                ids: Vec::new(),
                fork_blocks: HashMap::new(),
                transactions: HashMap::new(),
                undo_horizon: 0,
                spaces: BTreeMap::new(),
                next_observer: 0,
            }),
        }
    }

    /// Create a ledger whose main chain is `length` generated blocks tall.
    pub fn with_blocks(length: BlockNum) -> Self {
        let ledger = MemoryLedger::new();
        ledger.extend(length);
        ledger
    }

    /// Build the next main-chain block without applying it.
    pub fn generate_block(&self, transactions: Vec<SignedTransaction>) -> SignedBlock {
        let inner = self.inner.read();
        let number = inner.blocks.len() as BlockNum + 1;
        SignedBlock {
            previous: inner.head_id(),
            timestamp: inner.genesis_time
                + chrono::Duration::seconds(i64::from(number) * i64::from(BLOCK_INTERVAL_SECS)),
            transactions,
            witness_signature: Vec::new(),
        }
    }

    /// Generate and apply `count` empty blocks.
    pub fn extend(&self, count: BlockNum) {
        for _ in 0..count {
            let block = self.generate_block(Vec::new());
            self.apply_block(block)
                .unwrap_or_else(|e| panic!("generated block must apply: {e}"));
        }
    }

    /// Register a fork branching off after main-chain block `from_num`.
    ///
    /// Fork blocks get distinct content from the main chain. Returns their
    /// ids in increasing height order; the last entry is the fork head.
    pub fn register_fork(&self, from_num: BlockNum, length: BlockNum) -> Vec<BlockId> {
        let mut inner = self.inner.write();
        let mut previous = if from_num == 0 {
            BlockId::ZERO
        } else {
            inner.ids[from_num as usize - 1]
        };
        let genesis_time = inner.genesis_time;

        let mut ids = Vec::with_capacity(length as usize);
        for offset in 1..=length {
            let number = from_num + offset;
            let block = SignedBlock {
                previous,
                timestamp: genesis_time
                    + chrono::Duration::seconds(
                        i64::from(number) * i64::from(BLOCK_INTERVAL_SECS) + 1,
                    ),
                transactions: Vec::new(),
                // Distinct content so fork ids never collide with main-chain ids.
                witness_signature: vec![0xF0, (from_num % 251) as u8, (offset % 251) as u8],
            };
            let id = block.id();
            inner.fork_blocks.insert(id, block);
            ids.push(id);
            previous = id;
        }
        ids
    }

    /// Record a transaction as recently seen.
    pub fn insert_transaction(&self, tx: SignedTransaction) {
        self.inner.write().transactions.insert(tx.id(), tx);
    }

    /// Set the oldest block number still distinguishable from a fork.
    pub fn set_undo_horizon(&self, horizon: BlockNum) {
        self.inner.write().undo_horizon = horizon;
    }

    /// Register an observable table under `space`.
    pub fn create_table(&self, space: SpaceId, table: TableId) {
        self.insert_table(space, table, false);
    }

    /// Register a table that refuses instrumentation, standing in for an
    /// incompatible table implementation.
    pub fn create_sealed_table(&self, space: SpaceId, table: TableId) {
        self.insert_table(space, table, true);
    }

    fn insert_table(&self, space: SpaceId, table: TableId, sealed: bool) {
        self.inner
            .write()
            .spaces
            .entry(space)
            .or_default()
            .insert(
                table,
                TableState {
                    rows: BTreeMap::new(),
                    observers: Vec::new(),
                    sealed,
                },
            );
    }

    /// Current state of one object, if present.
    pub fn object(&self, space: SpaceId, table: TableId, key: u64) -> Option<Value> {
        self.inner
            .read()
            .spaces
            .get(&space)
            .and_then(|tables| tables.get(&table))
            .and_then(|t| t.rows.get(&key).cloned())
    }

    /// Create an object, notifying observers from inside the call stack.
    pub fn insert_object(&self, space: SpaceId, table: TableId, key: u64, value: Value) -> Result<()> {
        let observers = {
            let mut inner = self.inner.write();
            let t = inner.table_mut(space, table)?;
            if t.rows.contains_key(&key) {
                return Err(Error::InvalidOperation(format!(
                    "object {key} already exists in {space}.{table}"
                )));
            }
            t.rows.insert(key, value.clone());
            t.observer_snapshot()
        };
        for observer in observers {
            observer.object_created(&value);
        }
        Ok(())
    }

    /// Modify an object: observers see `about_to_modify(before)` before the
    /// row changes, then `object_modified(after)` once it has.
    pub fn modify_object(&self, space: SpaceId, table: TableId, key: u64, value: Value) -> Result<()> {
        let (before, observers) = {
            let mut inner = self.inner.write();
            let t = inner.table_mut(space, table)?;
            let before = t
                .rows
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::InvalidOperation(format!("no object {key} in {space}.{table}")))?;
            (before, t.observer_snapshot())
        };
        for observer in &observers {
            observer.about_to_modify(&before);
        }
        {
            let mut inner = self.inner.write();
            let t = inner.table_mut(space, table)?;
            t.rows.insert(key, value.clone());
        }
        for observer in &observers {
            observer.object_modified(&value);
        }
        Ok(())
    }

    /// Remove an object, notifying observers with its final state.
    pub fn remove_object(&self, space: SpaceId, table: TableId, key: u64) -> Result<()> {
        let (removed, observers) = {
            let mut inner = self.inner.write();
            let t = inner.table_mut(space, table)?;
            let removed = t
                .rows
                .remove(&key)
                .ok_or_else(|| Error::InvalidOperation(format!("no object {key} in {space}.{table}")))?;
            (removed, t.observer_snapshot())
        };
        for observer in observers {
            observer.object_removed(&removed);
        }
        Ok(())
    }

    /// Replay a disk load of one object, firing `object_loaded`.
    pub fn load_object(&self, space: SpaceId, table: TableId, key: u64) -> Result<()> {
        let (value, observers) = {
            let inner = self.inner.read();
            let t = inner
                .spaces
                .get(&space)
                .and_then(|tables| tables.get(&table))
                .ok_or_else(|| Error::InvalidOperation(format!("no table {space}.{table}")))?;
            let value = t
                .rows
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::InvalidOperation(format!("no object {key} in {space}.{table}")))?;
            (value, t.observer_snapshot())
        };
        for observer in observers {
            observer.object_loaded(&value);
        }
        Ok(())
    }

    /// Misbehaving-table hook: fire `object_modified` with no preceding
    /// `about_to_modify`. Drives observers' protocol-violation handling.
    pub fn fire_modified_unstaged(&self, space: SpaceId, table: TableId, key: u64) -> Result<()> {
        let (value, observers) = {
            let inner = self.inner.read();
            let t = inner
                .spaces
                .get(&space)
                .and_then(|tables| tables.get(&table))
                .ok_or_else(|| Error::InvalidOperation(format!("no table {space}.{table}")))?;
            let value = t
                .rows
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::InvalidOperation(format!("no object {key} in {space}.{table}")))?;
            (value, t.observer_snapshot())
        };
        for observer in observers {
            observer.object_modified(&value);
        }
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn sha256_of(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}

impl ChainStore for MemoryLedger {
    fn chain_id(&self) -> ChainId {
        self.inner.read().chain_id
    }

    fn head_block_num(&self) -> BlockNum {
        self.inner.read().blocks.len() as BlockNum
    }

    fn head_block_id(&self) -> BlockId {
        self.inner.read().head_id()
    }

    fn block_id_for_num(&self, num: BlockNum) -> Option<BlockId> {
        if num == 0 {
            return None;
        }
        self.inner.read().ids.get(num as usize - 1).copied()
    }

    fn is_known_block(&self, id: &BlockId) -> bool {
        let inner = self.inner.read();
        inner.on_main_chain(id) || inner.fork_blocks.contains_key(id)
    }

    fn is_known_transaction(&self, id: &TransactionId) -> bool {
        self.inner.read().transactions.contains_key(id)
    }

    fn fetch_block(&self, id: &BlockId) -> Option<SignedBlock> {
        let inner = self.inner.read();
        if inner.on_main_chain(id) {
            return inner.blocks.get(id.number() as usize - 1).cloned();
        }
        inner.fork_blocks.get(id).cloned()
    }

    fn recent_transaction(&self, id: &TransactionId) -> Option<SignedTransaction> {
        self.inner.read().transactions.get(id).cloned()
    }

    fn block_time(&self, id: &BlockId) -> Option<DateTime<Utc>> {
        self.fetch_block(id).map(|b| b.timestamp)
    }

    fn block_interval_secs(&self) -> u8 {
        BLOCK_INTERVAL_SECS
    }

    fn undo_horizon(&self) -> BlockNum {
        self.inner.read().undo_horizon
    }

    fn fork_segment(&self, reference: &BlockId) -> Result<Vec<BlockId>> {
        let inner = self.inner.read();
        let mut segment = Vec::new();
        let mut cursor = *reference;
        loop {
            let block = inner
                .fork_blocks
                .get(&cursor)
                .ok_or_else(|| Error::UnknownItem(format!("unlinked fork block {cursor}")))?;
            segment.push(cursor);
            cursor = block.previous;
            if cursor.is_zero() || inner.on_main_chain(&cursor) {
                segment.push(cursor);
                return Ok(segment);
            }
        }
    }

    fn apply_block(&self, block: SignedBlock) -> Result<()> {
        let mut inner = self.inner.write();
        if block.previous != inner.head_id() {
            return Err(Error::InvalidOperation(format!(
                "block #{} does not extend head {}",
                block.number(),
                inner.head_id()
            )));
        }
        let id = block.id();
        for tx in &block.transactions {
            inner.transactions.insert(tx.id(), tx.clone());
        }
        inner.ids.push(id);
        inner.blocks.push(block);
        Ok(())
    }
}

impl ObjectDatabase for MemoryLedger {
    fn tables_in_space(&self, space: SpaceId) -> Vec<TableId> {
        self.inner
            .read()
            .spaces
            .get(&space)
            .map(|tables| tables.keys().copied().collect())
            .unwrap_or_default()
    }

    fn attach_observer(
        &self,
        space: SpaceId,
        table: TableId,
        observer: Arc<dyn TableObserver>,
    ) -> Result<ObserverId> {
        let mut inner = self.inner.write();
        let next = inner.next_observer;
        let t = inner.table_mut(space, table)?;
        if t.sealed {
            return Err(Error::InvalidOperation(format!(
                "table {space}.{table} is sealed against instrumentation"
            )));
        }
        let id = ObserverId(next);
        t.observers.push((id, observer));
        inner.next_observer += 1;
        Ok(id)
    }

    fn detach_observer(&self, space: SpaceId, table: TableId, observer: ObserverId) {
        let mut inner = self.inner.write();
        if let Ok(t) = inner.table_mut(space, table) {
            t.observers.retain(|(id, _)| *id != observer);
        }
    }

    fn inspect_space(&self, space: SpaceId, visit: &mut dyn FnMut(TableId, &Value)) {
        // Snapshot under the lock, visit outside it, so a visitor may read
        // the ledger without deadlocking.
        let snapshot: Vec<(TableId, Vec<Value>)> = {
            let inner = self.inner.read();
            inner
                .spaces
                .get(&space)
                .map(|tables| {
                    tables
                        .iter()
                        .map(|(id, t)| (*id, t.rows.values().cloned().collect()))
                        .collect()
                })
                .unwrap_or_default()
        };
        for (table, rows) in snapshot {
            for row in rows {
                visit(table, &row);
            }
        }
    }
}
