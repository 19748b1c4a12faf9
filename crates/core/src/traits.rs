//! Collaborator trait seams
//!
//! The ledger/consensus engine is an external collaborator. This module
//! defines the two narrow seams the node core consumes it through:
//!
//! - [`ChainStore`]: the chain-state accessor the sync delegate reads from
//!   and appends to. Block validation happens behind this seam.
//! - [`ObjectDatabase`]: the contract-data side of the ledger — table
//!   enumeration, observer instrumentation, and space inspection.
//!
//! Implementations must be safe to share (`Send + Sync`); the supported
//! execution model is a single logical thread, so interior locks are
//! structural rather than contended.

use crate::block::{SignedBlock, SignedTransaction};
use crate::error::Result;
use crate::types::{BlockId, BlockNum, ChainId, SpaceId, TableId, TransactionId};
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Read/append view of ledger chain state.
pub trait ChainStore: Send + Sync {
    /// The chain id fixed at genesis.
    fn chain_id(&self) -> ChainId;

    /// Number of the current head block; 0 for an empty chain.
    fn head_block_num(&self) -> BlockNum;

    /// Id of the current head block; the zero sentinel for an empty chain.
    fn head_block_id(&self) -> BlockId;

    /// Id of the main-chain block at `num`, if the chain is that tall.
    fn block_id_for_num(&self, num: BlockNum) -> Option<BlockId>;

    /// Whether this block id is known, on the main chain or any stored fork.
    fn is_known_block(&self, id: &BlockId) -> bool;

    /// Whether this transaction id has been seen recently.
    fn is_known_transaction(&self, id: &TransactionId) -> bool;

    /// Fetch a full block by id, from the main chain or a stored fork.
    fn fetch_block(&self, id: &BlockId) -> Option<SignedBlock>;

    /// Fetch a recently seen transaction by id.
    fn recent_transaction(&self, id: &TransactionId) -> Option<SignedTransaction>;

    /// Timestamp of a known block.
    fn block_time(&self, id: &BlockId) -> Option<DateTime<Utc>>;

    /// Target seconds between blocks, from chain parameters.
    fn block_interval_secs(&self) -> u8;

    /// Oldest block number the ledger can still distinguish from a fork
    /// (its last non-undoable block). 0 on a chain too young to have one.
    fn undo_horizon(&self) -> BlockNum;

    /// Block ids along the fork containing `reference`, ordered from
    /// `reference` back to the common ancestor with the main chain. The
    /// ancestor (a main-chain block, or the zero sentinel when the fork
    /// diverges before block 1) is the last element.
    ///
    /// # Errors
    ///
    /// Fails when `reference` is not a known, linked fork block.
    fn fork_segment(&self, reference: &BlockId) -> Result<Vec<BlockId>>;

    /// Append a block to the chain. The ledger engine validates it.
    ///
    /// # Errors
    ///
    /// Fails when the block does not extend the current head or is rejected
    /// by validation.
    fn apply_block(&self, block: SignedBlock) -> Result<()>;
}

/// Handle to an attached table observer, used to detach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(
    /// Raw handle value, allocated by the object database.
    pub u64,
);

/// Lifecycle callbacks a table observer receives from the object database.
///
/// All callbacks run synchronously inside the mutation call stack: when
/// `object_modified` fires, the in-memory object already carries the new
/// state, though the surrounding transaction may not yet be committed.
///
/// A modification is delivered as the pair `about_to_modify(before)` then
/// `object_modified(after)`, with no interleaving for the same table.
pub trait TableObserver: Send + Sync {
    /// An object was loaded from persistent storage.
    fn object_loaded(&self, object: &Value);

    /// A new object was created.
    fn object_created(&self, object: &Value);

    /// An object was removed; `object` is its final state.
    fn object_removed(&self, object: &Value);

    /// An object is about to be modified; `before` is its current state.
    fn about_to_modify(&self, before: &Value);

    /// An object was modified; `after` is its new state.
    fn object_modified(&self, after: &Value);
}

/// Contract-data seam to the ledger's object database.
pub trait ObjectDatabase: Send + Sync {
    /// Tables currently registered under `space`, in table-id order.
    fn tables_in_space(&self, space: SpaceId) -> Vec<TableId>;

    /// Attach an observer to one table.
    ///
    /// # Errors
    ///
    /// Fails when the table cannot be instrumented (for example, a sealed
    /// or incompatible table implementation). Callers are expected to skip
    /// such tables and continue.
    fn attach_observer(
        &self,
        space: SpaceId,
        table: TableId,
        observer: Arc<dyn TableObserver>,
    ) -> Result<ObserverId>;

    /// Detach a previously attached observer. No callback fires after this
    /// returns. Detaching an unknown observer is a no-op.
    fn detach_observer(&self, space: SpaceId, table: TableId, observer: ObserverId);

    /// Visit every object in every table of `space`, in table order then
    /// object order.
    fn inspect_space(&self, space: SpaceId, visit: &mut dyn FnMut(TableId, &Value));
}
