//! Peer synchronization capability set
//!
//! [`PeerSyncService`] is the node's wire-level contract with remote peers:
//! the networking collaborator calls these methods synchronously to answer
//! peer queries and deliver incoming items. The set is fixed and wide, and a
//! peer expects a response even for degenerate inputs (empty synopsis, zero
//! reference point).
//!
//! Method names follow the peer protocol rather than Rust accessor
//! conventions; they are the protocol's vocabulary. Callers depend on this
//! capability set only — [`SyncDelegate`](crate::SyncDelegate) is its one
//! conforming implementation.

use chainhost_core::{
    BlockId, BlockNum, ChainId, ItemId, Message, MessageId, Result, SignedBlock,
    SignedTransaction,
};
use chrono::{DateTime, Utc};

/// A slice of main-chain block ids handed to a synchronizing peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIdRange {
    /// Block ids in increasing order, starting just after the common point.
    pub ids: Vec<BlockId>,
    /// How many further ids exist beyond the returned set; 0 when `ids`
    /// reaches the head.
    pub remaining: u32,
}

/// The peer-facing capability set served to the networking collaborator.
pub trait PeerSyncService: Send + Sync {
    /// Whether the given block or transaction is already known to the
    /// ledger. Unknown item types are reported and answered `false`.
    fn has_item(&self, id: &ItemId) -> bool;

    /// Ingest a block delivered by a peer. Returns the message ids of the
    /// contained transactions, in block order, for the network layer's
    /// dedup bookkeeping. `sync_mode` is true while the peer is streaming
    /// historical blocks; the first delivery outside sync mode ends the
    /// syncing state.
    fn handle_block(&self, block: SignedBlock, sync_mode: bool) -> Vec<MessageId>;

    /// Ingest a transaction delivered by a peer.
    fn handle_transaction(&self, tx: SignedTransaction);

    /// Fallback for a message the network layer could not route; reported
    /// as a protocol error and dropped.
    fn handle_message(&self, message: Message);

    /// Answer a peer's "what blocks do you have" query given its synopsis.
    ///
    /// # Errors
    ///
    /// [`Error::UnreachableFork`](chainhost_core::Error::UnreachableFork)
    /// when the synopsis shares no block with the local main chain.
    fn get_block_ids(&self, peer_synopsis: &[BlockId], limit: u32) -> Result<BlockIdRange>;

    /// Fetch the full item for a requested id.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownItem`](chainhost_core::Error::UnknownItem) when the
    /// declared type is neither block nor transaction, or the item is
    /// missing.
    fn get_item(&self, id: &ItemId) -> Result<Message>;

    /// The local chain id.
    fn get_chain_id(&self) -> ChainId;

    /// Build a logarithmically-sampled synopsis of the local chain up to
    /// `reference_point` (or the head, for a zero reference point).
    ///
    /// # Errors
    ///
    /// [`Error::UnreachableHistory`](chainhost_core::Error::UnreachableHistory)
    /// when the reference point is on a fork diverging before the undo
    /// horizon.
    fn get_blockchain_synopsis(
        &self,
        reference_point: BlockId,
        extra_count: u32,
    ) -> Result<Vec<BlockId>>;

    /// Progress report from the network layer; observability only.
    fn sync_status(&self, item_type: u32, item_count: u32);

    /// Peer connection count changed; observability only.
    fn connection_count_changed(&self, count: u32);

    /// Block number embedded in a block id.
    fn get_block_number(&self, id: &BlockId) -> BlockNum;

    /// Timestamp of a known block.
    fn get_block_time(&self, id: &BlockId) -> Option<DateTime<Utc>>;

    /// Id of the current head block.
    fn get_head_block_id(&self) -> BlockId;

    /// The network layer hit an error involving this node's data.
    fn error_encountered(&self, message: &str);

    /// Target block interval from chain parameters.
    fn get_current_block_interval_in_seconds(&self) -> u8;
}
