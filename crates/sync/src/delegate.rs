//! Sync delegate: the one conforming [`PeerSyncService`] implementation
//!
//! The delegate answers peer protocol queries by reading chain state through
//! the [`ChainStore`] seam, and forwards incoming blocks and transactions to
//! node-side listeners over typed channels. It owns one piece of transient
//! state: the syncing flag, set when a sync is started and cleared by the
//! first block delivered outside sync mode.

use crate::service::{BlockIdRange, PeerSyncService};
use chainhost_core::{
    BlockId, BlockNum, ChainId, ChainStore, Error, ItemId, ItemType, Message, MessageId, Result,
    Signal, SignedBlock, SignedTransaction,
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Peer synchronization delegate over a chain store.
pub struct SyncDelegate<C> {
    chain: Arc<C>,
    syncing: AtomicBool,
    /// Fires for every block delivered by a peer, before any append.
    pub block_received: Signal<SignedBlock>,
    /// Fires for every transaction delivered by a peer.
    pub transaction_received: Signal<SignedTransaction>,
    /// Fires once when a started sync sees its first live (non-sync) block.
    pub sync_finished: Signal<()>,
}

impl<C: ChainStore> SyncDelegate<C> {
    /// Create a delegate reading through `chain`.
    pub fn new(chain: Arc<C>) -> Self {
        SyncDelegate {
            chain,
            syncing: AtomicBool::new(false),
            block_received: Signal::new(),
            transaction_received: Signal::new(),
            sync_finished: Signal::new(),
        }
    }

    /// Mark the node as synchronizing from `block_id`. The networking
    /// collaborator drives the actual fetching; the delegate only tracks
    /// the state so it can report when sync completes.
    pub fn sync_from(&self, block_id: BlockId) {
        info!(target: "chainhost::sync", block = %block_id, "Beginning sync");
        self.syncing.store(true, Ordering::SeqCst);
    }

    /// Whether a started sync has not yet completed.
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Whether `id` names a block on our preferred chain (as opposed to a
    /// stored fork).
    fn block_on_main_chain(&self, id: &BlockId) -> bool {
        self.chain.block_id_for_num(id.number()) == Some(*id)
    }
}

impl<C: ChainStore> PeerSyncService for SyncDelegate<C> {
    fn has_item(&self, id: &ItemId) -> bool {
        match id.classify() {
            Some(ItemType::Block) => self.chain.is_known_block(&id.as_block_id()),
            Some(ItemType::Transaction) => {
                self.chain.is_known_transaction(&id.as_transaction_id())
            }
            None => {
                error!(
                    target: "chainhost::sync",
                    item = %id,
                    "Asked if we recognize an item id of unknown type"
                );
                false
            }
        }
    }

    fn handle_block(&self, block: SignedBlock, sync_mode: bool) -> Vec<MessageId> {
        let contained = block.transaction_message_ids();
        self.block_received.emit(&block);

        if !sync_mode && self.syncing.swap(false, Ordering::SeqCst) {
            info!(target: "chainhost::sync", head = block.number(), "Sync finished");
            self.sync_finished.emit(&());
        }

        contained
    }

    fn handle_transaction(&self, tx: SignedTransaction) {
        self.transaction_received.emit(&tx);
    }

    fn handle_message(&self, message: Message) {
        error!(
            target: "chainhost::sync",
            message = %message.id(),
            message_type = message.message_type(),
            "Asked to handle a message that even the network layer doesn't recognize"
        );
    }

    fn get_block_ids(&self, peer_synopsis: &[BlockId], limit: u32) -> Result<BlockIdRange> {
        let head = self.chain.head_block_num();
        if head == 0 {
            return Ok(BlockIdRange {
                ids: Vec::new(),
                remaining: 0,
            });
        }

        let mut last_known = BlockId::ZERO;
        let lone_sentinel = peer_synopsis.len() == 1 && peer_synopsis[0].is_zero();
        if peer_synopsis.is_empty() || lone_sentinel {
            // Peer has no blocks. Old peers with an empty chain sent a
            // synopsis containing just the zero id instead of an empty one;
            // both mean the same thing.
        } else {
            let common = peer_synopsis.iter().rev().find(|id| {
                id.is_zero() || (self.chain.is_known_block(id) && self.block_on_main_chain(id))
            });
            match common {
                Some(id) => last_known = *id,
                None => return Err(Error::UnreachableFork),
            }
        }

        let mut ids = Vec::with_capacity(limit.min(head) as usize);
        let mut num = last_known.number() + 1;
        while num <= head && (ids.len() as u32) < limit {
            match self.chain.block_id_for_num(num) {
                Some(id) => ids.push(id),
                None => {
                    return Err(Error::Corruption(format!(
                        "main chain is missing block #{num}"
                    )))
                }
            }
            num += 1;
        }

        let remaining = match ids.last() {
            Some(last) if last.number() < head => head - last.number(),
            _ => 0,
        };

        Ok(BlockIdRange { ids, remaining })
    }

    fn get_item(&self, id: &ItemId) -> Result<Message> {
        match id.classify() {
            Some(ItemType::Block) => {
                let block_id = id.as_block_id();
                self.chain
                    .fetch_block(&block_id)
                    .map(Message::Block)
                    .ok_or_else(|| Error::UnknownItem(format!("block {block_id}")))
            }
            Some(ItemType::Transaction) => {
                let tx_id = id.as_transaction_id();
                self.chain
                    .recent_transaction(&tx_id)
                    .map(Message::Transaction)
                    .ok_or_else(|| Error::UnknownItem(format!("transaction {tx_id}")))
            }
            None => {
                error!(
                    target: "chainhost::sync",
                    item = %id,
                    "Asked for an item with an id of unknown type"
                );
                Err(Error::UnknownItem(format!("item type {}", id.item_type)))
            }
        }
    }

    fn get_chain_id(&self) -> ChainId {
        self.chain.chain_id()
    }

    fn get_blockchain_synopsis(
        &self,
        reference_point: BlockId,
        extra_count: u32,
    ) -> Result<Vec<BlockId>> {
        let mut low = self.chain.undo_horizon();
        let high;
        let non_fork_high;
        // Oldest-first fork ids, filled only when the reference is forked.
        let mut fork_history: Vec<BlockId> = Vec::new();

        if !reference_point.is_zero() {
            if self.block_on_main_chain(&reference_point) {
                let reference_num = reference_point.number();
                high = reference_num;
                non_fork_high = reference_num;

                if reference_num < low {
                    // The chain advanced past the reference between the
                    // network layer's query and now. Answer as if the
                    // reference were still our head rather than failing.
                    low = reference_num;
                }
            } else {
                let mut segment = self.chain.fork_segment(&reference_point)?;
                // The collaborator returns reference-first, with the
                // main-chain common ancestor (or the zero sentinel) last.
                let ancestor = segment.pop().unwrap_or(BlockId::ZERO);
                segment.reverse();

                non_fork_high = ancestor.number();
                high = non_fork_high + segment.len() as BlockNum;

                if non_fork_high < low {
                    warn!(
                        target: "chainhost::sync",
                        diverged_at = non_fork_high,
                        horizon = low,
                        "Cannot build a usable synopsis: peer forked before our undo horizon"
                    );
                    return Err(Error::UnreachableHistory {
                        diverged_at: non_fork_high,
                        horizon: low,
                    });
                }
                fork_history = segment;
            }
        } else {
            // No reference point: summarize the whole chain.
            high = self.chain.head_block_num();
            non_fork_high = high;
            if high == 0 {
                return Ok(Vec::new());
            }
        }

        if low == 0 {
            low = 1;
        }

        // At this point: `low` is the oldest undoable block, `non_fork_high`
        // the last main-chain block below the reference, `high` the
        // reference height (or head). `true_high` additionally counts item
        // ids the network layer knows beyond the reference point.
        let true_high = high + extra_count;
        let mut synopsis = Vec::with_capacity(30);
        let mut cursor = low;
        loop {
            if cursor <= non_fork_high {
                match self.chain.block_id_for_num(cursor) {
                    Some(id) => synopsis.push(id),
                    None => {
                        return Err(Error::Corruption(format!(
                            "main chain is missing block #{cursor}"
                        )))
                    }
                }
            } else {
                synopsis.push(fork_history[(cursor - non_fork_high - 1) as usize]);
            }
            // Ceiling halves the remaining distance: spacing doubles as the
            // cursor falls further behind true_high, giving O(log n) ids.
            cursor += (true_high - cursor + 3) / 2;
            if cursor > high {
                break;
            }
        }

        debug!(
            target: "chainhost::sync",
            reference = %reference_point,
            entries = synopsis.len(),
            "Built blockchain synopsis"
        );
        Ok(synopsis)
    }

    fn sync_status(&self, item_type: u32, item_count: u32) {
        debug!(
            target: "chainhost::sync",
            item_type,
            item_count,
            "Sync status from network layer"
        );
    }

    fn connection_count_changed(&self, count: u32) {
        debug!(target: "chainhost::sync", count, "Peer connection count changed");
    }

    fn get_block_number(&self, id: &BlockId) -> BlockNum {
        id.number()
    }

    fn get_block_time(&self, id: &BlockId) -> Option<DateTime<Utc>> {
        self.chain.block_time(id)
    }

    fn get_head_block_id(&self) -> BlockId {
        self.chain.head_block_id()
    }

    fn error_encountered(&self, message: &str) {
        error!(target: "chainhost::sync", message, "Error reported by network layer");
    }

    fn get_current_block_interval_in_seconds(&self) -> u8 {
        self.chain.block_interval_secs()
    }
}
