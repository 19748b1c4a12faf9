//! Block, transaction, and wire message types
//!
//! Consensus semantics live in the external ledger engine; these types are
//! the carriers the sync protocol moves around. A transaction's payload is
//! opaque to this core. Two distinct identities matter on the wire:
//!
//! - the *item* id (block id / transaction id), which names the content, and
//! - the *message* id, a digest of the framed wire message, which is what
//!   the network layer uses for dedup bookkeeping.

use crate::types::{
    BlockId, BlockNum, ItemId, MessageId, TransactionId, BLOCK_MESSAGE_TYPE,
    TRANSACTION_MESSAGE_TYPE,
};
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}

/// Digest of a framed wire message: type code followed by the encoded body.
fn frame_digest(message_type: u32, body: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(message_type.to_le_bytes());
    hasher.update(body);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// A signed transaction. Validation and execution belong to the ledger
/// engine; this core only moves transactions and identifies them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Expiration time after which the transaction may be dropped
    pub expiration: DateTime<Utc>,
    /// Opaque operation payload, interpreted by ledger-side evaluators
    pub payload: Value,
    /// Signature bytes, verified by the ledger engine
    pub signature: Vec<u8>,
}

impl SignedTransaction {
    /// Content digest identifying this transaction.
    pub fn id(&self) -> TransactionId {
        let body = bincode::serialize(self).unwrap_or_default();
        TransactionId::from_bytes(sha256(&body))
    }

    /// Id of the wire message that would carry this transaction.
    pub fn message_id(&self) -> MessageId {
        let body = bincode::serialize(self).unwrap_or_default();
        MessageId::from_bytes(frame_digest(TRANSACTION_MESSAGE_TYPE, &body))
    }
}

/// A signed block as delivered by peers.
///
/// The block number is not stored: it is `previous.number() + 1`, and the
/// block's own id embeds it (see [`BlockId`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedBlock {
    /// Id of the preceding block; [`BlockId::ZERO`] for block 1
    pub previous: BlockId,
    /// Block production time
    pub timestamp: DateTime<Utc>,
    /// Transactions included, in application order
    pub transactions: Vec<SignedTransaction>,
    /// Producer signature, verified by the ledger engine
    pub witness_signature: Vec<u8>,
}

impl SignedBlock {
    /// Height of this block.
    pub fn number(&self) -> BlockNum {
        self.previous.number() + 1
    }

    /// Id of this block, with the height embedded in the leading bytes.
    pub fn id(&self) -> BlockId {
        let body = bincode::serialize(self).unwrap_or_default();
        BlockId::from_parts(self.number(), sha256(&body))
    }

    /// Message ids of the contained transactions, in block order.
    pub fn transaction_message_ids(&self) -> Vec<MessageId> {
        self.transactions
            .iter()
            .map(SignedTransaction::message_id)
            .collect()
    }
}

/// Wire item envelope: what `get_item` hands back to the network layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// A full block
    Block(SignedBlock),
    /// A transaction
    Transaction(SignedTransaction),
}

impl Message {
    /// Wire type code of this message.
    pub fn message_type(&self) -> u32 {
        match self {
            Message::Block(_) => BLOCK_MESSAGE_TYPE,
            Message::Transaction(_) => TRANSACTION_MESSAGE_TYPE,
        }
    }

    /// Id of the framed message.
    pub fn id(&self) -> MessageId {
        match self {
            Message::Block(block) => {
                let body = bincode::serialize(block).unwrap_or_default();
                MessageId::from_bytes(frame_digest(BLOCK_MESSAGE_TYPE, &body))
            }
            Message::Transaction(tx) => tx.message_id(),
        }
    }

    /// Item reference for the content this message carries.
    pub fn item_id(&self) -> ItemId {
        match self {
            Message::Block(block) => ItemId::block(block.id()),
            Message::Transaction(tx) => ItemId::transaction(tx.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tx(tag: i64) -> SignedTransaction {
        SignedTransaction {
            expiration: Utc.timestamp_opt(1_700_000_000 + tag, 0).unwrap(),
            payload: Value::Int(tag),
            signature: vec![0xAA],
        }
    }

    fn block(previous: BlockId, txs: Vec<SignedTransaction>) -> SignedBlock {
        SignedBlock {
            previous,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            transactions: txs,
            witness_signature: vec![0xBB],
        }
    }

    #[test]
    fn block_number_follows_previous() {
        let genesis = block(BlockId::ZERO, vec![]);
        assert_eq!(genesis.number(), 1);
        assert_eq!(genesis.id().number(), 1);

        let next = block(genesis.id(), vec![]);
        assert_eq!(next.number(), 2);
        assert_eq!(next.id().number(), 2);
    }

    #[test]
    fn block_ids_are_content_addressed() {
        let a = block(BlockId::ZERO, vec![]);
        let b = block(BlockId::ZERO, vec![tx(1)]);
        assert_eq!(a.id(), a.id());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn transaction_and_message_ids_differ() {
        let t = tx(5);
        assert_ne!(t.id().as_bytes(), t.message_id().as_bytes());
        assert_eq!(t.message_id(), Message::Transaction(t.clone()).id());
    }

    #[test]
    fn block_lists_message_ids_in_order() {
        let txs = vec![tx(1), tx(2), tx(3)];
        let expected: Vec<_> = txs.iter().map(SignedTransaction::message_id).collect();
        let b = block(BlockId::ZERO, txs);
        assert_eq!(b.transaction_message_ids(), expected);
    }

    #[test]
    fn message_item_ids_classify() {
        let b = block(BlockId::ZERO, vec![]);
        let item = Message::Block(b.clone()).item_id();
        assert_eq!(item.as_block_id(), b.id());

        let t = tx(9);
        let item = Message::Transaction(t.clone()).item_id();
        assert_eq!(item.as_transaction_id(), t.id());
    }
}
