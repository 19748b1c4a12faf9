//! Core identifier types for chainhost
//!
//! This module defines the foundational identifiers:
//! - BlockId / TransactionId / MessageId / ChainId: 32-byte digests
//! - ItemId / ItemType: wire-level item references used by the sync protocol
//! - SpaceId / TableId: object-database namespace coordinates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Block height within a chain. Block numbers start at 1; 0 means "no block".
pub type BlockNum = u32;

/// Wire type code for transaction items (fixed by the peer protocol).
pub const TRANSACTION_MESSAGE_TYPE: u32 = 1000;
/// Wire type code for block items (fixed by the peer protocol).
pub const BLOCK_MESSAGE_TYPE: u32 = 1001;

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

/// Unique identifier for a block.
///
/// The first four bytes carry the big-endian block number, so the height of
/// any referenced block is recoverable from its id alone without a lookup.
/// The remaining 28 bytes are a digest tail. The all-zero id is the empty
/// sentinel ("no block"), used by peers with an empty chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId([u8; 32]);

impl BlockId {
    /// The empty sentinel id.
    pub const ZERO: BlockId = BlockId([0u8; 32]);

    /// Build an id from a block number and a digest. The number overwrites
    /// the first four bytes of the digest.
    pub fn from_parts(number: BlockNum, digest: [u8; 32]) -> Self {
        let mut bytes = digest;
        bytes[0..4].copy_from_slice(&number.to_be_bytes());
        BlockId(bytes)
    }

    /// Reconstruct an id from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        BlockId(bytes)
    }

    /// The block number embedded in this id. Zero for the sentinel.
    pub fn number(&self) -> BlockNum {
        let mut num = [0u8; 4];
        num.copy_from_slice(&self.0[0..4]);
        BlockNum::from_be_bytes(num)
    }

    /// Whether this is the empty sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Raw bytes of this id.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// Unique identifier for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId([u8; 32]);

impl TransactionId {
    /// Reconstruct an id from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        TransactionId(bytes)
    }

    /// Raw bytes of this id.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// Identifier of a framed wire message, used by the network layer to
/// deduplicate items it has already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId([u8; 32]);

impl MessageId {
    /// Reconstruct an id from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        MessageId(bytes)
    }

    /// Raw bytes of this id.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// Identifier of a chain, fixed at genesis. Peers on different chain ids
/// must never exchange blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId([u8; 32]);

impl ChainId {
    /// Reconstruct an id from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        ChainId(bytes)
    }

    /// Raw bytes of this id.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// Classification of a wire item reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    /// A full signed block.
    Block,
    /// A signed transaction.
    Transaction,
}

impl ItemType {
    /// Classify a raw wire type code. Returns None for codes this node does
    /// not recognize; callers treat that as a protocol error.
    pub fn from_wire(raw: u32) -> Option<ItemType> {
        match raw {
            BLOCK_MESSAGE_TYPE => Some(ItemType::Block),
            TRANSACTION_MESSAGE_TYPE => Some(ItemType::Transaction),
            _ => None,
        }
    }

    /// The wire type code for this classification.
    pub fn as_wire(&self) -> u32 {
        match self {
            ItemType::Block => BLOCK_MESSAGE_TYPE,
            ItemType::Transaction => TRANSACTION_MESSAGE_TYPE,
        }
    }
}

/// Wire-level reference to an item a peer may request or announce.
///
/// The type code is carried raw: remote peers may send codes this node does
/// not understand, and those must be representable so the error can be
/// reported instead of dropped at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId {
    /// Raw wire type code (see [`ItemType::from_wire`]).
    pub item_type: u32,
    /// 32-byte item hash; a block id or transaction id depending on type.
    pub hash: [u8; 32],
}

impl ItemId {
    /// Reference to a block.
    pub fn block(id: BlockId) -> Self {
        ItemId {
            item_type: BLOCK_MESSAGE_TYPE,
            hash: *id.as_bytes(),
        }
    }

    /// Reference to a transaction.
    pub fn transaction(id: TransactionId) -> Self {
        ItemId {
            item_type: TRANSACTION_MESSAGE_TYPE,
            hash: *id.as_bytes(),
        }
    }

    /// Classify the raw type code.
    pub fn classify(&self) -> Option<ItemType> {
        ItemType::from_wire(self.item_type)
    }

    /// The hash interpreted as a block id.
    pub fn as_block_id(&self) -> BlockId {
        BlockId::from_bytes(self.hash)
    }

    /// The hash interpreted as a transaction id.
    pub fn as_transaction_id(&self) -> TransactionId {
        TransactionId::from_bytes(self.hash)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.item_type)?;
        write_hex(f, &self.hash)
    }
}

/// Object-database namespace assigned to one contract.
///
/// Spaces below [`FIRST_CONTRACT_SPACE`] are reserved for the ledger engine
/// itself; contract spaces are allocated upward from there and are never
/// reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpaceId(u8);

/// The lowest object space assignable to a contract.
pub const FIRST_CONTRACT_SPACE: SpaceId = SpaceId(10);

impl SpaceId {
    /// Wrap a raw space number.
    pub const fn new(raw: u8) -> Self {
        SpaceId(raw)
    }

    /// Raw space number.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A typed table (object collection) within a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(u8);

impl TableId {
    /// Wrap a raw table number.
    pub const fn new(raw: u8) -> Self {
        TableId(raw)
    }

    /// Raw table number.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_embeds_number() {
        let id = BlockId::from_parts(42, [0xAB; 32]);
        assert_eq!(id.number(), 42);
        assert_eq!(&id.as_bytes()[4..], &[0xAB; 28]);
    }

    #[test]
    fn block_id_zero_sentinel() {
        assert!(BlockId::ZERO.is_zero());
        assert_eq!(BlockId::ZERO.number(), 0);
        assert!(!BlockId::from_parts(1, [0; 32]).is_zero());
    }

    #[test]
    fn block_id_display_is_hex() {
        let id = BlockId::from_parts(1, [0; 32]);
        let s = id.to_string();
        assert_eq!(s.len(), 64);
        assert!(s.starts_with("00000001"));
    }

    #[test]
    fn item_type_wire_round_trip() {
        assert_eq!(ItemType::from_wire(BLOCK_MESSAGE_TYPE), Some(ItemType::Block));
        assert_eq!(
            ItemType::from_wire(TRANSACTION_MESSAGE_TYPE),
            Some(ItemType::Transaction)
        );
        assert_eq!(ItemType::from_wire(0), None);
        assert_eq!(ItemType::from_wire(9999), None);
        assert_eq!(ItemType::Block.as_wire(), BLOCK_MESSAGE_TYPE);
    }

    #[test]
    fn item_id_classification() {
        let block_id = BlockId::from_parts(7, [1; 32]);
        let item = ItemId::block(block_id);
        assert_eq!(item.classify(), Some(ItemType::Block));
        assert_eq!(item.as_block_id(), block_id);

        let unknown = ItemId {
            item_type: 1234,
            hash: [0; 32],
        };
        assert_eq!(unknown.classify(), None);
    }

    #[test]
    fn space_id_ordering() {
        assert!(SpaceId::new(10) < SpaceId::new(11));
        assert_eq!(FIRST_CONTRACT_SPACE.value(), 10);
    }

    proptest::proptest! {
        #[test]
        fn block_id_number_round_trips(number in 0u32.., digest in proptest::array::uniform32(0u8..)) {
            let id = BlockId::from_parts(number, digest);
            proptest::prop_assert_eq!(id.number(), number);
            proptest::prop_assert_eq!(&id.as_bytes()[4..], &digest[4..]);
        }

        #[test]
        fn block_ids_order_by_number_first(a in 0u32..1000, b in 0u32..1000) {
            let id_a = BlockId::from_parts(a, [0xFF; 32]);
            let id_b = BlockId::from_parts(b, [0x00; 32]);
            if a < b {
                proptest::prop_assert!(id_a < id_b);
            }
        }
    }
}
