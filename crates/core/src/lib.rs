//! Core types and traits for chainhost
//!
//! This crate defines the foundational pieces used throughout the node:
//! - Identifiers: BlockId, TransactionId, MessageId, ChainId, ItemId,
//!   SpaceId, TableId
//! - Block/transaction/message carriers for the sync protocol
//! - Value: canonical object snapshot model
//! - Error: error type hierarchy
//! - Traits: collaborator seams (ChainStore, ObjectDatabase, TableObserver)
//! - Signal: synchronous subscription-ordered event channels
//! - testing: in-memory reference ledger for the test suites

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod error;
pub mod signal;
pub mod testing;
pub mod traits;
pub mod types;
pub mod value;

pub use block::{Message, SignedBlock, SignedTransaction};
pub use error::{Error, Result};
pub use signal::{ListenerId, Signal};
pub use traits::{ChainStore, ObjectDatabase, ObserverId, TableObserver};
pub use types::{
    BlockId, BlockNum, ChainId, ItemId, ItemType, MessageId, SpaceId, TableId, TransactionId,
    BLOCK_MESSAGE_TYPE, FIRST_CONTRACT_SPACE, TRANSACTION_MESSAGE_TYPE,
};
pub use value::Value;
