//! chainhost — a blockchain full-node core hosting contract modules
//!
//! chainhost is the hosting core of a contract-capable full node. Contract
//! modules persist state in the node's ledger object database and react to
//! changes in that state; remote peers synchronize blocks against the node
//! through a logarithmically-sampled synopsis protocol.
//!
//! # Quick Start
//!
//! ```ignore
//! use chainhost::{Contract, ContractNode, SyncDelegate, TableId};
//!
//! let node = ContractNode::open("contracts.reg", ledger.clone())?;
//!
//! // Contracts first: registration and observation precede block flow.
//! node.install_contract(Contract::new("voting", |ledger, space| {
//!     ledger.create_table(space, TableId::new(0));
//!     true
//! }))?;
//!
//! // Then let peers drive the chain.
//! let delegate = SyncDelegate::new(ledger);
//! node.attach_sync(&delegate);
//! delegate.sync_from(node.ledger().head_block_id());
//! ```
//!
//! # Architecture
//!
//! The heavy lifting lives in the member crates, re-exported here:
//! - `chainhost-core`: identifiers, blocks, values, errors, the collaborator
//!   trait seams, and typed event channels
//! - `chainhost-sync`: the peer synchronization delegate
//! - `chainhost-registry`: persistent contract space assignment
//! - `chainhost-notify`: per-table change monitoring and event feeds
//!
//! The ledger/consensus engine itself is an external collaborator consumed
//! through the `ChainStore` and `ObjectDatabase` seams.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use chainhost_core::*;
pub use chainhost_notify::*;
pub use chainhost_registry::*;
pub use chainhost_sync::*;

mod node;

pub use node::{Contract, ContractNode};
