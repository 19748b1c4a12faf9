//! Error types for chainhost
//!
//! One error enum covers the whole node core. Protocol failures
//! (`UnreachableFork`, `UnreachableHistory`, `UnknownItem`) are surfaced to
//! the networking collaborator, which decides whether to drop or penalize the
//! peer; nothing in this core treats an error as fatal.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.

use crate::types::BlockNum;
use std::io;
use thiserror::Error;

/// Result type alias for chainhost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the node core
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Peer's synopsis shares no block with our main chain
    #[error("Unable to provide a list of blocks starting at any block in the peer's synopsis")]
    UnreachableFork,

    /// Peer's last common block predates the local undo horizon
    #[error(
        "Peer forked too long ago: chains diverge after block #{diverged_at} \
         but history is only undoable back to block #{horizon}"
    )]
    UnreachableHistory {
        /// Block number after which the chains diverge
        diverged_at: BlockNum,
        /// Oldest block number still fork-distinguishable locally
        horizon: BlockNum,
    },

    /// Requested item type is neither block nor transaction, or the item
    /// itself is missing
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// Space-id lookup for a contract that never initialized successfully
    #[error("Unknown contract: {0}")]
    UnknownContract(String),

    /// Data corruption detected in a persistent store
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unreachable_history_names_both_heights() {
        let err = Error::UnreachableHistory {
            diverged_at: 50,
            horizon: 80,
        };
        let msg = err.to_string();
        assert!(msg.contains("#50"));
        assert!(msg.contains("#80"));
    }

    #[test]
    fn display_unknown_item() {
        let err = Error::UnknownItem("item type 1234".to_string());
        assert!(err.to_string().contains("item type 1234"));
    }

    #[test]
    fn from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn from_bincode() {
        let invalid = vec![0xFF; 3];
        let result: Result<String> = bincode::deserialize(&invalid).map_err(|e| e.into());
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn result_alias() {
        fn ok() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok().unwrap(), 42);
    }
}
