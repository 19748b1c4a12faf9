//! Contract records
//!
//! One record exists per distinct contract name ever initialized on this
//! node. Records are created once, never mutated, never deleted: the space
//! id derived from a record must keep meaning the same contract for as long
//! as the ledger holds objects written under it.

use chainhost_core::{Error, Result, SpaceId, FIRST_CONTRACT_SPACE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contract known to this node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Sequential id, assigned in allocation order and never reused.
    pub id: u64,
    /// Unique contract name.
    pub name: String,
    /// When this contract was first registered.
    pub registered_at: DateTime<Utc>,
}

impl ContractRecord {
    /// The ledger object space assigned to this contract: allocation order
    /// offset from the first contract space.
    ///
    /// # Errors
    ///
    /// Fails when the record id would place the space beyond the valid
    /// space range; a wrapped id would alias another contract's namespace.
    pub fn space_id(&self) -> Result<SpaceId> {
        let base = u64::from(FIRST_CONTRACT_SPACE.value());
        let raw = base + self.id;
        u8::try_from(raw)
            .map(SpaceId::new)
            .map_err(|_| Error::InvalidOperation(format!("contract space range exhausted at id {}", self.id)))
    }
}
