//! Contract registry
//!
//! The registry hands every contract a stable object space in the ledger.
//! Assignment is permanent: a name gets the same space on every run of the
//! node, because the objects written under that space outlive any single
//! process. Initialization success is what admits a contract to the *live*
//! set; the persistent record exists either way, so a failed initializer
//! can retry later (or on the next run) and find its reservation intact.

use crate::store::RegistryStore;
use chainhost_core::{Error, Result, SpaceId};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Persistent space assignment and live-contract tracking.
///
/// `L` is the ledger handle passed through to contract initializers,
/// typically implementing the collaborator seams from `chainhost_core`.
pub struct ContractRegistry<L> {
    ledger: Arc<L>,
    store: Mutex<RegistryStore>,
    /// Space → name for contracts whose initializer has succeeded.
    live: RwLock<BTreeMap<SpaceId, String>>,
}

impl<L> ContractRegistry<L> {
    /// Open the registry, replaying persisted space assignments.
    ///
    /// # Errors
    ///
    /// Fails when the persistent store cannot be opened or is corrupt.
    pub fn open(path: impl AsRef<Path>, ledger: Arc<L>) -> Result<Self> {
        Ok(ContractRegistry {
            ledger,
            store: Mutex::new(RegistryStore::open(path)?),
            live: RwLock::new(BTreeMap::new()),
        })
    }

    /// Initialize a contract, assigning (or re-using) its object space.
    ///
    /// The initializer is invoked at most once per name per process: a name
    /// that is already live returns `true` without another invocation. On
    /// initializer failure the persistent record remains — the space stays
    /// reserved for this name forever — but the contract does not join the
    /// live set, and `false` is returned.
    ///
    /// # Errors
    ///
    /// Fails on persistence errors or space-range exhaustion; the
    /// initializer's own failure is the `Ok(false)` path, not an error.
    pub fn initialize_contract<F>(&self, name: &str, init: F) -> Result<bool>
    where
        F: FnOnce(&L, SpaceId) -> bool,
    {
        if self.live.read().values().any(|live_name| live_name == name) {
            info!(
                target: "chainhost::registry",
                contract = name,
                "Contract already initialized this run"
            );
            return Ok(true);
        }

        let space = {
            let mut store = self.store.lock();
            match store.get_by_name(name) {
                Some(record) => {
                    let space = record.space_id()?;
                    info!(
                        target: "chainhost::registry",
                        contract = name,
                        space = %space,
                        "Recognized contract, re-using its object space"
                    );
                    space
                }
                None => {
                    let record = store.create(name)?;
                    let space = record.space_id()?;
                    info!(
                        target: "chainhost::registry",
                        contract = name,
                        space = %space,
                        "Assigning contract a new object space"
                    );
                    space
                }
            }
        };

        if init(&self.ledger, space) {
            self.live.write().insert(space, name.to_string());
            Ok(true)
        } else {
            error!(
                target: "chainhost::registry",
                contract = name,
                space = %space,
                "Contract initializer failed; space stays reserved"
            );
            Ok(false)
        }
    }

    /// Space assigned to a live contract.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownContract`] when `name` never initialized
    /// successfully this run.
    pub fn space_id(&self, name: &str) -> Result<SpaceId> {
        self.live
            .read()
            .iter()
            .find(|(_, live_name)| live_name.as_str() == name)
            .map(|(space, _)| *space)
            .ok_or_else(|| Error::UnknownContract(name.to_string()))
    }

    /// Name of the live contract owning `space`.
    pub fn contract_name(&self, space: SpaceId) -> Option<String> {
        self.live.read().get(&space).cloned()
    }

    /// Space → name for every live contract.
    pub fn loaded_contracts(&self) -> BTreeMap<SpaceId, String> {
        self.live.read().clone()
    }

    /// The ledger handle initializers receive.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }
}

impl<L> std::fmt::Debug for ContractRegistry<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractRegistry")
            .field("store", &*self.store.lock())
            .field("live", &self.live.read().len())
            .finish()
    }
}
