//! Node-level wiring
//!
//! [`ContractNode`] ties the pieces together the way a running node uses
//! them: contracts are registered and placed under observation first, then
//! the sync delegate is attached and blocks begin to flow. That ordering is
//! the caller's responsibility — mutations applied before a contract's
//! tables are observed go unnoticed.
//!
//! Process-level concerns (module discovery on disk, signal handling,
//! genesis bootstrapping) belong to the embedding application, not here.

use chainhost_core::{
    ChainStore, ObjectDatabase, Result, SignedBlock, SignedTransaction, SpaceId, TableId,
};
use chainhost_notify::{observe_contract, ObservationHandle};
use chainhost_registry::ContractRegistry;
use chainhost_sync::SyncDelegate;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// An in-process contract module: a name, an optional table-name list, and
/// the registration function the registry invokes with the ledger handle
/// and the contract's assigned space.
pub struct Contract<L> {
    name: String,
    table_names: Vec<String>,
    register: Box<dyn FnOnce(&L, SpaceId) -> bool + Send>,
}

impl<L> Contract<L> {
    /// Describe a contract by name and registration function.
    pub fn new<F>(name: impl Into<String>, register: F) -> Self
    where
        F: FnOnce(&L, SpaceId) -> bool + Send + 'static,
    {
        Contract {
            name: name.into(),
            table_names: Vec::new(),
            register: Box::new(register),
        }
    }

    /// Supply human-readable table names, indexed by table id, for logging.
    pub fn with_table_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// The contract's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn table_label(names: &[String], table: TableId) -> String {
    names
        .get(table.value() as usize)
        .cloned()
        .unwrap_or_else(|| table.to_string())
}

fn render(value: &chainhost_core::Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}

/// A contract-hosting node core: registry, observation handles, and sync
/// wiring over one ledger.
pub struct ContractNode<L> {
    ledger: Arc<L>,
    registry: ContractRegistry<L>,
    monitors: Mutex<Vec<ObservationHandle>>,
}

impl<L> ContractNode<L>
where
    L: ChainStore + ObjectDatabase + 'static,
{
    /// Open the node core: the contract registry is read from
    /// `registry_path` so prior space assignments are recovered before any
    /// contract registers.
    ///
    /// # Errors
    ///
    /// Fails when the registry store cannot be opened or is corrupt.
    pub fn open(registry_path: impl AsRef<Path>, ledger: Arc<L>) -> Result<Self> {
        let registry = ContractRegistry::open(registry_path, ledger.clone())?;
        Ok(ContractNode {
            ledger,
            registry,
            monitors: Mutex::new(Vec::new()),
        })
    }

    /// The ledger this node runs over.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// The contract registry.
    pub fn registry(&self) -> &ContractRegistry<L> {
        &self.registry
    }

    /// Register a contract, place its tables under observation, and wire
    /// activity logging. Returns whether the contract initialized; failure
    /// is logged and leaves the node running.
    ///
    /// # Errors
    ///
    /// Fails on registry persistence errors, not on contract failure.
    pub fn install_contract(&self, contract: Contract<L>) -> Result<bool> {
        let Contract {
            name,
            table_names,
            register,
        } = contract;

        if !self.registry.initialize_contract(&name, register)? {
            error!(target: "chainhost::node", contract = %name, "Contract failed to initialize");
            return Ok(false);
        }

        let space = self.registry.space_id(&name)?;
        let handle = observe_contract(
            self.ledger.clone() as Arc<dyn ObjectDatabase>,
            space,
            &name,
        );

        let names = Arc::new(table_names);
        {
            let names = names.clone();
            let contract = name.clone();
            handle.feed().object_created.connect(move |e| {
                debug!(
                    target: "chainhost::node",
                    contract = %contract,
                    table = %table_label(&names, e.table),
                    object = %render(&e.object),
                    "Contract created a new object in its table"
                );
            });
        }
        {
            let names = names.clone();
            let contract = name.clone();
            handle.feed().object_deleted.connect(move |e| {
                debug!(
                    target: "chainhost::node",
                    contract = %contract,
                    table = %table_label(&names, e.table),
                    object = %render(&e.object),
                    "Contract deleted an object in its table"
                );
            });
        }
        {
            let names = names.clone();
            let contract = name.clone();
            handle.feed().object_modified.connect(move |e| {
                debug!(
                    target: "chainhost::node",
                    contract = %contract,
                    table = %table_label(&names, e.table),
                    from = %render(&e.from),
                    to = %render(&e.to),
                    "Contract modified an object in its table"
                );
            });
        }

        self.monitors.lock().push(handle);
        info!(target: "chainhost::node", contract = %name, space = %space, "Contract initialized successfully");
        Ok(true)
    }

    /// Observation handle count (one per installed contract).
    pub fn observed_contract_count(&self) -> usize {
        self.monitors.lock().len()
    }

    /// Connect the node to a sync delegate: blocks that extend the head are
    /// appended to the ledger, anything else is logged and dropped. Call
    /// after every contract is installed.
    pub fn attach_sync(&self, delegate: &SyncDelegate<L>) {
        let ledger = self.ledger.clone();
        delegate.block_received.connect(move |block: &SignedBlock| {
            if block.previous == ledger.head_block_id() {
                info!(
                    target: "chainhost::node",
                    num = block.number(),
                    time = %block.timestamp,
                    "Received next block in chain"
                );
                let id = block.id();
                if let Err(e) = ledger.apply_block(block.clone()) {
                    error!(target: "chainhost::node", error = %e, "Failed to apply block to chain");
                } else if ledger.head_block_id() != id {
                    error!(
                        target: "chainhost::node",
                        "Block applied cleanly but did not become the head"
                    );
                }
            } else {
                warn!(
                    target: "chainhost::node",
                    num = block.number(),
                    "Got a block, but it's not the next one in the chain; ignoring it"
                );
            }
        });

        delegate
            .transaction_received
            .connect(move |tx: &SignedTransaction| {
                debug!(
                    target: "chainhost::node",
                    id = %tx.id(),
                    "Received a loose transaction; leaving it to the ledger's producers"
                );
            });

        delegate.sync_finished.connect(|_| {
            info!(target: "chainhost::node", "Synchronization complete");
        });
    }

    /// Debug-dump every loaded contract's objects, table by table.
    pub fn dump_contract_databases(&self) {
        for (space, name) in self.registry.loaded_contracts() {
            debug!(target: "chainhost::node", contract = %name, space = %space, "Dumping contract database");
            self.ledger.inspect_space(space, &mut |table, value| {
                debug!(
                    target: "chainhost::node",
                    table = %table,
                    object = %render(value),
                    "Contract object"
                );
            });
        }
    }
}

impl<L> std::fmt::Debug for ContractNode<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractNode")
            .field("contracts", &self.monitors.lock().len())
            .finish()
    }
}
