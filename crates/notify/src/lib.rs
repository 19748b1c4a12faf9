//! Change notification for chainhost contracts
//!
//! Contracts react to what happens inside their ledger object space. This
//! crate turns the object database's raw per-table lifecycle callbacks into
//! structured events on four independently subscribable channels per
//! contract:
//! - [`ChangeFeed`]: the channels (`object_loaded`, `object_created`,
//!   `object_deleted`, `object_modified`)
//! - [`ObjectChange`] / [`ObjectUpdate`]: the event payloads
//! - [`observe_contract`] / [`ObservationHandle`]: attaching monitors to
//!   every table in a contract's space, and detaching them all on drop
//!
//! Events are dispatched synchronously inside the mutation call stack, in
//! mutation order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod events;
pub mod monitor;

pub use events::{ChangeFeed, ObjectChange, ObjectUpdate};
pub use monitor::{observe_contract, ObservationHandle};
