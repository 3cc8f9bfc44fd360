//! `basalt-storage` — ledger storage for the Basalt emulator.
//!
//! This crate provides the storage capability set behind the emulator:
//!
//! - [`store::Store`] — the trait the emulator depends on
//! - [`sled_store::SledStore`] — persistent store over sled with
//!   branchable on-disk snapshots
//! - [`memstore::MemStore`] — in-memory store, the default backend
//! - [`changelog::Changelog`] — per-register write-height index
//! - [`ledger::LedgerView`] — read-through versioned ledger views
//! - [`snapshot::SnapshotManager`] — checkpoint / jump over backend files

pub mod changelog;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod memstore;
pub mod sled_store;
pub mod snapshot;
pub mod store;

pub use changelog::Changelog;
pub use error::StoreError;
pub use ledger::{LedgerView, RegisterRead};
pub use memstore::MemStore;
pub use sled_store::SledStore;
pub use snapshot::SnapshotManager;
pub use store::Store;
