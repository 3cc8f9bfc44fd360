//! `basalt-vmapi` — the virtual machine contract for the Basalt emulator.
//!
//! The emulator treats the contract interpreter as an opaque collaborator
//! behind the [`VirtualMachine`] trait: it hands the VM a procedure
//! (transaction, script, or bootstrap), a ledger view to read and write
//! through, and a programs cache, and collects logs, events, and the
//! procedure outcome afterwards.
//!
//! [`MockVm`] is the deterministic reference implementation used by tests
//! and locally-constructed emulators.

pub mod account;
pub mod context;
pub mod error;
pub mod mock;
pub mod procedure;
pub mod programs;
pub mod vm;

pub use account::{Account, AccountKey, Contract, KEY_WEIGHT_THRESHOLD};
pub use context::VmContext;
pub use error::VmError;
pub use mock::MockVm;
pub use procedure::{BootstrapProcedure, Procedure, ScriptProcedure, TransactionProcedure};
pub use programs::ProgramsCache;
pub use vm::VirtualMachine;
