//! The virtual machine trait.

use basalt_primitives::Address;
use basalt_storage::LedgerView;

use crate::account::Account;
use crate::context::VmContext;
use crate::error::VmError;
use crate::procedure::Procedure;
use crate::programs::ProgramsCache;

/// The contract interpreter the emulator drives.
///
/// Implementations must be deterministic: the same procedure against the
/// same view always produces the same outputs. `run` returns `Err` only
/// for fatal engine failures, which abort the pipeline; procedure-level
/// failures are recorded on the procedure's error fields.
pub trait VirtualMachine: Send + Sync {
    /// Execute a procedure against the view, filling its output fields.
    fn run(
        &self,
        ctx: &VmContext,
        procedure: &mut Procedure,
        view: &mut LedgerView,
        programs: &mut ProgramsCache,
    ) -> Result<(), VmError>;

    /// Materialize the account stored at `address` in the view, if any.
    fn get_account(
        &self,
        ctx: &VmContext,
        address: &Address,
        view: &LedgerView,
        programs: &mut ProgramsCache,
    ) -> Result<Option<Account>, VmError>;
}
