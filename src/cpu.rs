//! Hardware-access boundary.
//!
//! The trampoline, the dispatcher and the user program only see the machine
//! through these traits. [crate::board::Board] implements them on the real
//! core; tests use a mock.

use core::fmt::Write;

use crate::stack::StackPointer;
use crate::status::Status;
use crate::trap::TrapFrame;

/// Entry point of code that runs in user mode. It has nowhere to return to.
pub type UserEntry = extern "C" fn() -> !;

/// Read access to the processor status.
pub trait ProcessorState {
    /// The live status of the running context.
    fn current_status(&self) -> Status;

    /// The status of the context that was interrupted by the trap that
    /// stacked `frame`. Only meaningful inside that trap's handler.
    fn saved_status(&self, frame: &TrapFrame) -> Status;
}

/// Everything privileged code needs from the machine. The [Write] half is the
/// console diagnostics go to.
pub trait Platform: ProcessorState + Write {
    /// Switch Thread mode to unprivileged execution on the process stack
    /// `stack` and branch to `entry`.
    ///
    /// # Safety
    /// `entry` must be safe to run unprivileged and `stack` must point to the
    /// top of memory reserved for it.
    unsafe fn switch_to_user(&mut self, entry: UserEntry, stack: StackPointer) -> !;

    /// Reset the whole system.
    fn restart(&mut self) -> !;
}
