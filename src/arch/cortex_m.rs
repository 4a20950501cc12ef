//! ARMv7-M register access, the privilege drop and vector table relocation.

use core::arch::asm;

use cortex_m::asm::{dsb, isb};
use cortex_m::peripheral::SCB;
use cortex_m::register::control::{self, Npriv, Spsel};

use crate::cpu::UserEntry;
use crate::stack::StackPointer;
use crate::status::Status;
use crate::trap::{TrapFrame, VectorTable};

/// Read the combined program status register.
#[inline]
pub fn read_psr() -> u32 {
    let psr: u32;
    unsafe { asm!("mrs {}, xpsr", out(reg) psr, options(nomem, nostack, preserves_flags)) };
    psr
}

/// Both reads are allowed in unprivileged Thread mode.
pub fn current_status() -> Status {
    Status::from_registers(read_psr(), control::read().bits())
}

/// Status of the context that stacked `frame`.
///
/// Exception entry stacks xPSR but not CONTROL. Handler mode never changes
/// nPRIV, so the live CONTROL still describes the trapped thread.
pub fn saved_status(frame: &TrapFrame) -> Status {
    Status::from_registers(frame.xpsr, control::read().bits())
}

/// Point PSP at `stack`, make Thread mode unprivileged and running on PSP, and
/// branch to `entry`.
///
/// # Safety
/// Must be called from privileged Thread mode. `stack` must be the top of
/// memory nobody else uses.
pub unsafe fn switch_to_user(entry: UserEntry, stack: StackPointer) -> ! {
    let mut next = control::read();
    next.set_npriv(Npriv::Unprivileged);
    next.set_spsel(Spsel::Psp);

    asm!(
        // Load the user stack first: SPSEL switches SP over to PSP immediately.
        "msr psp, {sp}",
        "msr control, {control}",
        // Instructions after a CONTROL write must see the new state.
        "isb",
        "bx {entry}",
        sp = in(reg) stack.addr(),
        control = in(reg) next.bits(),
        entry = in(reg) entry as usize,
        options(noreturn),
    )
}

/// Base address of the vector table in use.
pub fn active_vector_table() -> *const usize {
    unsafe { (*SCB::PTR).vtor.read() as *const usize }
}

/// Make `table` the active vector table.
///
/// # Safety
/// Requires privileged execution. Every slot of `table` must hold a valid
/// handler for exceptions that can occur from now on.
pub unsafe fn install_vector_table(table: &'static VectorTable) {
    (*SCB::PTR).vtor.write(table.as_ptr() as u32);
    dsb();
    isb();
}
