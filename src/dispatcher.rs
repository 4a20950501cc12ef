//! Exception handlers and the vector table that routes `svc` to the kernel.

use core::fmt::Write;
use core::ptr::addr_of_mut;

use cortex_m::asm::bkpt;
use cortex_m_rt::{exception, ExceptionFrame};

use stm32_user_syscall::arch::cortex_m as arch;
use stm32_user_syscall::board::{Board, Console};
use stm32_user_syscall::syscalls::kernel_mode::handle_syscall;
use stm32_user_syscall::trap::{Installation, Trap, TrapError, TrapFrame, TrapTable, VectorTable};

static INSTALLATION: Installation = Installation::new();

/// RAM copy of the vector table. Written once by [install].
static mut VECTORS: VectorTable = VectorTable::zeroed();

/// Copy the active vector table to RAM, route SVCall to [svc_entry] and make
/// the copy active.
pub fn install() -> Result<(), TrapError> {
    INSTALLATION.claim()?;

    // The claim above makes this the only reference ever taken.
    let vectors: &'static mut VectorTable = unsafe { &mut *addr_of_mut!(VECTORS) };
    unsafe { vectors.copy_from(arch::active_vector_table()) };
    TrapTable::new()
        .with(Trap::SupervisorCall, svc_entry)
        .write_into(vectors);

    log::info!(
        "installing vector table at {:p}, msp={:#x} svc -> {:#x}",
        vectors.as_ptr(),
        vectors.initial_stack_pointer(),
        vectors.entry(Trap::SupervisorCall)
    );
    unsafe { arch::install_vector_table(vectors) };
    Ok(())
}

/// SVCall entry.
///
/// The hardware has stacked R0-R3, R12, LR, PC and xPSR on the stack the caller
/// was using. Find that stack, pass its address to [svc_dispatch] and return
/// through the EXC_RETURN value in LR, which resumes after the `svc`.
#[unsafe(naked)]
unsafe extern "C" fn svc_entry() {
    // Link Register decoding
    // F1 = 1 0001 = Handler, No FP, MSP
    // F9 = 1 1001 = Thread, No FP, MSP
    // FD = 1 1101 = Thread, No FP, PSP
    // E1 = 0 0001 = Handler, FP, MSP
    // E9 = 0 1001 = Thread, FP, MSP
    // ED = 0 1101 = Thread, FP, PSP
    //
    // 1 0001
    // ^ ^^
    // | |+------- Stack
    // | +-------- Mode
    // +---------- FP
    core::arch::naked_asm!(
        // Bit 2 of EXC_RETURN selects the stack the frame was pushed to.
        "tst lr, #4",
        "ite eq",
        "mrseq r0, msp",
        "mrsne r0, psp",
        // R4 only keeps the stack 8-byte aligned across the call.
        "push {{r4, lr}}",
        "bl {dispatch}",
        "pop {{r4, pc}}",
        dispatch = sym svc_dispatch,
    )
}

/// Run the system call and leave its result in the stacked R0.
extern "C" fn svc_dispatch(frame: &mut TrapFrame) {
    let result = handle_syscall(&mut Board, frame);
    frame.set_return(result);
}

#[exception]
unsafe fn HardFault(frame: &ExceptionFrame) -> ! {
    let core_peripherals = cortex_m::peripheral::Peripherals::steal();
    let cfsr = core_peripherals.SCB.cfsr.read();
    let usage_fault = (cfsr >> 16) as u16;
    let bus_fault = ((cfsr >> 8) & 0xff) as u8;
    let memory_fault = cfsr as u8;

    let mut console = Console;
    let _ = writeln!(console, "Hard Fault {:?}", frame);
    let _ = writeln!(console, "UFSR={:#018b}", usage_fault);
    let _ = writeln!(console, "BFSR={:#010b}", bus_fault);
    let _ = writeln!(console, "MMFSR={:#010b}", memory_fault);

    // Recovery is highly unlikely, so we simply wait for a manual reset and allow debugging.
    loop {
        bkpt()
    }
}

#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    panic!("unhandled exception {}", irqn);
}
