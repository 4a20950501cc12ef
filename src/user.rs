//! The program that runs in user mode.

use core::fmt::{self, Write};

use crate::config::ILLEGAL_CALL_DEMO;
use crate::cpu::ProcessorState;
use crate::stack::StackRegion;
use crate::status::Mode;
use crate::syscalls::stubs::SystemCalls;
use crate::syscalls::SyscallError;

/// Ways the user program can find itself in the wrong context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextError {
    /// A local variable lives outside the user stack.
    StackNotSwitched(usize),
    /// Running at some level other than user mode.
    NotUserMode(Mode),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::StackNotSwitched(addr) => {
                write!(f, "stack was not switched: local at {:#x}", addr)
            }
            ContextError::NotUserMode(mode) => write!(f, "mode = {}: expected {}", mode, Mode::User),
        }
    }
}

/// Check that we run in user mode on `stack`. `probe` is the address of a
/// local variable of the caller.
pub fn check_context<C: ProcessorState>(
    cpu: &C,
    stack: &StackRegion,
    probe: usize,
) -> Result<(), ContextError> {
    if !stack.contains(probe) {
        return Err(ContextError::StackNotSwitched(probe));
    }
    match cpu.current_status().mode() {
        Mode::User => Ok(()),
        mode => Err(ContextError::NotUserMode(mode)),
    }
}

/// Body of the user program: check the context, then say hello, try an
/// illegal call and exit.
///
/// `cpu` doubles as the console. Every call goes through `kernel`.
pub fn run<C, K>(cpu: &mut C, kernel: &mut K, stack: &StackRegion, probe: usize) -> !
where
    C: ProcessorState + Write,
    K: SystemCalls,
{
    let _ = writeln!(cpu, "checking that stack got switched");
    if let Err(e) = check_context(cpu, stack, probe) {
        panic!("{}", e);
    }
    let _ = writeln!(cpu, "status is at user level");

    let _ = writeln!(cpu, "about to call hello");
    if let Err(e) = kernel.hello() {
        panic!("hello failed: {:?}", e);
    }

    let _ = writeln!(cpu, "about to call illegal system call {}", ILLEGAL_CALL_DEMO);
    match crate::syscalls::decode_result(kernel.invoke(ILLEGAL_CALL_DEMO)) {
        Err(SyscallError::Illegal) => {
            let _ = writeln!(cpu, "kernel rejected call {}", ILLEGAL_CALL_DEMO);
        }
        other => panic!("call {} returned {:?}, expected rejection", ILLEGAL_CALL_DEMO, other),
    }

    let _ = writeln!(cpu, "about to call exit");
    kernel.exit()
}
