//! User-mode system calls on a Cortex-M4.
//!
//! Privileged code drops to unprivileged Thread mode on its own stack, the
//! unprivileged program traps back with `svc`, and the trap handler checks the
//! privilege level the trap came from before dispatching on the call number.
//!
//! Everything outside of [arch] and [board] is plain logic over the
//! [cpu::ProcessorState] and [cpu::Platform] traits, so it builds and tests on
//! the host. The hardware side only exists for `target_os = "none"`.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod cpu;
pub mod stack;
pub mod status;
pub mod sw_uart;
pub mod syscalls;
pub mod trampoline;
pub mod trap;
pub mod user;

#[cfg(target_os = "none")]
pub mod arch;
#[cfg(target_os = "none")]
pub mod board;

#[cfg(test)]
mod testing;
