//! User-mode side of system calls.
//! Places the call number where the kernel expects it and decodes the result.
//! Any validation here needs to be repeated in kernel for security.

use super::{decode_result, Call, SyscallError};

/// The system call interface as user code sees it.
pub trait SystemCalls {
    /// Trap into the kernel with `number` in R0 and return the R0 it leaves.
    fn invoke(&mut self, number: u32) -> i32;

    /// Ask the kernel to print a greeting.
    fn hello(&mut self) -> Result<(), SyscallError> {
        decode_result(self.invoke(Call::Hello as u32))
    }

    /// Ask the kernel to restart the machine.
    fn exit(&mut self) -> ! {
        let result = self.invoke(Call::Exit as u32);
        panic!("exit system call returned {}", result)
    }
}

/// System calls through the `svc` instruction.
#[cfg(target_os = "none")]
pub struct Svc;

#[cfg(target_os = "none")]
impl SystemCalls for Svc {
    fn invoke(&mut self, number: u32) -> i32 {
        let result: u32;
        unsafe {
            core::arch::asm!(
                // Number in R0, result comes back in R0.
                "svc 0",
                inlateout("r0") number => result,
                options(nostack),
            );
        }
        result as i32
    }
}
