//! System Calls are implemented here.
//!
//! ## How it works:
//! User code places the call number in R0 and executes `svc 0`. The immediate
//! of the `svc` instruction is ignored; R0 alone selects the call.
//!
//! The `svc` instruction triggers the SVCall exception. Its handler (installed
//! through [crate::trap::TrapTable]) finds the stacked registers on whichever
//! stack the caller used and hands them to [kernel_mode::handle_syscall]. That
//! function checks that the trap came from user mode, decodes the number into
//! a [Call] and performs it. The result is written back into the stacked R0,
//! so the caller sees it in R0 right after its `svc` instruction.
//!
//! [stubs] holds the user-mode side.

pub mod kernel_mode;
pub mod stubs;

/// Calls the kernel understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Call {
    /// Print a greeting.
    Hello = 1,
    /// Restart the machine. Does not return.
    Exit = 2,
}

/// A call number that does not name a [Call].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IllegalCall(pub u32);

impl TryFrom<u32> for Call {
    type Error = IllegalCall;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            x if x == Self::Hello as u32 => Ok(Self::Hello),
            x if x == Self::Exit as u32 => Ok(Self::Exit),
            other => Err(IllegalCall(other)),
        }
    }
}

/// Value a system call leaves in R0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ReturnCode {
    /// Operation succeeded.
    Ok = 0,
    /// The call number was not recognised.
    IllegalCall = -1,
}

/// Possible error during syscall, as seen by user code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyscallError {
    /// Kernel rejected the call number.
    Illegal,
    /// Kernel returned something that is not a [ReturnCode].
    Unknown(i32),
}

impl TryFrom<i32> for ReturnCode {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            x if x == Self::Ok as i32 => Ok(Self::Ok),
            x if x == Self::IllegalCall as i32 => Ok(Self::IllegalCall),
            _other => Err(()),
        }
    }
}

/// Turn the raw R0 result of a call into a [Result].
pub fn decode_result(value: i32) -> Result<(), SyscallError> {
    match ReturnCode::try_from(value) {
        Ok(ReturnCode::Ok) => Ok(()),
        Ok(ReturnCode::IllegalCall) => Err(SyscallError::Illegal),
        Err(()) => Err(SyscallError::Unknown(value)),
    }
}
