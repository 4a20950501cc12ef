//! Host stand-ins for the hardware boundary.

use core::fmt;

use crate::cpu::{Platform, ProcessorState, UserEntry};
use crate::stack::StackPointer;
use crate::status::{Status, CONTROL_NPRIV, CONTROL_SPSEL};
use crate::trap::{Trap, TrapFrame};

/// Stacked xPSR of code that was itself running the SysTick handler.
pub const HANDLER_MODE_PSR: u32 = Trap::SysTick as u32;

/// Message the mock uses to leave [Platform::switch_to_user].
pub const SWITCHED: &str = "switched to user mode";

/// Message the mock uses to leave [Platform::restart].
pub const RESTARTED: &str = "system restart";

/// Records what privileged code asked of the machine.
///
/// The `!`-returning operations unwind with [SWITCHED] or [RESTARTED] after
/// recording themselves, since a test cannot really leave the host process.
pub struct MockPlatform {
    pub psr: u32,
    pub control: u32,
    pub console: String,
    pub restarted: bool,
    pub switched: Option<(usize, StackPointer)>,
}

impl MockPlatform {
    /// Privileged Thread mode on the main stack, as after reset.
    pub fn privileged_thread() -> Self {
        Self {
            psr: 0,
            control: 0,
            console: String::new(),
            restarted: false,
            switched: None,
        }
    }

    /// Inside the SVCall handler, trapped from unprivileged Thread mode.
    pub fn in_user_trap() -> Self {
        Self {
            psr: Trap::SupervisorCall as u32,
            control: CONTROL_NPRIV | CONTROL_SPSEL,
            ..Self::privileged_thread()
        }
    }

    /// Inside the SVCall handler, trapped from privileged Thread mode.
    pub fn in_privileged_trap() -> Self {
        Self {
            psr: Trap::SupervisorCall as u32,
            ..Self::privileged_thread()
        }
    }
}

impl ProcessorState for MockPlatform {
    fn current_status(&self) -> Status {
        Status::from_registers(self.psr, self.control)
    }

    fn saved_status(&self, frame: &TrapFrame) -> Status {
        Status::from_registers(frame.xpsr, self.control)
    }
}

impl fmt::Write for MockPlatform {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.console.push_str(s);
        Ok(())
    }
}

impl Platform for MockPlatform {
    unsafe fn switch_to_user(&mut self, entry: UserEntry, stack: StackPointer) -> ! {
        self.control = CONTROL_NPRIV | CONTROL_SPSEL;
        self.switched = Some((entry as usize, stack));
        panic!("{}", SWITCHED)
    }

    fn restart(&mut self) -> ! {
        self.restarted = true;
        panic!("{}", RESTARTED)
    }
}
