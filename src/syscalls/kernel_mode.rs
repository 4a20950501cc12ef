//! Kernel-side code for system calls.
//! Checks where the trap came from, reads the call number and performs the call.

use core::fmt::Write;

use super::{Call, IllegalCall, ReturnCode};
use crate::cpu::Platform;
use crate::status::Mode;
use crate::trap::TrapFrame;

/// Handle the `svc` that stacked `frame`. Only trap glue calls this.
///
/// Returns the value for the caller's R0. A trap from anything but user mode
/// means the vector table or the trampoline is set up wrong, and is fatal.
pub fn handle_syscall<P: Platform>(platform: &mut P, frame: &TrapFrame) -> i32 {
    let mode = platform.saved_status(frame).mode();
    if mode != Mode::User {
        panic!(
            "mode = {}: expected {} (svc at {:#010x})",
            mode,
            Mode::User,
            frame.trapped_pc()
        );
    }
    log::trace!(
        "success: saved status is at user level: mode={} pc={:#010x}",
        mode,
        frame.trapped_pc()
    );

    // Console output is best effort; a broken console must not change the result.
    match Call::try_from(frame.call_number()) {
        Ok(Call::Hello) => {
            let _ = writeln!(platform, "syscall: hello world");
            ReturnCode::Ok as i32
        }
        Ok(Call::Exit) => {
            let _ = writeln!(platform, "exiting!");
            platform.restart()
        }
        Err(IllegalCall(number)) => {
            // R0 holds a signed word.
            let _ = writeln!(platform, "illegal system call = {}!", number as i32);
            ReturnCode::IllegalCall as i32
        }
    }
}
