//! One-way switch from privileged to user mode.

use crate::cpu::{Platform, UserEntry};
use crate::stack::StackRegion;

/// Run `entry` in user mode with `stack_top` as its stack pointer.
///
/// `stack_top` must be non-null, 8-byte aligned and point into `region`;
/// anything else is a bug in the caller and panics before the mode changes.
/// User mode has no way back except through a trap, so this never returns.
pub fn enter_user_mode<P: Platform>(
    platform: &mut P,
    entry: UserEntry,
    region: &StackRegion,
    stack_top: *mut u64,
) -> ! {
    let stack = match region.validate(stack_top) {
        Ok(stack) => stack,
        Err(e) => panic!("{}", e),
    };

    log::debug!(
        "entering user mode: entry={:#x} sp={:#x} from {:?}",
        entry as usize,
        stack.addr(),
        platform.current_status()
    );
    unsafe { platform.switch_to_user(entry, stack) }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::cpu::ProcessorState;
    use crate::stack::{StackRegion, UserStack};
    use crate::status::Mode;
    use crate::testing::{MockPlatform, SWITCHED};

    extern "C" fn user_entry() -> ! {
        unreachable!("user code does not run on the host")
    }

    const REGION: StackRegion = StackRegion::new(0x2000_0000, 0x200);

    fn enter(platform: &mut MockPlatform, region: &StackRegion, sp: *mut u64) -> String {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            enter_user_mode(platform, user_entry, region, sp)
        }));
        let payload = outcome.unwrap_err();
        payload.downcast_ref::<String>().cloned().unwrap_or_default()
    }

    #[test]
    fn switches_with_the_given_stack() {
        let stack = Box::new(UserStack::<64>::new());
        let region = UserStack::region(&*stack);
        let mut platform = MockPlatform::privileged_thread();

        assert_eq!(enter(&mut platform, &region, region.top()), SWITCHED);

        let (entry, sp) = platform.switched.unwrap();
        assert_eq!(entry, user_entry as usize);
        assert_eq!(sp.addr(), region.top() as usize);
        assert_eq!(platform.current_status().mode(), Mode::User);
    }

    #[test]
    fn any_aligned_pointer_in_the_region_lands_in_user_mode() {
        let region = StackRegion::new(0x2000_0000, 0x80);
        for addr in (region.base() + 8..=region.end()).step_by(8) {
            let mut platform = MockPlatform::privileged_thread();
            enter(&mut platform, &region, addr as *mut u64);

            let (_, sp) = platform.switched.unwrap();
            assert!(region.contains(sp.addr() - 8));
            assert_eq!(platform.current_status().mode(), Mode::User);
        }
    }

    #[test]
    fn misaligned_stack_fails_before_switching() {
        let mut platform = MockPlatform::privileged_thread();

        let message = enter(&mut platform, &REGION, 0x2000_0104 as *mut u64);

        assert!(message.contains("stack must be 8 byte aligned"));
        assert!(platform.switched.is_none());
        assert_eq!(platform.current_status().mode(), Mode::Privileged);
    }

    #[test]
    fn stack_outside_the_region_fails_before_switching() {
        // Just past the end, at the base itself and far away.
        for addr in [0x2000_0208usize, 0x2000_0000, 0x1000_0000] {
            let mut platform = MockPlatform::privileged_thread();

            let message = enter(&mut platform, &REGION, addr as *mut u64);

            assert_eq!(message, format!("stack pointer {:#x} is outside the user stack", addr));
            assert!(platform.switched.is_none());
            assert_eq!(platform.current_status().mode(), Mode::Privileged);
        }
    }

    #[test]
    #[should_panic(expected = "user stack pointer is null")]
    fn null_stack_is_rejected() {
        let mut platform = MockPlatform::privileged_thread();
        enter_user_mode(&mut platform, user_entry, &REGION, core::ptr::null_mut());
    }
}
