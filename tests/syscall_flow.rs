//! Drives the whole path on the host: privileged setup, trampoline, user
//! program, traps and dispatch.

use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use stm32_user_syscall::cpu::{Platform, ProcessorState, UserEntry};
use stm32_user_syscall::stack::{StackPointer, StackRegion, UserStack};
use stm32_user_syscall::status::{Mode, Status, CONTROL_NPRIV, CONTROL_SPSEL};
use stm32_user_syscall::syscalls::kernel_mode::handle_syscall;
use stm32_user_syscall::syscalls::stubs::SystemCalls;
use stm32_user_syscall::trampoline::enter_user_mode;
use stm32_user_syscall::trap::{Trap, TrapFrame, TrapTable, VectorTable};
use stm32_user_syscall::user;

/// Single machine state shared by the privileged and unprivileged views.
#[derive(Default)]
struct Machine {
    control: u32,
    handler: u16,
    log: Vec<String>,
    partial: String,
    user_stack: Option<StackPointer>,
    resets: usize,
}

#[derive(Clone, Default)]
struct Sim(Rc<RefCell<Machine>>);

#[derive(Debug)]
struct Reset;

impl ProcessorState for Sim {
    fn current_status(&self) -> Status {
        let machine = self.0.borrow();
        Status::from_registers(machine.handler as u32, machine.control)
    }

    fn saved_status(&self, frame: &TrapFrame) -> Status {
        Status::from_registers(frame.xpsr, self.0.borrow().control)
    }
}

impl fmt::Write for Sim {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // `writeln!` may hand over one line in several pieces.
        let mut machine = self.0.borrow_mut();
        machine.partial.push_str(s);
        while let Some(end) = machine.partial.find('\n') {
            let line: String = machine.partial.drain(..=end).collect();
            machine.log.push(line.trim_end().to_string());
        }
        Ok(())
    }
}

impl Platform for Sim {
    unsafe fn switch_to_user(&mut self, _entry: UserEntry, stack: StackPointer) -> ! {
        {
            let mut machine = self.0.borrow_mut();
            machine.control = CONTROL_NPRIV | CONTROL_SPSEL;
            machine.user_stack = Some(stack);
        }
        // The host cannot change stacks; the test runs the user program itself.
        std::panic::panic_any(stack)
    }

    fn restart(&mut self) -> ! {
        let mut machine = self.0.borrow_mut();
        machine.resets += 1;
        machine.control = 0;
        drop(machine);
        std::panic::panic_any(Reset)
    }
}

impl SystemCalls for Sim {
    fn invoke(&mut self, number: u32) -> i32 {
        self.0.borrow_mut().handler = Trap::SupervisorCall as u16;
        let mut frame = TrapFrame::for_call(number, 0x0800_0200, 0);
        let mut kernel = self.clone();
        let result = handle_syscall(&mut kernel, &frame);
        frame.set_return(result);
        self.0.borrow_mut().handler = 0;
        frame.r0 as i32
    }
}

extern "C" fn unreachable_entry() -> ! {
    unreachable!("the host never branches into user code")
}

#[test]
fn user_program_runs_to_restart() {
    let stack = Box::new(UserStack::<128>::new());
    let region = UserStack::region(&*stack);
    let sim = Sim::default();

    // Privileged half: hand the top of the stack to the trampoline.
    let mut privileged = sim.clone();
    let switched = catch_unwind(AssertUnwindSafe(|| {
        enter_user_mode(&mut privileged, unreachable_entry, &region, region.top())
    }))
    .unwrap_err();
    let sp = *switched.downcast_ref::<StackPointer>().unwrap();
    assert_eq!(sp.addr(), region.top() as usize);
    assert_eq!(sim.0.borrow().user_stack, Some(sp));
    assert_eq!(sim.current_status().mode(), Mode::User);

    // Unprivileged half: a local 16 bytes below the initial stack pointer.
    let probe = sp.addr() - 16;
    let mut cpu = sim.clone();
    let mut kernel = sim.clone();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        user::run(&mut cpu, &mut kernel, &region, probe)
    }));

    assert!(outcome.unwrap_err().downcast_ref::<Reset>().is_some());
    let machine = sim.0.borrow();
    assert_eq!(machine.resets, 1);
    assert_eq!(
        machine.log,
        vec![
            "checking that stack got switched",
            "status is at user level",
            "about to call hello",
            "syscall: hello world",
            "about to call illegal system call 42",
            "illegal system call = 42!",
            "kernel rejected call 42",
            "about to call exit",
            "exiting!",
        ]
    );
}

#[test]
fn trap_from_privileged_code_is_refused() {
    let mut sim = Sim::default();
    let frame = TrapFrame::for_call(1, 0x0800_0200, 0);

    let outcome = catch_unwind(AssertUnwindSafe(|| handle_syscall(&mut sim, &frame)));

    assert!(outcome.is_err());
    assert!(sim.0.borrow().log.is_empty());
}

#[test]
fn nothing_after_exit_runs() {
    let sim = Sim::default();
    sim.0.borrow_mut().control = CONTROL_NPRIV | CONTROL_SPSEL;
    let mut kernel = sim.clone();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _ = kernel.exit();
    }));

    assert!(outcome.unwrap_err().downcast_ref::<Reset>().is_some());
    assert_eq!(sim.0.borrow().log, vec!["exiting!"]);
}

#[test]
fn svc_slot_is_the_only_change() {
    unsafe extern "C" fn svc() {
        std::hint::black_box(11);
    }

    let flash: Vec<usize> = (0..stm32_user_syscall::trap::VECTOR_COUNT)
        .map(|slot| 0x0800_0000 | (slot << 2) | 1)
        .collect();
    let mut ram = Box::new(VectorTable::zeroed());
    unsafe { ram.copy_from(flash.as_ptr()) };
    TrapTable::new()
        .with(Trap::SupervisorCall, svc)
        .write_into(&mut ram);

    for trap in Trap::ALL {
        let expected = if trap == Trap::SupervisorCall {
            svc as usize
        } else {
            flash[trap.slot()]
        };
        assert_eq!(ram.entry(trap), expected, "{:?}", trap);
    }
}

#[test]
fn region_of_a_static_stack() {
    static STACK: UserStack<32> = UserStack::new();
    let region: StackRegion = UserStack::region(&STACK);
    assert_eq!(region.end() - region.base(), UserStack::<32>::BYTES);
    assert!(region.validate(region.top()).is_ok());
}

#[test]
fn trampoline_refuses_a_stack_from_another_region() {
    let ours = Box::new(UserStack::<32>::new());
    let other = Box::new(UserStack::<32>::new());
    let region = UserStack::region(&*ours);
    let foreign_top = UserStack::region(&*other).top();
    let sim = Sim::default();

    let mut privileged = sim.clone();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        enter_user_mode(&mut privileged, unreachable_entry, &region, foreign_top)
    }));

    let message = outcome.unwrap_err();
    assert!(message.downcast_ref::<String>().unwrap().contains("outside the user stack"));
    assert!(sim.0.borrow().user_stack.is_none());
    assert_eq!(sim.current_status().mode(), Mode::Privileged);
}
