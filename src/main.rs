//! User-mode system call lab.
//!
//! Installs a vector table with our own SVCall handler, drops to unprivileged
//! Thread mode on a dedicated stack and lets [user::run] issue system calls.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod dispatcher;

#[cfg(target_os = "none")]
mod firmware {
    use core::fmt::Write;
    use core::panic::PanicInfo;
    use core::ptr::addr_of;

    use cortex_m_rt::entry;
    use stm32f4xx_hal::{pac, prelude::*, serial::Config};

    use stm32_user_syscall::board::{self, Board, Console};
    use stm32_user_syscall::config::{CONSOLE_BAUD, HSE_MHZ, LOG_LEVEL, USER_STACK_WORDS};
    use stm32_user_syscall::stack::UserStack;
    use stm32_user_syscall::syscalls::stubs::Svc;
    use stm32_user_syscall::{trampoline, user};

    use crate::dispatcher;

    /// Stack the user program runs on. Only touched through raw pointers.
    static mut USER_STACK: UserStack<USER_STACK_WORDS> = UserStack::new();

    #[panic_handler]
    fn panic_handler(info: &PanicInfo) -> ! {
        cortex_m::interrupt::disable();
        let mut console = Console;
        if let Some(location) = info.location() {
            let _ = writeln!(
                console,
                "PANIC: {}:{}:{}: {}",
                location.file(),
                location.line(),
                location.column(),
                info.message()
            );
        } else {
            let _ = writeln!(console, "PANIC: {}", info.message());
        }
        loop {
            cortex_m::asm::wfi();
        }
    }

    #[entry]
    fn main() -> ! {
        let dp = pac::Peripherals::take().expect("device peripherals taken twice");

        let rcc = dp.RCC.constrain();
        let clocks = rcc.cfgr.use_hse(HSE_MHZ.MHz()).freeze();

        let gpioa = dp.GPIOA.split();
        let pins = (gpioa.pa2.into_alternate(), gpioa.pa3.into_alternate());
        let config = Config::default().baudrate(CONSOLE_BAUD.bps());
        let serial = dp
            .USART2
            .serial::<u8>(pins, config, &clocks)
            .expect("invalid console configuration");
        let (tx, _rx) = serial.split();
        board::attach_console(tx);

        if board::init_logging(LOG_LEVEL).is_err() {
            let _ = writeln!(Console, "logger already installed");
        }
        log::info!("core clock is at {} Hz", clocks.hclk().raw());

        // Vector table with our SVCall handler. Must be in place before any
        // user code can trap.
        dispatcher::install().expect("vector table installed twice");

        // Stack grows down, so start at the top of the region.
        let region = UserStack::region(unsafe { addr_of!(USER_STACK) });
        let sp = region.top();
        log::debug!("user stack {:?}", region);

        let _ = writeln!(Console, "calling user program with stack={:p}", sp);
        trampoline::enter_user_mode(&mut Board, app, &region, sp)
    }

    /// Runs unprivileged on [USER_STACK].
    extern "C" fn app() -> ! {
        let local = 0u64;
        let probe = core::hint::black_box(&local) as *const u64 as usize;
        let region = UserStack::region(unsafe { addr_of!(USER_STACK) });
        user::run(&mut Board, &mut Svc, &region, probe)
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("this is firmware; build it with `--target thumbv7em-none-eabihf`");
}
