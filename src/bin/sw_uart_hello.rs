//! Checks that the bit-banged UART works.
//!
//! Prints a greeting [SW_UART_HELLO_COUNT] times on PA9 (D8 on the Nucleo
//! header) through the software UART, with progress on the USART2 console
//! before and after.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod firmware {
    use core::fmt::Write;
    use core::panic::PanicInfo;

    use cortex_m_rt::entry;
    use stm32f4xx_hal::{pac, prelude::*, serial::Config};

    use stm32_user_syscall::board::{self, Console, Dwt};
    use stm32_user_syscall::config::{
        CONSOLE_BAUD, HSE_MHZ, LOG_LEVEL, SW_UART_BAUD, SW_UART_HELLO_COUNT,
    };
    use stm32_user_syscall::sw_uart::SwUart;

    #[panic_handler]
    fn panic_handler(info: &PanicInfo) -> ! {
        cortex_m::interrupt::disable();
        let _ = writeln!(Console, "PANIC: {}", info);
        loop {
            cortex_m::asm::wfi();
        }
    }

    #[entry]
    fn main() -> ! {
        let mut cp = cortex_m::Peripherals::take().expect("core peripherals taken twice");
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

        cp.DCB.enable_trace();
        cp.DWT.enable_cycle_counter();

        log::info!("about to print `hello world` {}x", SW_UART_HELLO_COUNT);
        log::info!("if nothing arrives on PA9, the pin is not transmitting");

        let tx_pin = gpioa.pa9.into_push_pull_output();
        let mut uart = match SwUart::new(tx_pin, Dwt, clocks.sysclk().raw(), SW_UART_BAUD) {
            Ok(uart) => uart,
            Err(e) => panic!("cannot run sw-uart at {} baud: {:?}", SW_UART_BAUD, e),
        };

        let _ = uart.putk("TRACE: from sw-uart: WORKED!!\n");
        for i in 0..SW_UART_HELLO_COUNT {
            let _ = writeln!(uart, "TRACE: hello from sw-uart {}!", i);
        }

        log::info!("if you see `WORKED` on PA9, sw uart worked!");
        loop {
            cortex_m::asm::wfi();
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("this is firmware; build it with `--target thumbv7em-none-eabihf`");
}
