//! Board support for the NUCLEO-F446RE: console, logging, cycle counter and
//! the [Platform] the lab runs on.

use core::cell::RefCell;
use core::fmt::{self, Write};

use cortex_m::interrupt::{self, Mutex};
use cortex_m::peripheral::{DWT, SCB};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use stm32f4xx_hal::pac::USART2;
use stm32f4xx_hal::serial::Tx;

use crate::arch::cortex_m as arch;
use crate::cpu::{Platform, ProcessorState, UserEntry};
use crate::stack::StackPointer;
use crate::status::Status;
use crate::sw_uart::CycleCounter;
use crate::trap::TrapFrame;

/// Transmit half of USART2, wired to the ST-LINK virtual COM port.
static CONSOLE: Mutex<RefCell<Option<Tx<USART2>>>> = Mutex::new(RefCell::new(None));

/// Route console output to `tx`.
pub fn attach_console(tx: Tx<USART2>) {
    interrupt::free(|cs| CONSOLE.borrow(cs).replace(Some(tx)));
}

/// Blocking writer for the console. Output is dropped while no console is
/// attached.
///
/// Also usable from user mode: without an MPU, USART2 is reachable from
/// unprivileged code and `interrupt::free` degrades to a plain call there.
pub struct Console;

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        interrupt::free(|cs| {
            // A panic while printing lands here with the console still borrowed.
            let mut console = CONSOLE.borrow(cs).try_borrow_mut().map_err(|_| fmt::Error)?;
            let Some(tx) = console.as_mut() else {
                return Ok(());
            };
            for (i, line) in s.split('\n').enumerate() {
                if i > 0 {
                    tx.write_str("\r\n")?;
                }
                tx.write_str(line)?;
            }
            Ok(())
        })
    }
}

/// The real machine.
pub struct Board;

impl ProcessorState for Board {
    fn current_status(&self) -> Status {
        arch::current_status()
    }

    fn saved_status(&self, frame: &TrapFrame) -> Status {
        arch::saved_status(frame)
    }
}

impl Write for Board {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Console.write_str(s)
    }
}

impl Platform for Board {
    unsafe fn switch_to_user(&mut self, entry: UserEntry, stack: StackPointer) -> ! {
        arch::switch_to_user(entry, stack)
    }

    fn restart(&mut self) -> ! {
        SCB::sys_reset()
    }
}

/// [log] backend that prints to the [Console].
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(Console, "{}: {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

pub fn init_logging(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

/// The DWT cycle counter. Must have been enabled with
/// `DWT::enable_cycle_counter`.
pub struct Dwt;

impl CycleCounter for Dwt {
    fn cycles(&self) -> u32 {
        DWT::cycle_count()
    }
}
