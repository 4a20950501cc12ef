//! Compile-time configuration.

use log::LevelFilter;

/// Size of the user stack in 8-byte words.
/// 4 Ki words (32 KiB) out of the 128 KiB of SRAM on the STM32F446.
pub const USER_STACK_WORDS: usize = 4 * 1024;

/// Frequency of the external oscillator. The ST-LINK provides 8 MHz.
pub const HSE_MHZ: u32 = 8;

/// Baud rate of the USART2 console (routed to the ST-LINK virtual COM port).
pub const CONSOLE_BAUD: u32 = 115_200;

/// Baud rate of the bit-banged UART.
pub const SW_UART_BAUD: u32 = 115_200;

/// How many greetings the software UART demo prints.
pub const SW_UART_HELLO_COUNT: usize = 30;

/// Call number the user program uses to exercise the illegal call path.
pub const ILLEGAL_CALL_DEMO: u32 = 42;

/// Number of device interrupts on the STM32F446.
pub const IRQ_COUNT: usize = 97;

/// Maximum level the console logger prints.
pub const LOG_LEVEL: LevelFilter = LevelFilter::Trace;
