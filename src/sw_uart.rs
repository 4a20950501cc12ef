//! Transmit-only UART implemented by toggling a GPIO pin.
//!
//! Each frame is 8N1: a low start bit, eight data bits LSB first, a high stop
//! bit. Bit edges are timed with a free-running cycle counter. All deadlines of
//! a frame are measured from its start, so the few cycles lost per bit to the
//! pin write do not add up over the frame.

use core::fmt;

use embedded_hal::digital::OutputPin;

/// A free-running counter that advances once per CPU cycle and wraps at
/// `u32::MAX`.
pub trait CycleCounter {
    fn cycles(&self) -> u32;
}

/// Reasons a software UART cannot be set up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwUartError {
    ZeroBaud,
    /// The requested baud rate needs bits shorter than one cycle.
    BaudTooHigh,
    /// A whole frame would not fit in one period of the cycle counter.
    BaudTooLow,
}

/// Start bit, eight data bits and the stop bit.
const FRAME_BITS: u32 = 10;

pub struct SwUart<P, C> {
    tx: P,
    clock: C,
    cycles_per_bit: u32,
}

impl<P: OutputPin, C: CycleCounter> SwUart<P, C> {
    /// Drive `tx` idle-high and prepare to send at `baud` on a `cpu_hz` core.
    pub fn new(mut tx: P, clock: C, cpu_hz: u32, baud: u32) -> Result<Self, SwUartError> {
        if baud == 0 {
            return Err(SwUartError::ZeroBaud);
        }
        let cycles_per_bit = cpu_hz / baud;
        if cycles_per_bit == 0 {
            return Err(SwUartError::BaudTooHigh);
        }
        if cycles_per_bit.checked_mul(FRAME_BITS).is_none() {
            return Err(SwUartError::BaudTooLow);
        }
        let _ = tx.set_high();
        log::debug!("sw-uart: {} baud, {} cycles per bit", baud, cycles_per_bit);
        Ok(Self {
            tx,
            clock,
            cycles_per_bit,
        })
    }

    /// Send one byte.
    pub fn put8(&mut self, byte: u8) -> Result<(), P::Error> {
        let start = self.clock.cycles();

        self.tx.set_low()?;
        self.wait_until(start, 1);

        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                self.tx.set_high()?;
            } else {
                self.tx.set_low()?;
            }
            self.wait_until(start, bit + 2);
        }

        self.tx.set_high()?;
        self.wait_until(start, FRAME_BITS);
        Ok(())
    }

    /// Send every byte of `s`.
    pub fn putk(&mut self, s: &str) -> Result<(), P::Error> {
        s.bytes().try_for_each(|byte| self.put8(byte))
    }

    /// Hand back the pin and the counter.
    pub fn release(self) -> (P, C) {
        (self.tx, self.clock)
    }

    /// Busy-wait until `bits` bit times have passed since `start`.
    fn wait_until(&self, start: u32, bits: u32) {
        let deadline = self.cycles_per_bit * bits;
        while self.clock.cycles().wrapping_sub(start) < deadline {}
    }
}

impl<P: OutputPin, C: CycleCounter> fmt::Write for SwUart<P, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.putk(s).map_err(|_| fmt::Error)
    }
}
