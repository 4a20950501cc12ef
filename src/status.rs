//! Processor status values.
//!
//! On ARMv7-M the privilege level of the running code is split across two
//! registers: the exception number in IPSR tells Handler mode (always
//! privileged) from Thread mode, and CONTROL.nPRIV tells whether Thread mode is
//! privileged. A [Status] packs both so that the mode can be read off a single
//! value, whether it was sampled live or taken from a trap frame.

use core::fmt;

/// xPSR layout.
const PSR_EXCEPTION_MASK: u32 = 0x1ff;
const PSR_N: u32 = 1 << 31;
const PSR_Z: u32 = 1 << 30;
const PSR_C: u32 = 1 << 29;
const PSR_V: u32 = 1 << 28;
const PSR_Q: u32 = 1 << 27;

/// CONTROL layout.
pub const CONTROL_NPRIV: u32 = 1 << 0;
pub const CONTROL_SPSEL: u32 = 1 << 1;

/// Privilege level of a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Unprivileged Thread mode.
    User,
    /// Privileged Thread mode. This is where the firmware starts.
    Privileged,
    /// Handler mode, running exception number `.0`.
    Handler(u16),
}

impl Mode {
    pub fn is_privileged(self) -> bool {
        !matches!(self, Mode::User)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::User => f.write_str("user"),
            Mode::Privileged => f.write_str("privileged"),
            Mode::Handler(n) => write!(f, "handler({})", n),
        }
    }
}

/// Snapshot of the program status register together with CONTROL.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Status {
    psr: u32,
    control: u32,
}

impl Status {
    pub const fn from_registers(psr: u32, control: u32) -> Self {
        Self { psr, control }
    }

    /// Active exception number, 0 in Thread mode.
    pub fn exception_number(&self) -> u16 {
        (self.psr & PSR_EXCEPTION_MASK) as u16
    }

    pub fn mode(&self) -> Mode {
        match self.exception_number() {
            0 if self.control & CONTROL_NPRIV != 0 => Mode::User,
            0 => Mode::Privileged,
            n => Mode::Handler(n),
        }
    }

    pub fn negative(&self) -> bool {
        self.psr & PSR_N != 0
    }

    pub fn zero(&self) -> bool {
        self.psr & PSR_Z != 0
    }

    pub fn carry(&self) -> bool {
        self.psr & PSR_C != 0
    }

    pub fn overflow(&self) -> bool {
        self.psr & PSR_V != 0
    }

    pub fn saturated(&self) -> bool {
        self.psr & PSR_Q != 0
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "Status {{ mode: {}, flags: {}{}{}{}{}, psr: {:#010x}, control: {:#05b} }}",
            self.mode(),
            flag(self.negative(), 'N'),
            flag(self.zero(), 'Z'),
            flag(self.carry(), 'C'),
            flag(self.overflow(), 'V'),
            flag(self.saturated(), 'Q'),
            self.psr,
            self.control,
        )
    }
}
