//! Trap frames and the relocatable vector table.
//!
//! The vector table cortex-m-rt places in flash is fixed at link time. To give
//! the user-mode experiment its own `svc` handler we copy the active table into
//! RAM, overwrite the slots named in a [TrapTable] and point VTOR at the copy.
//! That happens once per run; [Installation] refuses a second attempt.

use core::sync::atomic::{AtomicBool, Ordering};

use heapless::LinearMap;

use crate::config::IRQ_COUNT;

/// Size of the Thumb `svc` instruction in bytes.
pub const SVC_INSTRUCTION_LEN: u32 = 2;

/// Number of slots in the vector table: initial stack pointer, 15 system
/// exceptions, then the device interrupts.
pub const VECTOR_COUNT: usize = 16 + IRQ_COUNT;

/// VTOR needs the table aligned to the next power of two of its size.
const VECTOR_ALIGN: usize = 512;
const _: () = assert!(VECTOR_COUNT * 4 <= VECTOR_ALIGN);

/// Exception entry point as stored in the vector table.
pub type Handler = unsafe extern "C" fn();

/// Registers stacked by the hardware on exception entry.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrapFrame {
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    /// Return address: the instruction after the one that trapped.
    pub pc: u32,
    pub xpsr: u32,
}

impl TrapFrame {
    /// Frame of an `svc` at `trapped_pc` with `number` in r0.
    pub fn for_call(number: u32, trapped_pc: u32, xpsr: u32) -> Self {
        Self {
            r0: number,
            pc: trapped_pc.wrapping_add(SVC_INSTRUCTION_LEN),
            xpsr,
            ..Self::default()
        }
    }

    /// System call number. Passed in r0.
    pub fn call_number(&self) -> u32 {
        self.r0
    }

    /// Address of the `svc` instruction that caused the trap.
    pub fn trapped_pc(&self) -> u32 {
        self.pc.wrapping_sub(SVC_INSTRUCTION_LEN)
    }

    /// Where execution continues when the handler returns.
    pub fn resume_address(&self) -> u32 {
        self.pc
    }

    /// Hand `value` back to the trapped context in r0.
    pub fn set_return(&mut self, value: i32) {
        self.r0 = value as u32;
    }
}

/// Number of [Trap] variants.
const TRAP_KINDS: usize = 10;

/// System exceptions, numbered by their slot in the vector table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trap {
    Reset = 1,
    NonMaskableInt = 2,
    HardFault = 3,
    MemoryManagement = 4,
    BusFault = 5,
    UsageFault = 6,
    SupervisorCall = 11,
    DebugMonitor = 12,
    PendSV = 14,
    SysTick = 15,
}

impl Trap {
    pub const ALL: [Trap; TRAP_KINDS] = [
        Trap::Reset,
        Trap::NonMaskableInt,
        Trap::HardFault,
        Trap::MemoryManagement,
        Trap::BusFault,
        Trap::UsageFault,
        Trap::SupervisorCall,
        Trap::DebugMonitor,
        Trap::PendSV,
        Trap::SysTick,
    ];

    pub fn slot(self) -> usize {
        self as usize
    }
}

/// Handlers to install, keyed by trap type.
pub struct TrapTable {
    handlers: LinearMap<Trap, Handler, TRAP_KINDS>,
}

impl TrapTable {
    pub const fn new() -> Self {
        Self {
            handlers: LinearMap::new(),
        }
    }

    /// Route `trap` to `handler`, replacing any earlier choice.
    pub fn with(mut self, trap: Trap, handler: Handler) -> Self {
        // One slot per variant, so the map cannot be full.
        let _ = self.handlers.insert(trap, handler);
        self
    }

    /// Write the chosen handlers over `vectors`. Other slots are untouched.
    pub fn write_into(&self, vectors: &mut VectorTable) {
        for (trap, handler) in self.handlers.iter() {
            vectors.entries[trap.slot()] = *handler as usize;
        }
    }
}

impl Default for TrapTable {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory image of a vector table, suitably aligned for VTOR.
#[repr(C, align(512))]
pub struct VectorTable {
    entries: [usize; VECTOR_COUNT],
}

impl VectorTable {
    pub const fn zeroed() -> Self {
        Self {
            entries: [0; VECTOR_COUNT],
        }
    }

    /// Copy all [VECTOR_COUNT] entries of the table at `base`.
    ///
    /// # Safety
    /// `base` must point to a readable table of at least [VECTOR_COUNT] words.
    pub unsafe fn copy_from(&mut self, base: *const usize) {
        core::ptr::copy_nonoverlapping(base, self.entries.as_mut_ptr(), VECTOR_COUNT);
    }

    pub fn entry(&self, trap: Trap) -> usize {
        self.entries[trap.slot()]
    }

    /// Initial main stack pointer (slot 0).
    pub fn initial_stack_pointer(&self) -> usize {
        self.entries[0]
    }

    pub fn as_ptr(&self) -> *const usize {
        self.entries.as_ptr()
    }
}

/// Reasons installing a vector table can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapError {
    /// A table has already been installed during this run.
    AlreadyInstalled,
}

/// Tracks whether a vector table has been installed.
pub struct Installation {
    installed: AtomicBool,
}

impl Installation {
    pub const fn new() -> Self {
        Self {
            installed: AtomicBool::new(false),
        }
    }

    /// Take the one installation allowed per run.
    pub fn claim(&self) -> Result<(), TrapError> {
        self.installed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| TrapError::AlreadyInstalled)
    }
}

impl Default for Installation {
    fn default() -> Self {
        Self::new()
    }
}
