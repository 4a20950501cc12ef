//! The user stack.

use core::fmt;

/// Stack pointers handed to the hardware must be 8-byte aligned (AAPCS).
pub const STACK_ALIGN: usize = 8;

/// Statically sized stack made of `WORDS` 8-byte words.
#[repr(C, align(8))]
pub struct UserStack<const WORDS: usize> {
    // Only ever accessed through the stack pointer.
    #[allow(dead_code)]
    words: [u64; WORDS],
}

impl<const WORDS: usize> UserStack<WORDS> {
    pub const BYTES: usize = WORDS * core::mem::size_of::<u64>();

    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Memory range covered by the stack at `this`.
    ///
    /// Takes a raw pointer so that callers holding the stack in a `static mut`
    /// never create a reference to it.
    pub fn region(this: *const Self) -> StackRegion {
        StackRegion::new(this as usize, Self::BYTES)
    }
}

impl<const WORDS: usize> Default for UserStack<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

/// Address range `[base, end)` of a stack.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    base: usize,
    end: usize,
}

impl StackRegion {
    pub const fn new(base: usize, len: usize) -> Self {
        Self { base, end: base + len }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Initial stack pointer: the highest aligned address of the region.
    /// Stacks grow down, so the first push lands just below it.
    pub fn top(&self) -> *mut u64 {
        (self.end & !(STACK_ALIGN - 1)) as *mut u64
    }

    /// Whether `addr` is a byte of the region.
    pub fn contains(&self, addr: usize) -> bool {
        (self.base..self.end).contains(&addr)
    }

    /// Check that `sp` can serve as the initial stack pointer of this region.
    pub fn validate(&self, sp: *mut u64) -> Result<StackPointer, StackError> {
        let sp = StackPointer::new(sp)?;
        if sp.addr() <= self.base || sp.addr() > self.end {
            return Err(StackError::OutOfRegion(sp.addr()));
        }
        Ok(sp)
    }
}

impl fmt::Debug for StackRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.base, self.end)
    }
}

/// A non-null, 8-byte aligned stack pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackPointer(usize);

impl StackPointer {
    pub fn new(sp: *mut u64) -> Result<Self, StackError> {
        let addr = sp as usize;
        if addr == 0 {
            Err(StackError::Null)
        } else if addr % STACK_ALIGN != 0 {
            Err(StackError::Misaligned(addr))
        } else {
            Ok(Self(addr))
        }
    }

    pub fn addr(&self) -> usize {
        self.0
    }
}

/// Reasons a pointer cannot be used as a stack pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackError {
    Null,
    Misaligned(usize),
    OutOfRegion(usize),
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::Null => f.write_str("user stack pointer is null"),
            StackError::Misaligned(addr) => {
                write!(f, "stack must be 8 byte aligned, got {:#x}", addr)
            }
            StackError::OutOfRegion(addr) => {
                write!(f, "stack pointer {:#x} is outside the user stack", addr)
            }
        }
    }
}
