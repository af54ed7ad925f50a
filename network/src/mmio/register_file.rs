//! Bounded view of the device register window.
//!
//! Every MMIO access in the crate goes through [`RegisterFile`]. The window
//! is checked once at construction against the register map, and each access
//! is a single volatile 32-bit load or store.

use core::ptr::NonNull;

use volatile::VolatilePtr;

use super::regs::{Register, WINDOW_MIN};
use crate::error::AttachError;

/// The e1000's memory-mapped register window.
pub struct RegisterFile {
    base: NonNull<u32>,
    size: usize,
    /// ICR loads through this window; hardware clears ICR on every read.
    #[cfg(test)]
    icr_reads: core::sync::atomic::AtomicUsize,
}

// SAFETY: registers are plain MMIO words; concurrent volatile accesses are
// what the hardware expects, and ordering is handled by the callers.
unsafe impl Send for RegisterFile {}
unsafe impl Sync for RegisterFile {}

impl RegisterFile {
    /// Wrap a mapped register window.
    ///
    /// # Safety
    /// `base` must point to `size` bytes of device registers (or memory
    /// standing in for them) that stay mapped for the lifetime of the value.
    pub unsafe fn new(base: NonNull<u8>, size: usize) -> Result<Self, AttachError> {
        if size < WINDOW_MIN {
            return Err(AttachError::WindowTooSmall {
                size,
                needed: WINDOW_MIN,
            });
        }
        if base.as_ptr() as usize % 4 != 0 {
            return Err(AttachError::InvalidConfig("register window not 4-byte aligned"));
        }
        Ok(Self {
            base: base.cast(),
            size,
            #[cfg(test)]
            icr_reads: core::sync::atomic::AtomicUsize::new(0),
        })
    }

    /// Size of the window in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Read a register.
    #[inline]
    pub fn read(&self, reg: Register) -> u32 {
        #[cfg(test)]
        if reg == Register::Icr {
            self.icr_reads
                .fetch_add(1, core::sync::atomic::Ordering::Relaxed);
        }
        self.ptr(reg).read()
    }

    /// Write a register.
    #[inline]
    pub fn write(&self, reg: Register, value: u32) {
        self.ptr(reg).write(value)
    }

    /// Read-modify-write: OR `bits` into a register.
    #[inline]
    pub fn set_bits(&self, reg: Register, bits: u32) {
        self.ptr(reg).update(|v| v | bits)
    }

    /// How many times ICR has been read through this window.
    #[cfg(test)]
    pub fn icr_reads(&self) -> usize {
        self.icr_reads.load(core::sync::atomic::Ordering::Relaxed)
    }

    #[inline]
    fn ptr(&self, reg: Register) -> VolatilePtr<'_, u32> {
        let offset = reg.offset();
        debug_assert!(offset + 4 <= self.size);
        // SAFETY: `new` checked the window covers every register, and
        // register offsets are 4-byte aligned.
        unsafe { VolatilePtr::new(NonNull::new_unchecked(self.base.as_ptr().add(offset / 4))) }
    }
}
