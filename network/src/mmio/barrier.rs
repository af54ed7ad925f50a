//! CPU barriers for descriptor handoff.
//!
//! `core::sync::atomic::fence` only orders atomic accesses. Descriptors,
//! buffers and tail registers are plain volatile accesses, so the points
//! where ownership passes between CPU and device use real fences.
//!
//! # Reference
//! Intel SDM Vol. 3A, §11.10 (Store Buffer) and §8.2.5 (Strengthening or
//! Weakening the Memory-Ordering Model)

use core::sync::atomic::{compiler_fence, Ordering};

/// Every earlier store is globally visible before any later store.
///
/// Used between filling a descriptor and writing the tail register.
#[inline]
pub fn sfence() {
    compiler_fence(Ordering::SeqCst);
    cpu::sfence();
}

/// No later load is performed before every earlier load completes.
///
/// Used between observing DD and reading the rest of a descriptor.
#[inline]
pub fn lfence() {
    compiler_fence(Ordering::SeqCst);
    cpu::lfence();
}

#[cfg(target_arch = "x86_64")]
mod cpu {
    use core::arch::asm;

    #[inline]
    pub fn sfence() {
        // SAFETY: no operands, no stack use, flags untouched.
        unsafe { asm!("sfence", options(nostack, preserves_flags)) }
    }

    #[inline]
    pub fn lfence() {
        // SAFETY: as above.
        unsafe { asm!("lfence", options(nostack, preserves_flags)) }
    }
}

#[cfg(not(target_arch = "x86_64"))]
mod cpu {
    use core::sync::atomic::{fence, Ordering};

    #[inline]
    pub fn sfence() {
        fence(Ordering::SeqCst);
    }

    #[inline]
    pub fn lfence() {
        fence(Ordering::SeqCst);
    }
}
