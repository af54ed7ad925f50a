//! Descriptor arrays and their packet buffers.
//!
//! # Memory layout
//!
//! Each ring is one page of descriptors followed by one page per buffer.
//! Both rings are mapped at fixed offsets just above the register window:
//!
//! ```text
//! window_end
//!   + 1 page              tx descriptors
//!   + 1 page              tx buffer 0 .. tx buffer N_tx-1
//!   + N_tx pages          rx descriptors
//!   + 1 page              rx buffer 0 .. rx buffer N_rx-1
//! ```
//!
//! # Ownership
//!
//! A descriptor (and its buffer) belongs to the device from the moment the
//! tail register moves past it until its DD bit is observed. Storage itself
//! does not track this; the transmit and receive paths do, through the tail.

use alloc::vec::Vec;
use core::marker::PhantomData;
use core::ptr::NonNull;

use volatile::VolatilePtr;

use super::descriptor::{Descriptor, DESC_SIZE};
use crate::error::AttachError;
use crate::platform::{AddressSpace, FrameAllocator, PageFlags, PAGE_SIZE};
use crate::types::{PhysAddr, VirtAddr};

// ═══════════════════════════════════════════════════════════════════════════
// LAYOUT
// ═══════════════════════════════════════════════════════════════════════════

/// Hardware granularity of RDLEN/TDLEN.
pub const RING_ALIGN: usize = 128;

/// Check a descriptor count against the hardware and one-page limits.
pub fn check_ring_size(count: usize) -> Result<(), AttachError> {
    let bytes = count * DESC_SIZE;
    if count == 0 || bytes % RING_ALIGN != 0 {
        return Err(AttachError::InvalidConfig(
            "ring byte length must be a non-zero multiple of 128",
        ));
    }
    if bytes > PAGE_SIZE {
        return Err(AttachError::InvalidConfig("descriptor array exceeds one page"));
    }
    Ok(())
}

/// Virtual addresses at which the two rings are mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingLayout {
    /// TX descriptor page; TX buffers follow it.
    pub tx_descs: VirtAddr,
    /// RX descriptor page; RX buffers follow it.
    pub rx_descs: VirtAddr,
}

impl RingLayout {
    /// Lay out both rings above `window_end`.
    pub const fn above(window_end: VirtAddr, tx_count: usize) -> Self {
        let tx_descs = window_end.add(PAGE_SIZE);
        let tx_buffers = tx_descs.add(PAGE_SIZE);
        let rx_descs = tx_buffers.add(tx_count * PAGE_SIZE);
        Self { tx_descs, rx_descs }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RING STORAGE
// ═══════════════════════════════════════════════════════════════════════════

/// One descriptor array plus one buffer page per descriptor.
pub struct RingStorage<D: Descriptor> {
    /// CPU pointer to descriptor 0.
    descs: NonNull<D>,
    /// Bus address of descriptor 0.
    descs_phys: PhysAddr,
    /// CPU pointer to each buffer.
    buffers: Vec<NonNull<u8>>,
    /// Usable bytes per buffer.
    buffer_size: usize,
    _marker: PhantomData<D>,
}

// SAFETY: the storage exclusively owns its pages; the device is the only
// other party touching them, and it is coordinated through DD bits.
unsafe impl<D: Descriptor> Send for RingStorage<D> {}

impl<D: Descriptor> RingStorage<D> {
    /// Allocate, map and zero a ring of `count` descriptors at `at`.
    ///
    /// Descriptor `i` points at buffer `i`, mapped at `at + (i + 1) pages`.
    ///
    /// # Arguments
    /// - `count`: descriptors in the ring
    /// - `buffer_size`: usable bytes per buffer, at most one page
    /// - `at`: virtual address of the descriptor page
    pub fn allocate<F, S>(
        frames: &mut F,
        space: &mut S,
        count: usize,
        buffer_size: usize,
        at: VirtAddr,
    ) -> Result<Self, AttachError>
    where
        F: FrameAllocator + ?Sized,
        S: AddressSpace + ?Sized,
    {
        check_ring_size(count)?;
        if buffer_size == 0 || buffer_size > PAGE_SIZE {
            return Err(AttachError::InvalidConfig("buffer size must fit one page"));
        }

        let desc_frame = frames.allocate_zeroed_page()?;
        let desc_page = space.map(desc_frame, at, PageFlags::KERNEL_RW)?;
        // SAFETY: freshly mapped page of PAGE_SIZE bytes.
        unsafe { desc_page.as_ptr().write_bytes(0, PAGE_SIZE) };

        let mut storage = Self {
            descs: desc_page.cast(),
            descs_phys: desc_frame.addr,
            buffers: Vec::with_capacity(count),
            buffer_size,
            _marker: PhantomData,
        };

        for i in 0..count {
            let frame = frames.allocate_zeroed_page()?;
            let page = space.map(frame, at.add((i + 1) * PAGE_SIZE), PageFlags::KERNEL_RW)?;
            // SAFETY: as above.
            unsafe { page.as_ptr().write_bytes(0, PAGE_SIZE) };
            storage.buffers.push(page);
            storage.write(i, D::with_buffer(frame.addr));
        }

        Ok(storage)
    }

    /// Number of descriptors.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Always false for allocated storage.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Bus address of the descriptor array, for `*DBAL`/`*DBAH`.
    pub fn phys_addr(&self) -> PhysAddr {
        self.descs_phys
    }

    /// Descriptor array length in bytes, for `*DLEN`.
    pub fn byte_len(&self) -> u32 {
        (self.len() * DESC_SIZE) as u32
    }

    /// Usable bytes per buffer.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Volatile read of descriptor `i`.
    #[inline]
    pub fn descriptor(&self, i: usize) -> D {
        self.desc_ptr(i).read()
    }

    /// Volatile write of descriptor `i`.
    #[inline]
    pub fn write(&mut self, i: usize, desc: D) {
        self.desc_ptr(i).write(desc)
    }

    /// Read-modify-write descriptor `i`.
    #[inline]
    pub fn update(&mut self, i: usize, f: impl FnOnce(&mut D)) {
        let mut desc = self.descriptor(i);
        f(&mut desc);
        self.write(i, desc);
    }

    /// Payload area of buffer `i`.
    pub fn buffer(&self, i: usize) -> &[u8] {
        // SAFETY: each buffer is a mapped page of at least buffer_size bytes.
        unsafe { core::slice::from_raw_parts(self.buffers[i].as_ptr(), self.buffer_size) }
    }

    /// Mutable payload area of buffer `i`.
    pub fn buffer_mut(&mut self, i: usize) -> &mut [u8] {
        // SAFETY: as `buffer`; `&mut self` excludes other CPU borrows.
        unsafe { core::slice::from_raw_parts_mut(self.buffers[i].as_ptr(), self.buffer_size) }
    }

    #[inline]
    fn desc_ptr(&self, i: usize) -> VolatilePtr<'_, D> {
        assert!(i < self.len(), "descriptor index {} out of range", i);
        // SAFETY: index checked; the descriptor page holds len() entries.
        unsafe { VolatilePtr::new(NonNull::new_unchecked(self.descs.as_ptr().add(i))) }
    }
}
