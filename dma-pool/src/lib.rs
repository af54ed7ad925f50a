//! Page-granular DMA frame pool.
//!
//! Hands out zero-filled 4 KiB frames from one physically contiguous,
//! identity-mapped memory region. Device drivers use it for descriptor
//! arrays and packet buffers, where every allocation is exactly one page
//! and lives for as long as the device is attached.
//!
//! # Design
//!
//! - **One region, fixed at construction**: the caller hands over memory it
//!   owns (a firmware reservation, a boot-time carve-out, a test arena).
//! - **Bitmap tracking**: one bit per frame, so frames can be returned and
//!   reused in any order.
//! - **Zeroed on allocation**: a frame never leaks a previous owner's data
//!   into a device that is about to DMA from it.
//!
//! # Usage
//!
//! ```ignore
//! use dma_pool::{FramePool, MemoryRegion};
//!
//! let region = MemoryRegion::new(reserved_base, reserved_size);
//! let mut pool = unsafe { FramePool::new(region)? };
//!
//! let frame = pool.alloc_zeroed()?;   // physical == virtual
//! // ... hand `frame` to the device ...
//! pool.free(frame)?;
//! ```

#![no_std]

use spin::Mutex;

/// Page size (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of frames a single pool can track (16 MiB of memory).
pub const MAX_FRAMES: usize = 4096;

const BITMAP_WORDS: usize = MAX_FRAMES / 64;

// ============================================================================
// Utility functions
// ============================================================================

/// Align a value up to the given alignment.
#[inline]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// Align a value down to the given alignment.
#[inline]
pub const fn align_down(val: usize, align: usize) -> usize {
    val & !(align - 1)
}

/// Convert pages to bytes.
#[inline]
pub const fn pages_to_bytes(pages: usize) -> usize {
    pages * PAGE_SIZE
}

/// Convert bytes to pages (rounded up).
#[inline]
pub const fn bytes_to_pages(bytes: usize) -> usize {
    align_up(bytes, PAGE_SIZE) / PAGE_SIZE
}

// ============================================================================
// Memory region
// ============================================================================

/// A physically contiguous memory region handed to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    /// Base address (physical = virtual in identity mapping).
    pub base: usize,
    /// Size in bytes.
    pub size: usize,
}

impl MemoryRegion {
    /// Create a new memory region.
    pub const fn new(base: usize, size: usize) -> Self {
        Self { base, size }
    }

    /// Shrink the region to whole, page-aligned frames.
    pub fn aligned(&self) -> Self {
        let aligned_base = align_up(self.base, PAGE_SIZE);
        let adjustment = aligned_base - self.base;
        let aligned_size = align_down(self.size.saturating_sub(adjustment), PAGE_SIZE);
        Self {
            base: aligned_base,
            size: aligned_size,
        }
    }

    /// Number of whole frames in the region.
    pub fn frame_count(&self) -> usize {
        self.size / PAGE_SIZE
    }

    /// Check if an address falls inside the region.
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr - self.base < self.size
    }
}

// ============================================================================
// Error types
// ============================================================================

/// DMA pool errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaError {
    /// Every frame in the pool is in use.
    OutOfMemory,
    /// Region is null, smaller than one frame, or larger than `MAX_FRAMES`.
    InvalidRegion,
    /// Address was not handed out by this pool.
    ForeignFrame,
    /// Frame is already free.
    DoubleFree,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "DMA pool exhausted"),
            Self::InvalidRegion => write!(f, "invalid DMA region"),
            Self::ForeignFrame => write!(f, "frame does not belong to this pool"),
            Self::DoubleFree => write!(f, "frame freed twice"),
        }
    }
}

/// Result type for DMA operations.
pub type Result<T> = core::result::Result<T, DmaError>;

// ============================================================================
// FramePool
// ============================================================================

/// Bitmap frame allocator over one identity-mapped region.
pub struct FramePool {
    region: MemoryRegion,
    /// One bit per frame, set = in use.
    bitmap: [u64; BITMAP_WORDS],
    frames: usize,
    free: usize,
    /// Where the next search starts.
    hint: usize,
}

impl FramePool {
    /// Build a pool over `region`.
    ///
    /// The region is trimmed to page boundaries. Frames past `MAX_FRAMES`
    /// are rejected rather than silently ignored.
    ///
    /// # Safety
    ///
    /// - The region must be identity-mapped, writable, and reserved for the
    ///   pool's exclusive use for the pool's whole lifetime.
    /// - Nothing else may read or write it except through handed-out frames.
    pub unsafe fn new(region: MemoryRegion) -> Result<Self> {
        let region = region.aligned();
        let frames = region.frame_count();
        if region.base == 0 || frames == 0 || frames > MAX_FRAMES {
            return Err(DmaError::InvalidRegion);
        }

        log::debug!(
            "dma-pool: {} frames at {:#x}..{:#x}",
            frames,
            region.base,
            region.base + region.size
        );

        Ok(Self {
            region,
            bitmap: [0; BITMAP_WORDS],
            frames,
            free: frames,
            hint: 0,
        })
    }

    /// Allocate one zero-filled frame and return its address.
    pub fn alloc_zeroed(&mut self) -> Result<usize> {
        if self.free == 0 {
            log::warn!("dma-pool: exhausted ({} frames in use)", self.frames);
            return Err(DmaError::OutOfMemory);
        }

        let index = (0..self.frames)
            .map(|step| (self.hint + step) % self.frames)
            .find(|&i| !self.is_used(i))
            .ok_or(DmaError::OutOfMemory)?;

        self.mark(index, true);
        self.free -= 1;
        self.hint = (index + 1) % self.frames;

        let addr = self.region.base + pages_to_bytes(index);
        // SAFETY: the frame lies inside the region we own exclusively and was
        // just marked in use, so no one else holds it.
        unsafe {
            core::ptr::write_bytes(addr as *mut u8, 0, PAGE_SIZE);
        }
        Ok(addr)
    }

    /// Return a frame to the pool.
    pub fn free(&mut self, addr: usize) -> Result<()> {
        if !self.region.contains(addr) || addr % PAGE_SIZE != 0 {
            return Err(DmaError::ForeignFrame);
        }
        let index = (addr - self.region.base) / PAGE_SIZE;
        if !self.is_used(index) {
            return Err(DmaError::DoubleFree);
        }
        self.mark(index, false);
        self.free += 1;
        Ok(())
    }

    /// Number of frames still available.
    pub fn free_frames(&self) -> usize {
        self.free
    }

    /// Total number of frames managed.
    pub fn total_frames(&self) -> usize {
        self.frames
    }

    /// The page-aligned region backing the pool.
    pub fn region(&self) -> MemoryRegion {
        self.region
    }

    #[inline]
    fn is_used(&self, index: usize) -> bool {
        self.bitmap[index / 64] & (1 << (index % 64)) != 0
    }

    #[inline]
    fn mark(&mut self, index: usize, used: bool) {
        let bit = 1u64 << (index % 64);
        if used {
            self.bitmap[index / 64] |= bit;
        } else {
            self.bitmap[index / 64] &= !bit;
        }
    }
}

// SAFETY: the pool only hands out addresses; the region itself is reserved
// for it by the caller of `new`.
unsafe impl Send for FramePool {}

/// A `FramePool` behind a spinlock, for pools shared between drivers.
pub struct SharedFramePool {
    inner: Mutex<FramePool>,
}

impl SharedFramePool {
    /// Wrap an existing pool.
    pub const fn new(pool: FramePool) -> Self {
        Self {
            inner: Mutex::new(pool),
        }
    }

    /// Allocate one zero-filled frame.
    pub fn alloc_zeroed(&self) -> Result<usize> {
        self.inner.lock().alloc_zeroed()
    }

    /// Return a frame.
    pub fn free(&self, addr: usize) -> Result<()> {
        self.inner.lock().free(addr)
    }

    /// Number of frames still available.
    pub fn free_frames(&self) -> usize {
        self.inner.lock().free_frames()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::boxed::Box;

    #[repr(C, align(4096))]
    struct Arena([u8; 8 * PAGE_SIZE]);

    fn arena() -> Box<Arena> {
        // Dirty on purpose so zero-filling is observable.
        Box::new(Arena([0xAB; 8 * PAGE_SIZE]))
    }

    fn pool_over(arena: &mut Arena) -> FramePool {
        let region = MemoryRegion::new(arena.0.as_mut_ptr() as usize, arena.0.len());
        unsafe { FramePool::new(region) }.unwrap()
    }

    #[test]
    fn test_align_functions() {
        assert_eq!(align_up(0, 4096), 0);
        assert_eq!(align_up(1, 4096), 4096);
        assert_eq!(align_up(4096, 4096), 4096);
        assert_eq!(align_down(4097, 4096), 4096);
        assert_eq!(bytes_to_pages(PAGE_SIZE + 1), 2);
    }

    #[test]
    fn test_region_alignment() {
        let region = MemoryRegion::new(4097, 3 * PAGE_SIZE);
        let aligned = region.aligned();
        assert_eq!(aligned.base, 8192);
        assert_eq!(aligned.frame_count(), 2);
        assert!(aligned.contains(8192));
        assert!(!aligned.contains(8192 + 2 * PAGE_SIZE));
    }

    #[test]
    fn test_rejects_empty_region() {
        let region = MemoryRegion::new(PAGE_SIZE, PAGE_SIZE - 1);
        assert_eq!(unsafe { FramePool::new(region) }.err(), Some(DmaError::InvalidRegion));
    }

    #[test]
    fn test_frames_are_zeroed() {
        let mut arena = arena();
        let mut pool = pool_over(&mut arena);

        let frame = pool.alloc_zeroed().unwrap();
        assert_eq!(frame % PAGE_SIZE, 0);
        let bytes = unsafe { core::slice::from_raw_parts(frame as *const u8, PAGE_SIZE) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_exhaustion_and_reuse() {
        let mut arena = arena();
        let mut pool = pool_over(&mut arena);
        let total = pool.total_frames();

        let mut frames = [0usize; 8];
        for slot in frames.iter_mut().take(total) {
            *slot = pool.alloc_zeroed().unwrap();
        }
        assert_eq!(pool.free_frames(), 0);
        assert_eq!(pool.alloc_zeroed(), Err(DmaError::OutOfMemory));

        pool.free(frames[0]).unwrap();
        assert_eq!(pool.free(frames[0]), Err(DmaError::DoubleFree));
        assert_eq!(pool.alloc_zeroed(), Ok(frames[0]));
    }

    #[test]
    fn test_foreign_frame_rejected() {
        let mut arena = arena();
        let mut pool = pool_over(&mut arena);
        let frame = pool.alloc_zeroed().unwrap();
        assert_eq!(pool.free(frame + 1), Err(DmaError::ForeignFrame));
        assert_eq!(pool.free(0x1000), Err(DmaError::ForeignFrame));
    }

    #[test]
    fn test_shared_pool() {
        let mut arena = arena();
        let shared = SharedFramePool::new(pool_over(&mut arena));
        let before = shared.free_frames();
        let frame = shared.alloc_zeroed().unwrap();
        assert_eq!(shared.free_frames(), before - 1);
        shared.free(frame).unwrap();
        assert_eq!(shared.free_frames(), before);
    }
}
