//! Collaborator interfaces.
//!
//! The driver core does not discover PCI devices, own page tables, or know
//! how processes are stored. It consumes those services through the traits
//! below. Identity-mapped environments (early boot, the host test harness)
//! can use [`IdentityMap`] together with a `dma_pool::FramePool`.

use core::fmt;
use core::ptr::NonNull;

use bitflags::bitflags;
use dma_pool::{FramePool, SharedFramePool};

use crate::types::{PhysAddr, ProcessId, VirtAddr};

/// Page size used for descriptor arrays and packet buffers.
pub const PAGE_SIZE: usize = dma_pool::PAGE_SIZE;

// ═══════════════════════════════════════════════════════════════════════════
// PAGE ALLOCATION
// ═══════════════════════════════════════════════════════════════════════════

/// One 4 KiB physical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysFrame {
    /// Page-aligned start address.
    pub addr: PhysAddr,
}

/// The page allocator has no frame left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError;

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "out of physical frames")
    }
}

impl From<dma_pool::DmaError> for AllocError {
    fn from(_: dma_pool::DmaError) -> Self {
        AllocError
    }
}

/// Source of zero-filled physical frames.
pub trait FrameAllocator {
    /// Allocate one frame whose contents are all zero.
    fn allocate_zeroed_page(&mut self) -> Result<PhysFrame, AllocError>;
}

impl FrameAllocator for FramePool {
    fn allocate_zeroed_page(&mut self) -> Result<PhysFrame, AllocError> {
        let addr = self.alloc_zeroed()?;
        Ok(PhysFrame {
            addr: PhysAddr(addr as u64),
        })
    }
}

impl FrameAllocator for &SharedFramePool {
    fn allocate_zeroed_page(&mut self) -> Result<PhysFrame, AllocError> {
        let addr = self.alloc_zeroed()?;
        Ok(PhysFrame {
            addr: PhysAddr(addr as u64),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ADDRESS SPACE
// ═══════════════════════════════════════════════════════════════════════════

bitflags! {
    /// Page-table permissions requested for a mapping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageFlags: u32 {
        const PRESENT = 1 << 0;
        const WRITABLE = 1 << 1;
    }
}

impl PageFlags {
    /// Kernel read/write data page.
    pub const KERNEL_RW: Self = Self::PRESENT.union(Self::WRITABLE);
}

/// Address-space mapper failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// Something is already mapped at the target address.
    AlreadyMapped(VirtAddr),
    /// Address or size not page-aligned.
    Misaligned,
    /// No memory for intermediate page tables.
    NoMemory,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyMapped(va) => write!(f, "{:#x} already mapped", va.0),
            Self::Misaligned => write!(f, "misaligned mapping"),
            Self::NoMemory => write!(f, "no memory for page tables"),
        }
    }
}

/// Kernel page-table operations the driver needs.
pub trait AddressSpace {
    /// Map `frame` at `at` and return where the kernel can now reach it.
    ///
    /// A normal kernel returns `at`; identity-mapped environments return the
    /// frame address and ignore `at`.
    fn map(&mut self, frame: PhysFrame, at: VirtAddr, flags: PageFlags)
        -> Result<NonNull<u8>, MapError>;

    /// Map a device register window of `size` bytes, uncached.
    fn map_mmio(&mut self, phys: PhysAddr, size: usize) -> Result<NonNull<u8>, MapError>;
}

/// Address space where every physical address is also its virtual address.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityMap;

impl AddressSpace for IdentityMap {
    fn map(
        &mut self,
        frame: PhysFrame,
        _at: VirtAddr,
        _flags: PageFlags,
    ) -> Result<NonNull<u8>, MapError> {
        if frame.addr.0 as usize % PAGE_SIZE != 0 {
            return Err(MapError::Misaligned);
        }
        NonNull::new(frame.addr.0 as usize as *mut u8).ok_or(MapError::Misaligned)
    }

    fn map_mmio(&mut self, phys: PhysAddr, _size: usize) -> Result<NonNull<u8>, MapError> {
        NonNull::new(phys.0 as usize as *mut u8).ok_or(MapError::Misaligned)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BUS
// ═══════════════════════════════════════════════════════════════════════════

/// What the bus hands back once the function is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceResources {
    /// BAR0 physical base.
    pub mmio_base: PhysAddr,
    /// BAR0 size in bytes.
    pub mmio_size: usize,
    /// Legacy interrupt line.
    pub irq_line: u8,
}

/// A PCI function the driver attaches to.
pub trait BusDevice {
    /// Enable memory decoding and bus mastering, and report the resources.
    fn enable(&mut self) -> DeviceResources;

    /// Unmask the device's interrupt line at the interrupt controller.
    fn unmask_irq(&mut self, line: u8);
}

// ═══════════════════════════════════════════════════════════════════════════
// PROCESSES
// ═══════════════════════════════════════════════════════════════════════════

/// A live process as seen by the interrupt dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    /// Process identity.
    pub id: ProcessId,
    /// Whether the process registered interest in network events.
    pub accepts_net_events: bool,
}

/// Lookup of processes by identifier.
pub trait ProcessRegistry {
    /// `None` if the process no longer exists.
    fn lookup(&self, pid: ProcessId) -> Option<ProcessHandle>;
}
