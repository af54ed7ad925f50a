//! Simulated e1000 for host tests.
//!
//! The register window and every ring page live in ordinary heap memory and
//! are reached through [`IdentityMap`], so the driver runs unmodified. The
//! test plays the hardware: it finds the rings through TDBAL/RDBAL, sets DD
//! bits, writes received frames at RDH and latches ICR causes.
//!
//! Registers are plain memory: reads never clear ICR and writes never
//! trigger anything. Tests drive every device-side effect explicitly.

use alloc::alloc::{alloc_zeroed, dealloc, Layout};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::ptr::NonNull;

use dma_pool::{FramePool, MemoryRegion};

use crate::config::E1000Config;
use crate::driver::{attach, E1000};
use crate::mmio::regs::STATUS_EXPECTED;
use crate::mmio::{InterruptCause, Register, RegisterFile};
use crate::platform::{
    BusDevice, DeviceResources, IdentityMap, ProcessHandle, ProcessRegistry, PAGE_SIZE,
};
use crate::ring::{RxDescriptor, RxStatus, TxDescriptor, TxStatus, DESC_SIZE};
use crate::types::{PhysAddr, ProcessId};

/// BAR0 size reported by the simulated bus.
const WINDOW_SIZE: usize = 0x6000;

/// IRQ line reported by the simulated bus.
const IRQ_LINE: u8 = 11;

/// Enough frames for the default rings (1 + 16 + 1 + 128).
const DEFAULT_FRAMES: usize = 160;

/// Page-aligned heap block, freed on drop.
struct HeapPages {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl HeapPages {
    fn new(pages: usize) -> Self {
        let layout = Layout::from_size_align(pages * PAGE_SIZE, PAGE_SIZE).unwrap();
        let ptr = NonNull::new(unsafe { alloc_zeroed(layout) }).unwrap();
        Self { ptr, layout }
    }
}

impl Drop for HeapPages {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// A `FramePool` over heap memory, usable as the driver's page allocator.
pub struct TestMemory {
    pool: FramePool,
    _pages: HeapPages,
}

impl TestMemory {
    pub fn new(frames: usize) -> Self {
        let pages = HeapPages::new(frames);
        let region = MemoryRegion::new(pages.ptr.as_ptr() as usize, frames * PAGE_SIZE);
        let pool = unsafe { FramePool::new(region) }.unwrap();
        Self {
            pool,
            _pages: pages,
        }
    }

    pub fn pool(&mut self) -> &mut FramePool {
        &mut self.pool
    }
}

/// The simulated device: register window, ring memory and bus state.
pub struct SimNic {
    regs: RegisterFile,
    memory: RefCell<TestMemory>,
    enabled: Cell<bool>,
    unmasked: Cell<Option<u8>>,
    window: HeapPages,
}

impl SimNic {
    /// A linked-up 82540EM with `STATUS` set and nothing else programmed.
    pub fn new() -> Self {
        let window = HeapPages::new(WINDOW_SIZE / PAGE_SIZE);
        let regs = unsafe { RegisterFile::new(window.ptr, WINDOW_SIZE) }.unwrap();
        regs.write(Register::Status, STATUS_EXPECTED);
        Self {
            regs,
            memory: RefCell::new(TestMemory::new(DEFAULT_FRAMES)),
            enabled: Cell::new(false),
            unmasked: Cell::new(None),
            window,
        }
    }

    /// Attach the driver with `config`, panicking on failure.
    pub fn attach(&self, config: E1000Config) -> E1000 {
        let mut memory = self.memory.borrow_mut();
        attach(&mut self.bus(), memory.pool(), &mut IdentityMap, config).unwrap()
    }

    pub fn attach_default(&self) -> E1000 {
        self.attach(E1000Config::default())
    }

    /// The PCI function as the driver sees it.
    pub fn bus(&self) -> SimBus<'_> {
        SimBus { nic: self }
    }

    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn unmasked_irq(&self) -> Option<u8> {
        self.unmasked.get()
    }

    pub fn reg(&self, reg: Register) -> u32 {
        self.regs.read(reg)
    }

    pub fn set_reg(&self, reg: Register, value: u32) {
        self.regs.write(reg, value)
    }

    /// Latch exactly `causes` in ICR, as if the device just raised them.
    pub fn raise(&self, causes: u32) {
        self.regs.write(Register::Icr, causes);
    }

    // ───────────────────────────────────────────────────────────────────────
    // Transmit side
    // ───────────────────────────────────────────────────────────────────────

    pub fn tx_descriptor(&self, i: usize) -> TxDescriptor {
        unsafe { self.tx_desc_ptr(i).read_volatile() }
    }

    pub fn tx_buffer(&self, i: usize) -> Vec<u8> {
        self.copy_buffer(self.tx_descriptor(i).addr)
    }

    /// Device finished sending slot `i`.
    pub fn complete_tx(&self, i: usize) {
        let ptr = self.tx_desc_ptr(i);
        unsafe {
            let mut desc = ptr.read_volatile();
            desc.status |= TxStatus::DD.bits();
            ptr.write_volatile(desc);
        }
        let count = self.reg(Register::Tdlen) as usize / DESC_SIZE;
        self.set_reg(Register::Tdh, ((i + 1) % count) as u32);
    }

    fn tx_desc_ptr(&self, i: usize) -> *mut TxDescriptor {
        let count = self.reg(Register::Tdlen) as usize / DESC_SIZE;
        assert!(i < count, "tx slot {} out of range", i);
        let base = self.ring_base(Register::Tdbal, Register::Tdbah);
        unsafe { (base.0 as usize as *mut TxDescriptor).add(i) }
    }

    // ───────────────────────────────────────────────────────────────────────
    // Receive side
    // ───────────────────────────────────────────────────────────────────────

    pub fn rx_descriptor(&self, i: usize) -> RxDescriptor {
        unsafe { self.rx_desc_ptr(i).read_volatile() }
    }

    /// Device stores a complete frame at RDH.
    pub fn deliver_rx(&self, frame: &[u8]) {
        self.store_rx(frame, RxStatus::DD | RxStatus::EOP, 0);
    }

    /// Device stores the first part of a frame that spans descriptors.
    pub fn deliver_rx_fragment(&self, frame: &[u8]) {
        self.store_rx(frame, RxStatus::DD, 0);
    }

    /// Device stores a complete frame with error bits set.
    pub fn deliver_rx_with_errors(&self, frame: &[u8], errors: u8) {
        self.store_rx(frame, RxStatus::DD | RxStatus::EOP, errors);
    }

    fn store_rx(&self, frame: &[u8], status: RxStatus, errors: u8) {
        let count = self.reg(Register::Rdlen) as usize / DESC_SIZE;
        let head = self.reg(Register::Rdh) as usize;
        assert_ne!(head as u32, self.reg(Register::Rdt), "rx ring full");
        assert!(frame.len() <= 2048);

        let ptr = self.rx_desc_ptr(head);
        unsafe {
            let mut desc = ptr.read_volatile();
            core::ptr::copy_nonoverlapping(
                frame.as_ptr(),
                desc.addr as usize as *mut u8,
                frame.len(),
            );
            desc.length = frame.len() as u16;
            desc.status = status.bits();
            desc.errors = errors;
            ptr.write_volatile(desc);
        }

        self.set_reg(Register::Rdh, ((head + 1) % count) as u32);
        self.regs.set_bits(Register::Icr, InterruptCause::RXT0.bits());
    }

    fn rx_desc_ptr(&self, i: usize) -> *mut RxDescriptor {
        let count = self.reg(Register::Rdlen) as usize / DESC_SIZE;
        assert!(i < count, "rx slot {} out of range", i);
        let base = self.ring_base(Register::Rdbal, Register::Rdbah);
        unsafe { (base.0 as usize as *mut RxDescriptor).add(i) }
    }

    fn ring_base(&self, low: Register, high: Register) -> PhysAddr {
        PhysAddr((self.reg(high) as u64) << 32 | self.reg(low) as u64)
    }

    fn copy_buffer(&self, addr: u64) -> Vec<u8> {
        unsafe { core::slice::from_raw_parts(addr as usize as *const u8, 2048) }.to_vec()
    }
}

/// [`BusDevice`] view of a [`SimNic`].
pub struct SimBus<'a> {
    nic: &'a SimNic,
}

impl BusDevice for SimBus<'_> {
    fn enable(&mut self) -> DeviceResources {
        self.nic.enabled.set(true);
        DeviceResources {
            mmio_base: PhysAddr(self.nic.window.ptr.as_ptr() as u64),
            mmio_size: WINDOW_SIZE,
            irq_line: IRQ_LINE,
        }
    }

    fn unmask_irq(&mut self, line: u8) {
        self.nic.unmasked.set(Some(line));
    }
}

/// Process table for the dispatcher.
#[derive(Debug, Default)]
pub struct SimProcesses {
    live: Vec<ProcessHandle>,
}

impl SimProcesses {
    /// Live processes that accept network events.
    pub fn with(pids: &[ProcessId]) -> Self {
        let live = pids
            .iter()
            .map(|&id| ProcessHandle {
                id,
                accepts_net_events: true,
            })
            .collect();
        Self { live }
    }

    /// Add (or downgrade) a live process that refuses network events.
    pub fn add_deaf(&mut self, id: ProcessId) {
        self.live.retain(|p| p.id != id);
        self.live.push(ProcessHandle {
            id,
            accepts_net_events: false,
        });
    }
}

impl ProcessRegistry for SimProcesses {
    fn lookup(&self, pid: ProcessId) -> Option<ProcessHandle> {
        self.live.iter().copied().find(|p| p.id == pid)
    }
}
