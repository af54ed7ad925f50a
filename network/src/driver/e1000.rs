//! The e1000 driver instance.
//!
//! One `E1000` owns one device: its register window, both rings and both
//! waiter slots. It is shared by reference between the kernel's syscall
//! path, the interrupt handler and the pump tasks.
//!
//! # Locking
//!
//! ```text
//! transmit / can_transmit        ──> tx: Mutex<TxRing>
//! receive* / can_receive         ──> rx: Mutex<RxRing>
//! on_interrupt / register_waiter ──> waiters (atomics), ICR/IMS
//! ```
//!
//! There is one producer and one consumer, so the ring locks are never
//! contended; they exist so the instance is `Sync`. The interrupt path takes
//! no lock at all: waiters are atomics and [`EventInbox`](crate::EventInbox)
//! is a lock-free queue.

use alloc::vec::Vec;

use log::debug;
use spin::Mutex;

use crate::error::{NetError, Result};
use crate::event::{EventSink, NetEvent};
use crate::mmio::{InterruptCause, Register, RegisterFile};
use crate::platform::ProcessRegistry;
use crate::types::{Direction, MacAddress, ProcessId};
use crate::wait::WaiterSlots;

use super::irq;
use super::rx::RxRing;
use super::traits::NetworkDriver;
use super::tx::TxRing;

/// Intel 8254x network driver.
pub struct E1000 {
    /// Device registers.
    regs: RegisterFile,
    /// TX descriptor ring.
    tx: Mutex<TxRing>,
    /// RX descriptor ring.
    rx: Mutex<RxRing>,
    /// One waiting process per direction.
    waiters: WaiterSlots,
    /// Station address programmed into RAL0/RAH0.
    mac: MacAddress,
    /// Legacy interrupt line.
    irq_line: u8,
}

impl E1000 {
    /// Assemble an attached device. See [`attach`](super::attach).
    pub(crate) fn from_parts(
        regs: RegisterFile,
        tx: TxRing,
        rx: RxRing,
        mac: MacAddress,
        irq_line: u8,
    ) -> Self {
        Self {
            regs,
            tx: Mutex::new(tx),
            rx: Mutex::new(rx),
            waiters: WaiterSlots::new(),
            mac,
            irq_line,
        }
    }

    /// Station address.
    pub fn mac_address(&self) -> MacAddress {
        self.mac
    }

    /// Interrupt line the kernel should route to [`on_interrupt`](Self::on_interrupt).
    pub fn irq_line(&self) -> u8 {
        self.irq_line
    }

    /// The register window, for inspecting device-side effects in tests.
    #[cfg(test)]
    pub(crate) fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// TX descriptor count.
    pub fn tx_ring_size(&self) -> usize {
        self.tx.lock().len()
    }

    /// RX descriptor count.
    pub fn rx_ring_size(&self) -> usize {
        self.rx.lock().len()
    }

    // ───────────────────────────────────────────────────────────────────────
    // Transmit
    // ───────────────────────────────────────────────────────────────────────

    /// Queue one frame. Never blocks and never registers a waiter.
    pub fn transmit(&self, frame: &[u8]) -> Result<()> {
        self.tx.lock().transmit(&self.regs, frame)
    }

    /// Whether `transmit` would find a free descriptor.
    pub fn can_transmit(&self) -> bool {
        self.tx.lock().can_transmit()
    }

    // ───────────────────────────────────────────────────────────────────────
    // Receive
    // ───────────────────────────────────────────────────────────────────────

    /// Take the next received frame.
    ///
    /// With `wait` set, an empty ring makes `caller` the receive waiter and
    /// arms the receive timer, so the next interrupt wakes it. The call
    /// itself still returns `Empty` immediately.
    pub fn receive(&self, caller: ProcessId, wait: bool) -> Result<Vec<u8>> {
        let result = self.rx.lock().receive(&self.regs);
        self.after_receive(result, caller, wait)
    }

    /// As [`receive`](Self::receive), copying into `buf`.
    pub fn receive_into(&self, caller: ProcessId, wait: bool, buf: &mut [u8]) -> Result<usize> {
        let result = self.rx.lock().receive_into(&self.regs, buf);
        self.after_receive(result, caller, wait)
    }

    /// Whether a received frame is waiting.
    pub fn can_receive(&self) -> bool {
        self.rx.lock().can_receive()
    }

    fn after_receive<T>(&self, result: Result<T>, caller: ProcessId, wait: bool) -> Result<T> {
        if let Err(NetError::Empty) = result {
            if wait {
                self.register_waiter(Direction::Receive, caller);
                // Register first: ICS fires the interrupt right away.
                self.regs.write(Register::Ics, InterruptCause::RXT0.bits());
            }
        }
        result
    }

    // ───────────────────────────────────────────────────────────────────────
    // Interrupts and waiters
    // ───────────────────────────────────────────────────────────────────────

    /// Make `pid` the waiter for `direction`, replacing any earlier one.
    pub fn register_waiter(&self, direction: Direction, pid: ProcessId) {
        if let Some(previous) = self.waiters.register(direction, pid) {
            if previous != pid {
                debug!("e1000: {} waiter {} replaced by {}", direction, previous, pid);
            }
        }
    }

    /// Whether an interrupt source for `direction` is enabled in IMS.
    pub fn wakeups_enabled(&self, direction: Direction) -> bool {
        let enabled = InterruptCause::from_bits_retain(self.regs.read(Register::Ims));
        match direction {
            Direction::Transmit => enabled.intersects(InterruptCause::TRANSMIT_DONE),
            Direction::Receive => enabled.intersects(InterruptCause::RECEIVE_READY),
        }
    }

    /// Current waiter for `direction`.
    pub fn waiter(&self, direction: Direction) -> Option<ProcessId> {
        self.waiters.peek(direction)
    }

    /// Service a device interrupt. See [`irq::dispatch`].
    pub fn on_interrupt<R, S>(&self, registry: &R, sink: &S) -> Result<Option<NetEvent>>
    where
        R: ProcessRegistry + ?Sized,
        S: EventSink + ?Sized,
    {
        irq::dispatch(&self.regs, &self.waiters, registry, sink)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// NETWORK DRIVER IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════

impl NetworkDriver for E1000 {
    fn mac_address(&self) -> MacAddress {
        self.mac
    }

    fn can_transmit(&self) -> bool {
        E1000::can_transmit(self)
    }

    fn can_receive(&self) -> bool {
        E1000::can_receive(self)
    }

    fn transmit(&self, frame: &[u8]) -> Result<()> {
        E1000::transmit(self, frame)
    }

    fn receive(&self, buffer: &mut [u8]) -> Result<Option<usize>> {
        match self.rx.lock().receive_into(&self.regs, buffer) {
            Ok(len) => Ok(Some(len)),
            Err(NetError::Empty) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimNic;

    fn assert_sync<T: Send + Sync>() {}

    #[test]
    fn test_driver_is_shareable() {
        assert_sync::<E1000>();
    }

    #[test]
    fn test_accessors() {
        let nic = SimNic::new();
        let dev = nic.attach_default();

        assert_eq!(dev.mac_address(), [0x52, 0x54, 0x00, 0x12, 0x34, 0x56]);
        assert_eq!(dev.tx_ring_size(), 16);
        assert_eq!(dev.rx_ring_size(), 128);
        assert_eq!(dev.waiter(Direction::Transmit), None);

        assert!(dev.wakeups_enabled(Direction::Receive));
        assert!(!dev.wakeups_enabled(Direction::Transmit));

        dev.register_waiter(Direction::Transmit, ProcessId(5));
        assert_eq!(dev.waiter(Direction::Transmit), Some(ProcessId(5)));
        assert_eq!(dev.waiter(Direction::Receive), None);
    }

    #[test]
    fn test_trait_receive_never_waits() {
        let nic = SimNic::new();
        let dev = nic.attach_default();
        let mut buf = [0u8; 2048];

        assert_eq!(NetworkDriver::receive(&dev, &mut buf), Ok(None));
        assert_eq!(dev.waiter(Direction::Receive), None);

        nic.deliver_rx(&[3; 60]);
        assert_eq!(NetworkDriver::receive(&dev, &mut buf), Ok(Some(60)));
        assert_eq!(&buf[..60], &[3; 60]);
    }
}
