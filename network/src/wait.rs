//! Per-direction waiter slots.
//!
//! One process per direction may wait for the next interrupt. Registration
//! replaces any earlier waiter; the dispatcher takes the slot when it fires.
//! Slots are atomics so the interrupt path never touches a ring lock.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::types::{Direction, ProcessId};

/// Slot value meaning "nobody is waiting". Process 0 is the kernel itself.
const EMPTY: u32 = 0;

/// Waiter slots for both directions.
#[derive(Debug, Default)]
pub struct WaiterSlots {
    transmit: AtomicU32,
    receive: AtomicU32,
}

impl WaiterSlots {
    /// Both slots empty.
    pub const fn new() -> Self {
        Self {
            transmit: AtomicU32::new(EMPTY),
            receive: AtomicU32::new(EMPTY),
        }
    }

    /// Make `pid` the waiter for `direction`, returning whoever it replaced.
    pub fn register(&self, direction: Direction, pid: ProcessId) -> Option<ProcessId> {
        decode(self.slot(direction).swap(pid.0, Ordering::AcqRel))
    }

    /// Current waiter, left in place.
    pub fn peek(&self, direction: Direction) -> Option<ProcessId> {
        decode(self.slot(direction).load(Ordering::Acquire))
    }

    /// Remove and return the waiter.
    pub fn take(&self, direction: Direction) -> Option<ProcessId> {
        decode(self.slot(direction).swap(EMPTY, Ordering::AcqRel))
    }

    fn slot(&self, direction: Direction) -> &AtomicU32 {
        match direction {
            Direction::Transmit => &self.transmit,
            Direction::Receive => &self.receive,
        }
    }
}

fn decode(raw: u32) -> Option<ProcessId> {
    (raw != EMPTY).then_some(ProcessId(raw))
}
