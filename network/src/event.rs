//! Wakeup events handed from the interrupt path to the scheduler.
//!
//! The interrupt handler posts while the scheduler may be in the middle of
//! popping on the same CPU, so neither side may take a lock. The inbox is a
//! fixed-capacity lock-free queue; a full inbox drops the event.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use heapless::mpmc::MpMcQueue;
use log::warn;

use crate::types::{Direction, ProcessId};

/// Inbox capacity. One waiter per direction means at most two events are
/// outstanding per device; the rest is headroom for several devices.
pub const INBOX_CAPACITY: usize = 16;

/// "The ring `direction` is ready for `pid` to retry."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetEvent {
    /// Which ring became ready.
    pub direction: Direction,
    /// Process to wake.
    pub pid: ProcessId,
}

/// Where the dispatcher delivers events.
pub trait EventSink {
    /// Queue `event` for its process. Must not block or take a lock.
    fn post(&self, event: NetEvent);
}

/// Scheduler-owned FIFO of pending events.
pub struct EventInbox {
    queue: MpMcQueue<NetEvent, INBOX_CAPACITY>,
    pending: AtomicUsize,
    dropped: AtomicUsize,
}

impl EventInbox {
    /// Empty inbox.
    pub const fn new() -> Self {
        Self {
            queue: MpMcQueue::new(),
            pending: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Oldest pending event.
    pub fn pop(&self) -> Option<NetEvent> {
        let event = self.queue.dequeue()?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// No pending events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events lost because the inbox was full.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for EventInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventInbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventInbox")
            .field("pending", &self.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl EventSink for EventInbox {
    fn post(&self, event: NetEvent) {
        // Count first so a concurrent pop never sees the counter underflow.
        self.pending.fetch_add(1, Ordering::AcqRel);
        if let Err(event) = self.queue.enqueue(event) {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("inbox full, {} wakeup for {} dropped", event.direction, event.pid);
        }
    }
}
