//! Cooperative pump tasks.
//!
//! A network server talks to the driver through two small tasks: the output
//! pump moves frames from the server to the TX ring, the input pump moves
//! frames from the RX ring to the server. Neither ever spins. When the ring
//! is full or empty the task registers as waiter, parks, and does nothing
//! until the scheduler hands it the matching [`NetEvent`].
//!
//! ```text
//!            step()                      resume(event)
//!  Running ─────────> Full/Empty ──> Parked ──────────────> Running
//!     │                                 ▲
//!     └── Progress / Idle               └── step() is a no-op
//! ```
//!
//! The output pump is only ever woken by a transmit-done interrupt, which
//! the driver enables with
//! [`E1000Config::with_transmit_wakeups`](crate::E1000Config::with_transmit_wakeups).
//! On a device without it the output pump never parks: a full ring keeps the
//! frame pending and reports [`Step::Idle`], and the caller polls.

use alloc::vec;
use alloc::vec::Vec;

use log::{debug, warn};

use crate::driver::E1000;
use crate::error::{NetError, Result};
use crate::event::NetEvent;
use crate::syscall::{sys_recv_packet, sys_send_packet};
use crate::types::{Direction, ProcessId};

/// Outcome of one [`OutputPump::step`] or [`InputPump::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// One frame moved.
    Progress,
    /// Waiting for a wakeup in this direction.
    Parked(Direction),
    /// Nothing to do right now.
    Idle,
}

/// Frames the network server wants sent.
pub trait FrameSource {
    /// Next outgoing frame, if one is ready.
    fn next_frame(&mut self) -> Option<Vec<u8>>;
}

/// Where received frames go.
pub trait FrameSink {
    /// Hand one received frame to the server.
    fn deliver(&mut self, frame: &[u8]);
}

/// Parked flag shared by both pumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Parking {
    pid: ProcessId,
    direction: Direction,
    parked: bool,
}

impl Parking {
    const fn new(pid: ProcessId, direction: Direction) -> Self {
        Self {
            pid,
            direction,
            parked: false,
        }
    }

    fn park(&mut self) -> Step {
        self.parked = true;
        debug!("pump {}: parked on {}", self.pid, self.direction);
        Step::Parked(self.direction)
    }

    fn resume(&mut self, event: &NetEvent) -> bool {
        if self.parked && event.pid == self.pid && event.direction == self.direction {
            self.parked = false;
            return true;
        }
        false
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════════════════════

/// Moves frames from a [`FrameSource`] to the TX ring.
pub struct OutputPump<S: FrameSource> {
    source: S,
    /// Frame that hit a full ring, retried first after a wakeup.
    pending: Option<Vec<u8>>,
    parking: Parking,
    /// Set once the missing-wakeup warning has been logged.
    warned: bool,
}

impl<S: FrameSource> OutputPump<S> {
    /// New pump running as `pid`.
    pub fn new(pid: ProcessId, source: S) -> Self {
        Self {
            source,
            pending: None,
            parking: Parking::new(pid, Direction::Transmit),
            warned: false,
        }
    }

    /// Send at most one frame.
    ///
    /// A frame the driver rejects outright (bad length) is dropped and the
    /// error returned; the pump keeps running.
    pub fn step(&mut self, dev: &E1000) -> Result<Step> {
        if self.parking.parked {
            return Ok(Step::Parked(Direction::Transmit));
        }
        let frame = match self.pending.take() {
            Some(frame) => frame,
            None => match self.source.next_frame() {
                Some(frame) => frame,
                None => return Ok(Step::Idle),
            },
        };

        match sys_send_packet(dev, self.parking.pid, &frame) {
            Ok(()) => Ok(Step::Progress),
            Err(NetError::Full) => {
                self.pending = Some(frame);
                if dev.wakeups_enabled(Direction::Transmit) {
                    return Ok(self.parking.park());
                }
                if !self.warned {
                    warn!(
                        "pump {}: transmit wakeups disabled, polling instead of parking",
                        self.parking.pid
                    );
                    self.warned = true;
                }
                Ok(Step::Idle)
            }
            Err(err) => {
                warn!("pump {}: dropped frame: {}", self.parking.pid, err);
                Err(err)
            }
        }
    }

    /// Unpark if `event` is this pump's transmit wakeup.
    pub fn resume(&mut self, event: &NetEvent) -> bool {
        self.parking.resume(event)
    }

    /// Whether the pump is waiting for a wakeup.
    pub fn is_parked(&self) -> bool {
        self.parking.parked
    }

    /// Process the pump runs as.
    pub fn pid(&self) -> ProcessId {
        self.parking.pid
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// INPUT
// ═══════════════════════════════════════════════════════════════════════════

/// Moves frames from the RX ring to a [`FrameSink`].
pub struct InputPump<K: FrameSink> {
    sink: K,
    /// Staging buffer, one RX buffer long.
    buffer: Vec<u8>,
    parking: Parking,
}

impl<K: FrameSink> InputPump<K> {
    /// New pump running as `pid`, staging frames of up to `buffer_size` bytes.
    pub fn new(pid: ProcessId, sink: K, buffer_size: usize) -> Self {
        Self {
            sink,
            buffer: vec![0; buffer_size],
            parking: Parking::new(pid, Direction::Receive),
        }
    }

    /// Deliver at most one frame.
    ///
    /// # Panics
    /// On a fatal ring error, via [`sys_recv_packet`].
    pub fn step(&mut self, dev: &E1000) -> Result<Step> {
        if self.parking.parked {
            return Ok(Step::Parked(Direction::Receive));
        }
        match sys_recv_packet(dev, self.parking.pid, &mut self.buffer, true) {
            Ok(len) => {
                self.sink.deliver(&self.buffer[..len]);
                Ok(Step::Progress)
            }
            Err(NetError::Empty) => Ok(self.parking.park()),
            Err(err) => Err(err),
        }
    }

    /// Unpark if `event` is this pump's receive wakeup.
    pub fn resume(&mut self, event: &NetEvent) -> bool {
        self.parking.resume(event)
    }

    /// Whether the pump is waiting for a wakeup.
    pub fn is_parked(&self) -> bool {
        self.parking.parked
    }

    /// Process the pump runs as.
    pub fn pid(&self) -> ProcessId {
        self.parking.pid
    }

    /// The frame consumer.
    pub fn sink(&self) -> &K {
        &self.sink
    }
}
