//! Kestrel e1000 network driver core.
//!
//! Owns the Intel 8254x transmit/receive descriptor rings, exposes
//! non-blocking enqueue/dequeue to kernel callers, and turns hardware
//! interrupts into one wakeup event per direction.
//!
//! # Layers
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ syscall / pump tasks / smoltcp adapter                       │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────────────────────────────────────────────────┐
//! │ E1000  (tx path, rx path, interrupt dispatcher, waiters)     │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────────────────────────────────────────────────┐
//! │ RingStorage (descriptors + buffers)   RegisterFile (MMIO)    │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────────────────────────────────────────────────┐
//! │ platform traits: frames, address space, bus, processes       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![no_std]

extern crate alloc;

pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod mmio;
pub mod platform;
pub mod pump;
pub mod ring;
pub mod syscall;
pub mod types;
pub mod wait;

#[cfg(feature = "smoltcp")]
pub mod stack;

#[cfg(test)]
mod sim;

pub use config::E1000Config;
pub use driver::{attach, E1000, NetworkDriver};
pub use error::{AttachError, NetError, Result};
pub use event::{EventInbox, EventSink, NetEvent};
pub use types::{Direction, MacAddress, PhysAddr, ProcessId, VirtAddr};
