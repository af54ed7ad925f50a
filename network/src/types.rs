//! Shared plain types.

use core::fmt;

/// MAC address type.
pub type MacAddress = [u8; 6];

/// Largest frame the driver moves, without FCS (the device strips it).
pub const ETH_FRAME_MAX: usize = 1514;

/// A physical (bus) address as seen by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Low 32 bits, for the `*BAL` registers.
    pub const fn low(self) -> u32 {
        self.0 as u32
    }

    /// High 32 bits, for the `*BAH` registers.
    pub const fn high(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::LowerHex for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// A kernel virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtAddr(pub usize);

impl VirtAddr {
    /// Offset by `bytes`.
    pub const fn add(self, bytes: usize) -> Self {
        Self(self.0 + bytes)
    }
}

/// Kernel process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

/// Which half of the device an operation or wakeup concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Transmit ring (producer side).
    Transmit,
    /// Receive ring (consumer side).
    Receive,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transmit => write!(f, "tx"),
            Self::Receive => write!(f, "rx"),
        }
    }
}
