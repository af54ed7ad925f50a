//! Driver error types.
//!
//! Two families: retryable results a caller is expected to see in normal
//! operation (`Full`, `Empty`), and fatal ones that mean the ring layout or
//! the hardware contract no longer holds. Nothing in this crate retries or
//! recovers internally; callers decide.

use core::fmt;

use crate::platform::{AllocError, MapError};

pub type Result<T> = core::result::Result<T, NetError>;

/// Errors returned by the transmit, receive and interrupt paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// Transmit ring has no free descriptor. Retry after a wakeup.
    Full,
    /// Receive ring has no completed descriptor. Retry after a wakeup.
    Empty,
    /// Frame length outside `1..=max`. Caller contract violation.
    BadLength {
        /// Offered length.
        len: usize,
        /// Largest accepted length.
        max: usize,
    },
    /// Caller's buffer cannot hold the pending frame.
    BufferTooSmall {
        /// Required size.
        needed: usize,
        /// Provided size.
        provided: usize,
    },
    /// Done set without End-of-Packet: a multi-descriptor frame. Fatal.
    UnsupportedPacket {
        /// Ring slot holding the descriptor.
        index: usize,
        /// Raw status byte.
        status: u8,
    },
    /// Interrupt cause had both or neither direction set. Fatal.
    ProtocolViolation {
        /// ICR value as read.
        cause: u32,
        /// IMS value as read.
        mask: u32,
    },
    /// Attach failed.
    Attach(AttachError),
}

impl NetError {
    /// Whether the error means the driver can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPacket { .. } | Self::ProtocolViolation { .. } | Self::Attach(_)
        )
    }

    /// Negative error number for the syscall ABI.
    pub fn errno(&self) -> i32 {
        match self {
            Self::BadLength { .. } | Self::BufferTooSmall { .. } => -3,
            Self::Full => -17,
            Self::Empty => -18,
            Self::UnsupportedPacket { .. } | Self::ProtocolViolation { .. } => -19,
            Self::Attach(_) => -20,
        }
    }
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "transmit ring full"),
            Self::Empty => write!(f, "receive ring empty"),
            Self::BadLength { len, max } => {
                write!(f, "frame length {} outside 1..={}", len, max)
            }
            Self::BufferTooSmall { needed, provided } => {
                write!(f, "buffer too small: need {} bytes, have {}", needed, provided)
            }
            Self::UnsupportedPacket { index, status } => write!(
                f,
                "rx slot {} done without end-of-packet (status {:#04x})",
                index, status
            ),
            Self::ProtocolViolation { cause, mask } => write!(
                f,
                "bad interrupt: icr {:#010x} ims {:#010x}",
                cause, mask
            ),
            Self::Attach(err) => write!(f, "attach failed: {}", err),
        }
    }
}

impl From<AttachError> for NetError {
    fn from(err: AttachError) -> Self {
        NetError::Attach(err)
    }
}

/// Attach-time failures. All of them are fatal at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachError {
    /// Configuration rejected before touching hardware.
    InvalidConfig(&'static str),
    /// STATUS register did not hold the expected signature.
    BadStatus {
        /// Expected value.
        expected: u32,
        /// Value read.
        found: u32,
    },
    /// Register window smaller than the register map.
    WindowTooSmall {
        /// Mapped size.
        size: usize,
        /// Required size.
        needed: usize,
    },
    /// Page allocator ran out of frames.
    OutOfMemory,
    /// Address-space mapper refused a mapping.
    Mapping(MapError),
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(why) => write!(f, "invalid config: {}", why),
            Self::BadStatus { expected, found } => write!(
                f,
                "unrecognized device status {:#010x} (expected {:#010x})",
                found, expected
            ),
            Self::WindowTooSmall { size, needed } => {
                write!(f, "register window {:#x} bytes, need {:#x}", size, needed)
            }
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::Mapping(err) => write!(f, "mapping failed: {}", err),
        }
    }
}

impl From<AllocError> for AttachError {
    fn from(_: AllocError) -> Self {
        AttachError::OutOfMemory
    }
}

impl From<MapError> for AttachError {
    fn from(err: MapError) -> Self {
        AttachError::Mapping(err)
    }
}
