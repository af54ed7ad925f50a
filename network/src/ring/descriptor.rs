//! Legacy 8254x descriptor formats.
//!
//! Both formats are 16 bytes, little-endian, and laid out exactly as the
//! device reads and writes them.
//!
//! ```text
//! TX:  [ addr:8 | length:2 | cso:1 | cmd:1 | status:1 | css:1 | special:2 ]
//! RX:  [ addr:8 | length:2 | csum:2 | status:1 | errors:1 | special:2 ]
//! ```

use bitflags::bitflags;

use crate::types::PhysAddr;

/// Size of either descriptor format in bytes.
pub const DESC_SIZE: usize = 16;

bitflags! {
    /// TX descriptor CMD byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxCommand: u8 {
        /// End of packet.
        const EOP = 0x01;
        /// Report status: device sets DD when done.
        const RS = 0x08;
    }
}

bitflags! {
    /// TX descriptor STATUS byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxStatus: u8 {
        /// Descriptor done.
        const DD = 0x01;
    }
}

bitflags! {
    /// RX descriptor STATUS byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxStatus: u8 {
        /// Descriptor done.
        const DD = 0x01;
        /// End of packet.
        const EOP = 0x02;
    }
}

bitflags! {
    /// RX descriptor ERRORS byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxErrors: u8 {
        /// CRC or alignment error.
        const CE = 0x01;
        /// Symbol error.
        const SE = 0x02;
        /// Sequence error.
        const SEQ = 0x04;
        /// Carrier extension error.
        const CXE = 0x10;
        /// TCP/UDP checksum error.
        const TCPE = 0x20;
        /// IP checksum error.
        const IPE = 0x40;
        /// RX data error.
        const RXE = 0x80;
    }
}

/// Common shape of the two descriptor formats.
pub trait Descriptor: Copy {
    /// A zeroed descriptor pointing at `buffer`.
    fn with_buffer(buffer: PhysAddr) -> Self;

    /// Buffer physical address.
    fn buffer_addr(&self) -> PhysAddr;
}

/// Legacy transmit descriptor.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxDescriptor {
    /// Buffer physical address.
    pub addr: u64,
    /// Bytes to send from the buffer.
    pub length: u16,
    /// Checksum offset.
    pub cso: u8,
    /// Command bits, see [`TxCommand`].
    pub cmd: u8,
    /// Status bits, see [`TxStatus`].
    pub status: u8,
    /// Checksum start.
    pub css: u8,
    /// VLAN / special field.
    pub special: u16,
}

impl TxDescriptor {
    /// Device has finished with this descriptor.
    #[inline]
    pub fn is_done(&self) -> bool {
        TxStatus::from_bits_retain(self.status).contains(TxStatus::DD)
    }
}

impl Descriptor for TxDescriptor {
    fn with_buffer(buffer: PhysAddr) -> Self {
        Self {
            addr: buffer.0,
            ..Self::default()
        }
    }

    fn buffer_addr(&self) -> PhysAddr {
        PhysAddr(self.addr)
    }
}

/// Legacy receive descriptor.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxDescriptor {
    /// Buffer physical address.
    pub addr: u64,
    /// Bytes the device wrote into the buffer.
    pub length: u16,
    /// Packet checksum.
    pub checksum: u16,
    /// Status bits, see [`RxStatus`].
    pub status: u8,
    /// Error bits, see [`RxErrors`].
    pub errors: u8,
    /// VLAN / special field.
    pub special: u16,
}

impl RxDescriptor {
    /// Decoded status byte.
    #[inline]
    pub fn status(&self) -> RxStatus {
        RxStatus::from_bits_retain(self.status)
    }

    /// Decoded errors byte.
    #[inline]
    pub fn errors(&self) -> RxErrors {
        RxErrors::from_bits_retain(self.errors)
    }
}

impl Descriptor for RxDescriptor {
    fn with_buffer(buffer: PhysAddr) -> Self {
        Self {
            addr: buffer.0,
            ..Self::default()
        }
    }

    fn buffer_addr(&self) -> PhysAddr {
        PhysAddr(self.addr)
    }
}

const _: () = assert!(core::mem::size_of::<TxDescriptor>() == DESC_SIZE);
const _: () = assert!(core::mem::size_of::<RxDescriptor>() == DESC_SIZE);

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::offset_of;

    #[test]
    fn test_tx_field_offsets() {
        assert_eq!(offset_of!(TxDescriptor, length), 8);
        assert_eq!(offset_of!(TxDescriptor, cmd), 11);
        assert_eq!(offset_of!(TxDescriptor, status), 12);
        assert_eq!(offset_of!(TxDescriptor, special), 14);
    }

    #[test]
    fn test_rx_field_offsets() {
        assert_eq!(offset_of!(RxDescriptor, length), 8);
        assert_eq!(offset_of!(RxDescriptor, status), 12);
        assert_eq!(offset_of!(RxDescriptor, errors), 13);
    }

    #[test]
    fn test_done_bits() {
        let mut tx = TxDescriptor::with_buffer(PhysAddr(0x1000));
        assert!(!tx.is_done());
        tx.status = TxStatus::DD.bits();
        assert!(tx.is_done());
        assert_eq!(tx.buffer_addr(), PhysAddr(0x1000));

        let rx = RxDescriptor {
            status: (RxStatus::DD | RxStatus::EOP).bits(),
            ..RxDescriptor::with_buffer(PhysAddr(0x2000))
        };
        assert!(rx.status().contains(RxStatus::DD | RxStatus::EOP));
        assert!(rx.errors().is_empty());
    }
}
