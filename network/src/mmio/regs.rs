//! 8254x register map and bit definitions.
//!
//! Only the registers this driver touches are listed.
//!
//! # Reference
//! Intel PCI/PCI-X Family of Gigabit Ethernet Controllers SDM, §13

use bitflags::bitflags;

/// Registers by byte offset from BAR0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Register {
    /// Device Status (read-only).
    Status = 0x0008,
    /// Interrupt Cause Read (read clears; write-1 clears).
    Icr = 0x00C0,
    /// Interrupt Cause Set.
    Ics = 0x00C8,
    /// Interrupt Mask Set/Read.
    Ims = 0x00D0,
    /// Receive Control.
    Rctl = 0x0100,
    /// Transmit Control.
    Tctl = 0x0400,
    /// Transmit Inter-Packet Gap.
    Tipg = 0x0410,
    /// RX Descriptor Base Address Low.
    Rdbal = 0x2800,
    /// RX Descriptor Base Address High.
    Rdbah = 0x2804,
    /// RX Descriptor Length (bytes).
    Rdlen = 0x2808,
    /// RX Descriptor Head.
    Rdh = 0x2810,
    /// RX Descriptor Tail.
    Rdt = 0x2818,
    /// RX Descriptor Control.
    Rxdctl = 0x2828,
    /// RX Small Packet Detect threshold.
    Rsrpd = 0x2C00,
    /// TX Descriptor Base Address Low.
    Tdbal = 0x3800,
    /// TX Descriptor Base Address High.
    Tdbah = 0x3804,
    /// TX Descriptor Length (bytes).
    Tdlen = 0x3808,
    /// TX Descriptor Head.
    Tdh = 0x3810,
    /// TX Descriptor Tail.
    Tdt = 0x3818,
    /// Receive Address Low, entry 0.
    Ral0 = 0x5400,
    /// Receive Address High, entry 0.
    Rah0 = 0x5404,
}

impl Register {
    /// Byte offset from the start of the window.
    #[inline]
    pub const fn offset(self) -> usize {
        self as usize
    }
}

/// Smallest register window that covers every [`Register`].
pub const WINDOW_MIN: usize = Register::Rah0.offset() + 4;

/// STATUS of an 82540EM with link up at 1000/full, as QEMU reports it.
pub const STATUS_EXPECTED: u32 = 0x8008_0783;

/// TIPG for IEEE 802.3 copper: IPGT 10, IPGR1 8, IPGR2 6.
pub const TIPG_DEFAULT: u32 = 10 | (8 << 10) | (6 << 20);

/// RXDCTL with write-back threshold 1: descriptors are written back one by one.
pub const RXDCTL_WTHRESH_1: u32 = 1 << 16;

/// RAH address-valid bit.
pub const RAH_AV: u32 = 1 << 31;

/// RSRPD.SIZE is a 12-bit byte count.
pub const RSRPD_SIZE_MAX: u32 = 0xFFF;

bitflags! {
    /// Interrupt causes shared by ICR, ICS, IMS and IMC.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptCause: u32 {
        /// Transmit descriptor written back.
        const TXDW = 0x0000_0001;
        /// Receive sequence error.
        const RXSEQ = 0x0000_0008;
        /// Receive descriptor minimum threshold reached.
        const RXDMT0 = 0x0000_0010;
        /// Receiver overrun.
        const RXO = 0x0000_0040;
        /// Receiver timer expired.
        const RXT0 = 0x0000_0080;
        /// Small receive packet detected.
        const SRPD = 0x0001_0000;
    }
}

impl InterruptCause {
    /// Causes that mean "a received frame is waiting".
    pub const RECEIVE_READY: Self = Self::RXT0.union(Self::SRPD);
    /// Causes that mean "a transmit descriptor completed".
    pub const TRANSMIT_DONE: Self = Self::TXDW;
}

bitflags! {
    /// Transmit Control bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Tctl: u32 {
        /// Transmitter enable.
        const EN = 0x0000_0002;
        /// Pad short packets.
        const PSP = 0x0000_0008;
        /// Collision threshold field = 0x10.
        const CT_DEFAULT = 0x0000_0100;
        /// Collision distance field = 0x40 (full duplex).
        const COLD_DEFAULT = 0x0004_0000;
    }
}

bitflags! {
    /// Receive Control bits.
    ///
    /// BSIZE = 00 with BSEX clear selects 2048-byte buffers, so the buffer
    /// size class needs no bit of its own.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Rctl: u32 {
        /// Receiver enable.
        const EN = 0x0000_0002;
        /// Unicast promiscuous.
        const UPE = 0x0000_0008;
        /// Descriptor minimum threshold = 1/8 of the ring.
        const RDMTS_EIGHTH = 0x0000_0200;
        /// Accept broadcast.
        const BAM = 0x0000_8000;
        /// Strip Ethernet CRC.
        const SECRC = 0x0400_0000;
    }
}
