//! Driver configuration.
//!
//! Defaults match QEMU's emulated 82540EM. Builders follow the
//! `with_*` pattern; [`E1000Config::validate`] runs before attach touches
//! any hardware.

use crate::error::AttachError;
use crate::mmio::regs::{RSRPD_SIZE_MAX, STATUS_EXPECTED};
use crate::mmio::InterruptCause;
use crate::platform::PAGE_SIZE;
use crate::ring::{check_ring_size, DESC_SIZE};
use crate::types::{MacAddress, VirtAddr};

/// Default TX descriptor count (16 × 16 = 256 bytes).
pub const DEFAULT_TX_RING_SIZE: usize = 16;

/// Default RX descriptor count (128 × 16 = 2048 bytes).
pub const DEFAULT_RX_RING_SIZE: usize = 128;

/// Buffer size selected by RCTL.BSIZE = 00.
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// MAC address QEMU assigns to its first NIC.
pub const QEMU_MAC: MacAddress = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];

/// Top of the kernel MMIO area; rings are mapped just above it.
pub const DEFAULT_RING_WINDOW: VirtAddr = VirtAddr(0xEFC0_0000);

/// e1000 driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct E1000Config {
    /// TX descriptor count.
    pub tx_ring_size: usize,
    /// RX descriptor count.
    pub rx_ring_size: usize,
    /// Bytes per packet buffer. Only 2048 is programmable via RCTL here.
    pub buffer_size: usize,
    /// Station address written to RAL0/RAH0.
    pub mac: MacAddress,
    /// STATUS value a supported, linked-up device reports.
    pub expected_status: u32,
    /// Virtual address the ring layout is anchored on.
    pub ring_window: VirtAddr,
    /// Interrupt sources enabled in IMS.
    pub interrupts: InterruptCause,
    /// RSRPD small-packet threshold in bytes.
    pub small_packet_threshold: u32,
}

impl Default for E1000Config {
    fn default() -> Self {
        Self {
            tx_ring_size: DEFAULT_TX_RING_SIZE,
            rx_ring_size: DEFAULT_RX_RING_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            mac: QEMU_MAC,
            expected_status: STATUS_EXPECTED,
            ring_window: DEFAULT_RING_WINDOW,
            interrupts: InterruptCause::RECEIVE_READY,
            small_packet_threshold: (DEFAULT_RX_RING_SIZE * DESC_SIZE) as u32,
        }
    }
}

impl E1000Config {
    /// Set the TX ring size.
    pub fn with_tx_ring_size(mut self, count: usize) -> Self {
        self.tx_ring_size = count;
        self
    }

    /// Set the RX ring size. The small-packet threshold follows it, capped
    /// at the largest value RSRPD can hold.
    pub fn with_rx_ring_size(mut self, count: usize) -> Self {
        self.rx_ring_size = count;
        self.small_packet_threshold = ((count * DESC_SIZE) as u32).min(RSRPD_SIZE_MAX);
        self
    }

    /// Set the station address.
    pub fn with_mac(mut self, mac: MacAddress) -> Self {
        self.mac = mac;
        self
    }

    /// Accept a different STATUS signature (other 8254x models or link states).
    pub fn with_expected_status(mut self, status: u32) -> Self {
        self.expected_status = status;
        self
    }

    /// Anchor the ring layout at another virtual address.
    pub fn with_ring_window(mut self, at: VirtAddr) -> Self {
        self.ring_window = at;
        self
    }

    /// Set the RSRPD threshold.
    pub fn with_small_packet_threshold(mut self, bytes: u32) -> Self {
        self.small_packet_threshold = bytes;
        self
    }

    /// Also raise an interrupt when a transmit descriptor is written back,
    /// so a producer parked on a full ring gets woken.
    pub fn with_transmit_wakeups(mut self) -> Self {
        self.interrupts |= InterruptCause::TRANSMIT_DONE;
        self
    }

    /// Check the configuration before any hardware is touched.
    pub fn validate(&self) -> Result<(), AttachError> {
        check_ring_size(self.tx_ring_size)?;
        check_ring_size(self.rx_ring_size)?;
        if self.buffer_size != DEFAULT_BUFFER_SIZE {
            return Err(AttachError::InvalidConfig("buffer size must be 2048"));
        }
        if self.ring_window.0 % PAGE_SIZE != 0 {
            return Err(AttachError::InvalidConfig("ring window not page-aligned"));
        }
        if self.mac[0] & 0x01 != 0 {
            return Err(AttachError::InvalidConfig("station address is multicast"));
        }
        if self.small_packet_threshold > RSRPD_SIZE_MAX {
            return Err(AttachError::InvalidConfig(
                "small-packet threshold exceeds 12 bits",
            ));
        }
        if !self.interrupts.intersects(InterruptCause::RECEIVE_READY) {
            return Err(AttachError::InvalidConfig("no receive interrupt enabled"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = E1000Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.small_packet_threshold, 2048);
        assert!(!config.interrupts.contains(InterruptCause::TXDW));
    }

    #[test]
    fn test_transmit_wakeups_opt_in() {
        let config = E1000Config::default().with_transmit_wakeups();
        assert!(config.interrupts.contains(InterruptCause::TXDW));
        assert!(config.interrupts.contains(InterruptCause::RXT0));
    }

    #[test]
    fn test_rejects_bad_rings() {
        assert!(E1000Config::default().with_tx_ring_size(4).validate().is_err());
        assert!(E1000Config::default().with_rx_ring_size(512).validate().is_err());
        let config = E1000Config::default().with_rx_ring_size(64);
        assert!(config.validate().is_ok());
        assert_eq!(config.small_packet_threshold, 1024);
    }

    #[test]
    fn test_small_packet_threshold_fits_rsrpd() {
        let config = E1000Config::default().with_rx_ring_size(256);
        assert!(config.validate().is_ok());
        assert_eq!(config.small_packet_threshold, 0xFFF);

        let config = E1000Config::default().with_small_packet_threshold(0x1000);
        assert_eq!(
            config.validate(),
            Err(AttachError::InvalidConfig(
                "small-packet threshold exceeds 12 bits"
            ))
        );
    }

    #[test]
    fn test_rejects_multicast_mac() {
        let config = E1000Config::default().with_mac([0x01, 0, 0x5e, 0, 0, 1]);
        assert_eq!(
            config.validate(),
            Err(AttachError::InvalidConfig("station address is multicast"))
        );
    }
}
