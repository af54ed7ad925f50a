//! Driver trait definitions.
//!
//! Higher layers (the smoltcp adapter, tests) talk to a NIC through
//! [`NetworkDriver`] and never see rings or registers.

use crate::error::Result;
use crate::types::MacAddress;

/// Core network device interface.
///
/// Every method takes `&self`: a driver is shared between the interrupt
/// path and one producer and one consumer, and synchronizes internally.
pub trait NetworkDriver {
    /// Get MAC address.
    fn mac_address(&self) -> MacAddress;

    /// Check if device can accept a TX frame.
    ///
    /// Returns true if `transmit()` will not report `Full`.
    fn can_transmit(&self) -> bool;

    /// Check if device has a received frame ready.
    ///
    /// Returns true if `receive()` will return `Ok(Some(_))`.
    fn can_receive(&self) -> bool;

    /// Transmit an Ethernet frame.
    ///
    /// # Arguments
    /// - `frame`: complete Ethernet frame without FCS
    ///
    /// # Returns
    /// - `Ok(())`: frame queued (fire-and-forget)
    /// - `Err(NetError::Full)`: no space, try again later
    ///
    /// # Contract
    /// - MUST return immediately (no completion wait)
    fn transmit(&self, frame: &[u8]) -> Result<()>;

    /// Receive an Ethernet frame.
    ///
    /// # Arguments
    /// - `buffer`: buffer to copy frame into
    ///
    /// # Returns
    /// - `Ok(Some(len))`: frame received, `len` bytes copied
    /// - `Ok(None)`: no frame available (normal)
    /// - `Err(NetError)`: receive error
    ///
    /// # Contract
    /// - MUST return immediately (no blocking, no waiter registration)
    fn receive(&self, buffer: &mut [u8]) -> Result<Option<usize>>;
}
