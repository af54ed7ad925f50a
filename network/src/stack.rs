//! smoltcp integration layer.
//!
//! [`DeviceAdapter`] exposes any [`NetworkDriver`] as a `smoltcp::phy::Device`
//! so an in-kernel stack can sit directly on the rings.
//!
//! # Usage
//!
//! ```ignore
//! use kestrel_network::stack::DeviceAdapter;
//! use smoltcp::iface::{Config, Interface};
//!
//! let mut adapter = DeviceAdapter::new(&dev);
//! let config = Config::new(EthernetAddress(dev.mac_address()).into());
//! let mut iface = Interface::new(config, &mut adapter, now);
//! ```

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use log::{error, warn};
use smoltcp::phy::{Device, DeviceCapabilities, Medium, RxToken, TxToken};
use smoltcp::time::Instant;

use crate::config::DEFAULT_BUFFER_SIZE;
use crate::driver::NetworkDriver;
use crate::types::ETH_FRAME_MAX;

/// Largest frame handed to smoltcp: one buffer, FCS already stripped.
const MTU: usize = ETH_FRAME_MAX;

/// Per-adapter packet counters.
#[derive(Debug, Default)]
pub struct AdapterStats {
    rx_packets: AtomicU32,
    rx_errors: AtomicU32,
    tx_packets: AtomicU32,
    tx_errors: AtomicU32,
}

impl AdapterStats {
    /// Frames handed to smoltcp.
    pub fn rx_packets(&self) -> u32 {
        self.rx_packets.load(Ordering::Relaxed)
    }

    /// Receive attempts that failed with a recoverable error.
    pub fn rx_errors(&self) -> u32 {
        self.rx_errors.load(Ordering::Relaxed)
    }

    /// Frames queued on the device.
    pub fn tx_packets(&self) -> u32 {
        self.tx_packets.load(Ordering::Relaxed)
    }

    /// Frames lost because the device refused them.
    pub fn tx_errors(&self) -> u32 {
        self.tx_errors.load(Ordering::Relaxed)
    }
}

/// Thin adapter that exposes a `NetworkDriver` to smoltcp.
pub struct DeviceAdapter<'d, D: NetworkDriver> {
    dev: &'d D,
    stats: AdapterStats,
}

impl<'d, D: NetworkDriver> DeviceAdapter<'d, D> {
    pub fn new(dev: &'d D) -> Self {
        Self {
            dev,
            stats: AdapterStats::default(),
        }
    }

    /// Packet counters.
    pub fn stats(&self) -> &AdapterStats {
        &self.stats
    }
}

impl<'d, D: NetworkDriver> Device for DeviceAdapter<'d, D> {
    type RxToken<'a> = AdapterRxToken where Self: 'a;
    type TxToken<'a> = AdapterTxToken<'a, D> where Self: 'a;

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.max_transmission_unit = MTU;
        caps.medium = Medium::Ethernet;
        caps
    }

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        let mut buffer = vec![0u8; DEFAULT_BUFFER_SIZE];
        match self.dev.receive(&mut buffer) {
            Ok(Some(len)) => {
                buffer.truncate(len);
                self.stats.rx_packets.fetch_add(1, Ordering::Relaxed);
                Some((
                    AdapterRxToken { buffer },
                    AdapterTxToken {
                        dev: self.dev,
                        stats: &self.stats,
                    },
                ))
            }
            Ok(None) => None,
            // The ring is stuck on this descriptor; polling again cannot help.
            Err(err) if err.is_fatal() => {
                error!("stack: fatal receive error: {}", err);
                panic!("stack: {}", err);
            }
            Err(err) => {
                self.stats.rx_errors.fetch_add(1, Ordering::Relaxed);
                warn!("stack: receive failed: {}", err);
                None
            }
        }
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        if self.dev.can_transmit() {
            Some(AdapterTxToken {
                dev: self.dev,
                stats: &self.stats,
            })
        } else {
            None
        }
    }
}

/// Owns one received frame.
pub struct AdapterRxToken {
    buffer: Vec<u8>,
}

impl RxToken for AdapterRxToken {
    fn consume<R, F>(mut self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        f(&mut self.buffer)
    }
}

/// Stages one outgoing frame and queues it on consume.
pub struct AdapterTxToken<'a, D: NetworkDriver> {
    dev: &'a D,
    stats: &'a AdapterStats,
}

impl<'a, D: NetworkDriver> TxToken for AdapterTxToken<'a, D> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut buffer = [0u8; MTU];
        let result = f(&mut buffer[..len]);

        // smoltcp has no way to hear about a failed send; count it.
        match self.dev.transmit(&buffer[..len]) {
            Ok(()) => {
                self.stats.tx_packets.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.stats.tx_errors.fetch_add(1, Ordering::Relaxed);
                warn!("stack: frame dropped: {}", err);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimNic;

    fn now() -> Instant {
        Instant::from_millis(0)
    }

    #[test]
    fn test_capabilities() {
        let nic = SimNic::new();
        let dev = nic.attach_default();
        let adapter = DeviceAdapter::new(&dev);

        let caps = adapter.capabilities();
        assert_eq!(caps.max_transmission_unit, 1514);
        assert_eq!(caps.medium, Medium::Ethernet);
    }

    #[test]
    fn test_receive_token_owns_frame() {
        let nic = SimNic::new();
        let dev = nic.attach_default();
        let mut adapter = DeviceAdapter::new(&dev);

        assert!(adapter.receive(now()).is_none());

        nic.deliver_rx(&[0x5A; 60]);
        let (rx, _tx) = adapter.receive(now()).unwrap();
        let copied = rx.consume(|frame| frame.to_vec());
        assert_eq!(copied, vec![0x5A; 60]);
        assert_eq!(adapter.stats().rx_packets(), 1);
    }

    #[test]
    #[should_panic(expected = "done without end-of-packet")]
    fn test_fragment_is_fatal() {
        let nic = SimNic::new();
        let dev = nic.attach_default();
        let mut adapter = DeviceAdapter::new(&dev);

        nic.deliver_rx_fragment(&[0x5A; 60]);
        let _ = adapter.receive(now());
    }

    #[test]
    fn test_transmit_token_queues_frame() {
        let nic = SimNic::new();
        let dev = nic.attach_default();
        let mut adapter = DeviceAdapter::new(&dev);

        let tx = adapter.transmit(now()).unwrap();
        tx.consume(42, |buf| buf.fill(0x77));

        assert_eq!(nic.tx_descriptor(0).length, 42);
        assert_eq!(&nic.tx_buffer(0)[..42], &[0x77; 42]);
        assert_eq!(adapter.stats().tx_packets(), 1);
    }

    #[test]
    fn test_full_ring_yields_no_token() {
        let nic = SimNic::new();
        let dev = nic.attach_default();
        for _ in 0..16 {
            dev.transmit(&[1; 60]).unwrap();
        }
        let mut adapter = DeviceAdapter::new(&dev);
        assert!(adapter.transmit(now()).is_none());
    }
}
