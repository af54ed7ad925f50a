//! Transmit path.
//!
//! The ring is a plain producer queue. Software owns the descriptor at the
//! shadow tail once the device has set its DD bit; writing TDT hands it
//! back. Every descriptor starts out pre-marked done so the first pass
//! around the ring needs no special case.
//!
//! Nothing here blocks or registers waiters. `Full` goes back to the caller.

use log::debug;

use crate::error::{NetError, Result};
use crate::mmio::barrier::{lfence, sfence};
use crate::mmio::{InterruptCause, Register, RegisterFile};
use crate::ring::{RingStorage, TxCommand, TxDescriptor, TxStatus};

/// TX descriptor ring.
pub struct TxRing {
    /// Descriptors and buffers.
    storage: RingStorage<TxDescriptor>,
    /// Next descriptor to fill; mirrors TDT.
    tail: usize,
}

impl TxRing {
    /// Take over freshly allocated storage and pre-mark every slot done.
    pub fn new(mut storage: RingStorage<TxDescriptor>) -> Self {
        for i in 0..storage.len() {
            storage.update(i, |d| {
                d.cmd = TxCommand::RS.bits();
                d.status = TxStatus::DD.bits();
            });
        }
        Self { storage, tail: 0 }
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Shadow tail.
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Backing storage, for register programming.
    pub fn storage(&self) -> &RingStorage<TxDescriptor> {
        &self.storage
    }

    /// Whether `transmit` would find a free descriptor.
    #[inline]
    pub fn can_transmit(&self) -> bool {
        self.storage.descriptor(self.tail).is_done()
    }

    /// Queue one frame.
    ///
    /// # Returns
    /// - `Ok(())`: frame handed to the device
    /// - `Err(NetError::Full)`: descriptor at the tail still owned by the device
    /// - `Err(NetError::BadLength)`: empty frame or larger than a buffer
    pub fn transmit(&mut self, regs: &RegisterFile, frame: &[u8]) -> Result<()> {
        let max = self.storage.buffer_size();
        if frame.is_empty() || frame.len() > max {
            return Err(NetError::BadLength {
                len: frame.len(),
                max,
            });
        }

        let slot = self.tail;
        let desc = self.storage.descriptor(slot);
        if !desc.is_done() {
            debug!("e1000: tx ring full at slot {}", slot);
            return Err(NetError::Full);
        }
        lfence();

        // Drop any stale completion so it does not re-interrupt right away.
        regs.write(Register::Icr, InterruptCause::TXDW.bits());

        let previous = (desc.length as usize).min(max);
        let buffer = self.storage.buffer_mut(slot);
        buffer[..frame.len()].copy_from_slice(frame);
        if previous > frame.len() {
            buffer[frame.len()..previous].fill(0);
        }

        self.storage.update(slot, |d| {
            d.length = frame.len() as u16;
            d.cmd = (TxCommand::EOP | TxCommand::RS).bits();
            d.status = 0;
        });

        // Descriptor and payload must be visible before the device sees TDT.
        sfence();
        self.tail = (slot + 1) % self.storage.len();
        regs.write(Register::Tdt, self.tail as u32);

        debug!("e1000: tx slot {} len {}", slot, frame.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::NetError;
    use crate::mmio::Register;
    use crate::sim::SimNic;

    #[test]
    fn test_fill_ring_then_full_then_reuse() {
        let nic = SimNic::new();
        let dev = nic.attach_default();

        for len in 1..=16usize {
            let frame = alloc::vec![len as u8; len];
            dev.transmit(&frame).unwrap();
        }
        assert_eq!(dev.transmit(&[0xAA; 20]), Err(NetError::Full));
        assert!(!dev.can_transmit());
        assert_eq!(nic.reg(Register::Tdt), 0);

        nic.complete_tx(0);
        assert!(dev.can_transmit());
        dev.transmit(&[0x55; 20]).unwrap();

        let desc = nic.tx_descriptor(0);
        assert_eq!(desc.length, 20);
        assert_eq!(desc.status, 0);
        assert_eq!(&nic.tx_buffer(0)[..20], &[0x55; 20]);
        assert_eq!(nic.reg(Register::Tdt), 1);
    }

    #[test]
    fn test_descriptor_contents() {
        let nic = SimNic::new();
        let dev = nic.attach_default();

        dev.transmit(b"hello").unwrap();

        let desc = nic.tx_descriptor(0);
        assert_eq!(desc.length, 5);
        assert_eq!(desc.cmd, 0x09);
        assert_eq!(desc.status, 0);
        assert_eq!(&nic.tx_buffer(0)[..5], b"hello");
        assert_eq!(nic.reg(Register::Tdt), 1);
        assert_eq!(nic.tx_descriptor(1).status, 0x01);
    }

    #[test]
    fn test_no_stale_bytes_after_shorter_frame() {
        let nic = SimNic::new();
        let dev = nic.attach_default();

        dev.transmit(&[0xEE; 300]).unwrap();
        for _ in 1..16 {
            dev.transmit(&[0x11; 60]).unwrap();
        }
        nic.complete_tx(0);
        dev.transmit(&[0x22; 40]).unwrap();

        let buffer = nic.tx_buffer(0);
        assert_eq!(&buffer[..40], &[0x22; 40]);
        assert!(buffer[40..300].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rejects_bad_lengths() {
        let nic = SimNic::new();
        let dev = nic.attach_default();

        assert_eq!(
            dev.transmit(&[]),
            Err(NetError::BadLength { len: 0, max: 2048 })
        );
        assert_eq!(
            dev.transmit(&[0u8; 2049]),
            Err(NetError::BadLength {
                len: 2049,
                max: 2048
            })
        );
        assert!(dev.transmit(&[0u8; 2048]).is_ok());
        assert_eq!(nic.reg(Register::Tdt), 1);
    }

    #[test]
    fn test_transmit_writes_txdw_to_icr() {
        let nic = SimNic::new();
        let dev = nic.attach_default();

        nic.set_reg(Register::Icr, 0);
        dev.transmit(&[1, 2, 3]).unwrap();
        assert_eq!(nic.reg(Register::Icr), 0x1);
    }
}
