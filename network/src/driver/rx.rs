//! Receive path.
//!
//! RDT names the last descriptor software has handed back; the device fills
//! from RDH up to, but not including, RDT. The next frame to consume is
//! therefore always at `tail + 1`. After a frame is copied out its
//! descriptor is cleared and becomes the new tail.

use alloc::vec::Vec;

use log::{debug, error, warn};

use crate::error::{NetError, Result};
use crate::mmio::barrier::{lfence, sfence};
use crate::mmio::{Register, RegisterFile};
use crate::ring::{RingStorage, RxDescriptor, RxStatus};

/// RX descriptor ring.
pub struct RxRing {
    /// Descriptors and buffers.
    storage: RingStorage<RxDescriptor>,
    /// Last descriptor handed to the device; mirrors RDT.
    tail: usize,
}

impl RxRing {
    /// Take over freshly allocated storage. Every descriptor but the tail
    /// belongs to the device once RDT is published.
    pub fn new(storage: RingStorage<RxDescriptor>) -> Self {
        let tail = storage.len() - 1;
        Self { storage, tail }
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
    pub fn storage(&self) -> &RingStorage<RxDescriptor> {
        &self.storage
    }

    /// Whether a completed frame is waiting.
    #[inline]
    pub fn can_receive(&self) -> bool {
        self.storage
            .descriptor(self.next())
            .status()
            .contains(RxStatus::DD)
    }

    /// Copy the next frame into `buf`.
    ///
    /// On `BufferTooSmall` the frame stays in the ring.
    pub fn receive_into(&mut self, regs: &RegisterFile, buf: &mut [u8]) -> Result<usize> {
        self.consume(regs, |frame| {
            if buf.len() < frame.len() {
                return Err(NetError::BufferTooSmall {
                    needed: frame.len(),
                    provided: buf.len(),
                });
            }
            buf[..frame.len()].copy_from_slice(frame);
            Ok(frame.len())
        })
    }

    /// Copy the next frame into a new vector.
    pub fn receive(&mut self, regs: &RegisterFile) -> Result<Vec<u8>> {
        self.consume(regs, |frame| Ok(frame.to_vec()))
    }

    /// Hand the next completed frame to `f`, then recycle its descriptor.
    ///
    /// The descriptor is recycled only if `f` succeeds.
    fn consume<R>(
        &mut self,
        regs: &RegisterFile,
        f: impl FnOnce(&[u8]) -> Result<R>,
    ) -> Result<R> {
        let next = self.next();
        let desc = self.storage.descriptor(next);
        let status = desc.status();

        if !status.contains(RxStatus::DD) {
            return Err(NetError::Empty);
        }
        if !status.contains(RxStatus::EOP) {
            error!(
                "e1000: rx slot {} done without EOP, multi-descriptor frames unsupported",
                next
            );
            return Err(NetError::UnsupportedPacket {
                index: next,
                status: desc.status,
            });
        }
        // Payload writes happen before the device sets DD.
        lfence();

        if !desc.errors().is_empty() {
            warn!("e1000: rx slot {} errors {:?}", next, desc.errors());
        }

        let len = (desc.length as usize).min(self.storage.buffer_size());
        let out = f(&self.storage.buffer(next)[..len])?;

        self.storage.update(next, |d| {
            d.status = 0;
            d.errors = 0;
        });
        sfence();
        self.tail = next;
        regs.write(Register::Rdt, next as u32);

        debug!("e1000: rx slot {} len {}", next, len);
        Ok(out)
    }

    #[inline]
    fn next(&self) -> usize {
        (self.tail + 1) % self.storage.len()
    }
}
