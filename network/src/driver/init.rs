//! e1000 attach sequence.
//!
//! # Initialization Sequence
//! 1. Validate configuration
//! 2. Enable the PCI function, map BAR0
//! 3. Check STATUS for a supported, linked-up device
//! 4. Allocate, map and zero both rings
//! 5. Program the TX ring, TCTL and TIPG
//! 6. Program the station address, the RX ring, RCTL, RSRPD and RXDCTL
//! 7. Enable interrupt sources and unmask the IRQ line
//!
//! There is no reset and no retry: any failure aborts attach and the caller
//! decides whether that is fatal.
//!
//! # Reference
//! Intel 8254x SDM, §14 (General Initialization and Reset Operation)

use log::{debug, error, info};

use crate::config::E1000Config;
use crate::error::AttachError;
use crate::mmio::regs::{RAH_AV, RXDCTL_WTHRESH_1, TIPG_DEFAULT};
use crate::mmio::{Rctl, Register, RegisterFile, Tctl};
use crate::platform::{AddressSpace, BusDevice, FrameAllocator};
use crate::ring::{RingLayout, RingStorage};
use crate::types::MacAddress;

use super::e1000::E1000;
use super::rx::RxRing;
use super::tx::TxRing;

/// Bring up an e1000 and return the driver instance.
///
/// # Arguments
/// - `bus`: the PCI function to enable
/// - `frames`: source of descriptor and buffer pages
/// - `space`: kernel address space for the register window and rings
/// - `config`: ring sizes, station address, interrupt sources
pub fn attach<B, F, S>(
    bus: &mut B,
    frames: &mut F,
    space: &mut S,
    config: E1000Config,
) -> Result<E1000, AttachError>
where
    B: BusDevice + ?Sized,
    F: FrameAllocator + ?Sized,
    S: AddressSpace + ?Sized,
{
    config.validate()?;

    let resources = bus.enable();
    info!(
        "e1000: bar0 {:#x} size {:#x} irq {}",
        resources.mmio_base, resources.mmio_size, resources.irq_line
    );
    let window = space.map_mmio(resources.mmio_base, resources.mmio_size)?;
    // SAFETY: the mapper just mapped `mmio_size` bytes of BAR0 at `window`,
    // and the mapping lives as long as the kernel.
    let regs = unsafe { RegisterFile::new(window, resources.mmio_size)? };

    let status = regs.read(Register::Status);
    if status != config.expected_status {
        error!("e1000: unexpected STATUS {:#010x}", status);
        return Err(AttachError::BadStatus {
            expected: config.expected_status,
            found: status,
        });
    }

    let layout = RingLayout::above(config.ring_window, config.tx_ring_size);
    let tx_storage = RingStorage::allocate(
        frames,
        space,
        config.tx_ring_size,
        config.buffer_size,
        layout.tx_descs,
    )?;
    let rx_storage = RingStorage::allocate(
        frames,
        space,
        config.rx_ring_size,
        config.buffer_size,
        layout.rx_descs,
    )?;
    debug!(
        "e1000: rings at tx {:#x} rx {:#x}",
        tx_storage.phys_addr(),
        rx_storage.phys_addr()
    );

    let tx = TxRing::new(tx_storage);
    init_tx(&regs, &tx);

    let rx = RxRing::new(rx_storage);
    init_rx(&regs, &rx, &config);

    regs.write(Register::Ims, config.interrupts.bits());
    bus.unmask_irq(resources.irq_line);

    info!(
        "e1000: up, mac {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}, tx {} rx {}",
        config.mac[0],
        config.mac[1],
        config.mac[2],
        config.mac[3],
        config.mac[4],
        config.mac[5],
        config.tx_ring_size,
        config.rx_ring_size
    );

    Ok(E1000::from_parts(regs, tx, rx, config.mac, resources.irq_line))
}

fn init_tx(regs: &RegisterFile, tx: &TxRing) {
    let ring = tx.storage();
    regs.write(Register::Tdbal, ring.phys_addr().low());
    regs.write(Register::Tdbah, ring.phys_addr().high());
    regs.write(Register::Tdlen, ring.byte_len());
    regs.write(Register::Tdh, 0);
    regs.write(Register::Tdt, 0);

    let tctl = Tctl::EN | Tctl::PSP | Tctl::CT_DEFAULT | Tctl::COLD_DEFAULT;
    regs.write(Register::Tctl, tctl.bits());
    regs.write(Register::Tipg, TIPG_DEFAULT);
}

fn init_rx(regs: &RegisterFile, rx: &RxRing, config: &E1000Config) {
    let (ral, rah) = receive_address(config.mac);
    regs.write(Register::Ral0, ral);
    regs.write(Register::Rah0, rah | RAH_AV);

    let ring = rx.storage();
    regs.write(Register::Rdbal, ring.phys_addr().low());
    regs.write(Register::Rdbah, ring.phys_addr().high());
    regs.write(Register::Rdlen, ring.byte_len());
    regs.write(Register::Rdh, 0);
    regs.write(Register::Rdt, rx.tail() as u32);

    // BSIZE 00 = 2048 bytes.
    let rctl = Rctl::EN | Rctl::SECRC;
    regs.write(Register::Rctl, rctl.bits());
    regs.write(Register::Rsrpd, config.small_packet_threshold);
    regs.write(Register::Rxdctl, RXDCTL_WTHRESH_1);
}

/// Split a MAC into RAL/RAH values, low byte first.
fn receive_address(mac: MacAddress) -> (u32, u32) {
    let ral = u32::from_le_bytes([mac[0], mac[1], mac[2], mac[3]]);
    let rah = u16::from_le_bytes([mac[4], mac[5]]) as u32;
    (ral, rah)
}
