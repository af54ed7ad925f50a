//! Interrupt dispatch.
//!
//! One interrupt wakes at most one process. The dispatcher decides the
//! direction from the enabled cause bits, acknowledges exactly those bits,
//! and turns the waiter for that direction into a [`NetEvent`]. It never
//! touches the rings, so it can run while a ring lock is held elsewhere.
//!
//! ```text
//! ICR & IMS ──┬── TXDW only        ──> Transmit waiter
//!             ├── RXT0/SRPD only   ──> Receive waiter
//!             └── both / neither   ──> ProtocolViolation
//! ```

use log::{debug, error, warn};

use crate::error::{NetError, Result};
use crate::event::{EventSink, NetEvent};
use crate::mmio::{InterruptCause, Register, RegisterFile};
use crate::platform::ProcessRegistry;
use crate::types::Direction;
use crate::wait::WaiterSlots;

/// Service one device interrupt.
///
/// # Returns
/// - `Ok(Some(event))`: a waiter was woken and `event` posted to `sink`
/// - `Ok(None)`: the interrupt was acknowledged but nobody could be woken
/// - `Err(NetError::ProtocolViolation)`: both or neither direction pending
pub fn dispatch<R, S>(
    regs: &RegisterFile,
    waiters: &WaiterSlots,
    registry: &R,
    sink: &S,
) -> Result<Option<NetEvent>>
where
    R: ProcessRegistry + ?Sized,
    S: EventSink + ?Sized,
{
    // ICR is read-to-clear on hardware: read it once.
    let cause = regs.read(Register::Icr);
    let mask = regs.read(Register::Ims);
    let pending = InterruptCause::from_bits_retain(cause & mask);

    let transmit = pending & InterruptCause::TRANSMIT_DONE;
    let receive = pending & InterruptCause::RECEIVE_READY;

    let (direction, bits) = match (transmit.is_empty(), receive.is_empty()) {
        (false, true) => (Direction::Transmit, transmit),
        (true, false) => (Direction::Receive, receive),
        _ => {
            error!(
                "e1000: ambiguous interrupt, icr {:#010x} ims {:#010x}",
                cause, mask
            );
            return Err(NetError::ProtocolViolation { cause, mask });
        }
    };

    regs.write(Register::Icr, bits.bits());

    let Some(pid) = waiters.take(direction) else {
        warn!("e1000: {} interrupt with no waiter, dropped", direction);
        return Ok(None);
    };

    match registry.lookup(pid) {
        Some(handle) if handle.accepts_net_events => {}
        Some(_) => {
            warn!("e1000: {} not accepting network events, {} wakeup dropped", pid, direction);
            return Ok(None);
        }
        None => {
            warn!("e1000: {} gone, {} wakeup dropped", pid, direction);
            return Ok(None);
        }
    }

    let event = NetEvent { direction, pid };
    sink.post(event);
    debug!("e1000: {} wakeup for {}", direction, pid);
    Ok(Some(event))
}
