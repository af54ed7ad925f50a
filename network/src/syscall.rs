//! Kernel entry points.
//!
//! Thin glue between the kernel's syscall dispatcher / IRQ vector and an
//! [`E1000`]. The syscall layer converts results with [`to_syscall_return`].

use log::{debug, error};

use crate::driver::E1000;
use crate::error::{NetError, Result};
use crate::event::{EventSink, NetEvent};
use crate::platform::ProcessRegistry;
use crate::types::{Direction, ProcessId};

/// Send one frame on behalf of `caller`.
///
/// On `Full` the caller becomes the transmit waiter before the error is
/// returned, so it can park and retry once a transmit interrupt arrives.
pub fn sys_send_packet(dev: &E1000, caller: ProcessId, frame: &[u8]) -> Result<()> {
    match dev.transmit(frame) {
        Err(NetError::Full) => {
            dev.register_waiter(Direction::Transmit, caller);
            debug!("e1000: {} parked on full tx ring", caller);
            Err(NetError::Full)
        }
        other => other,
    }
}

/// Receive one frame into `buf` on behalf of `caller`.
///
/// With `wait`, an empty ring registers `caller` as the receive waiter.
///
/// # Panics
/// On a descriptor the ring cannot consume. The slot is never recycled, so
/// no later frame could be delivered either.
pub fn sys_recv_packet(
    dev: &E1000,
    caller: ProcessId,
    buf: &mut [u8],
    wait: bool,
) -> Result<usize> {
    match dev.receive_into(caller, wait, buf) {
        Err(err) if err.is_fatal() => fatal(err),
        other => other,
    }
}

/// IRQ vector body for the device's line.
///
/// # Panics
/// On an interrupt the driver cannot attribute to exactly one direction.
pub fn handle_irq<R, S>(dev: &E1000, registry: &R, sink: &S) -> Option<NetEvent>
where
    R: ProcessRegistry + ?Sized,
    S: EventSink + ?Sized,
{
    match dev.on_interrupt(registry, sink) {
        Ok(event) => event,
        Err(err) => fatal(err),
    }
}

/// Stop the kernel on an error that leaves the device unusable.
pub(crate) fn fatal(err: NetError) -> ! {
    error!("e1000: fatal: {}", err);
    panic!("e1000: {}", err);
}

/// Encode a result for the syscall return register.
///
/// Non-negative values are byte counts; negative values are
/// [`NetError::errno`] codes.
pub fn to_syscall_return(result: Result<usize>) -> isize {
    match result {
        Ok(len) => len as isize,
        Err(err) => err.errno() as isize,
    }
}
