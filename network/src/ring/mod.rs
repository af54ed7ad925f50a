//! Descriptor rings shared with the device.

pub mod descriptor;
pub mod storage;

pub use descriptor::{
    Descriptor, RxDescriptor, RxErrors, RxStatus, TxCommand, TxDescriptor, TxStatus, DESC_SIZE,
};
pub use storage::{check_ring_size, RingLayout, RingStorage};
