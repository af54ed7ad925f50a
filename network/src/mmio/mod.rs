//! Device register access.

pub mod barrier;
pub mod register_file;
pub mod regs;

pub use register_file::RegisterFile;
pub use regs::{InterruptCause, Register, Rctl, Tctl};
