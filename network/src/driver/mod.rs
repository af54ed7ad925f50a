//! Intel 8254x (e1000) driver.
//!
//! # Reference
//! Intel PCI/PCI-X Family of Gigabit Ethernet Controllers SDM

pub mod e1000;
pub mod init;
pub mod irq;
pub mod rx;
pub mod traits;
pub mod tx;

// Re-exports
pub use e1000::E1000;
pub use init::attach;
pub use traits::NetworkDriver;
