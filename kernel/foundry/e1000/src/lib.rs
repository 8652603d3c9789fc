//! Driver for the Intel 8254x (e1000) Ethernet controller family.
//!
//! Frames never get copied: receive descriptors point straight into buffers of
//! the interface's `BufferPool`, and so do transmit descriptors.
//!
//! NB: All registers use host-endianess (LE).
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc)]

extern crate alloc;

mod descriptors;
mod driver;
mod registers;
mod ring;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use driver::E1000;

use driver_api::irq::IrqPriority;

pub const E1000_NUM_RX_QUEUE: usize = 32;
pub const E1000_NUM_TX_QUEUE: usize = 32;

pub const INTEL_VENDOR_ID: u16 = 0x8086;
/// 82540EM, the adapter QEMU and VirtualBox emulate.
pub const E1000_82540EM: u16 = 0x100E;

#[must_use]
/// Whether `device_id` is an 8254x controller.
pub const fn is_supported(vendor_id: u16, device_id: u16) -> bool {
    vendor_id == INTEL_VENDOR_ID
        && matches!(
            device_id,
            0x1000
                | 0x1001
                | 0x1004
                | 0x1008..=0x1019
                | 0x101A
                | 0x101D
                | 0x101E
                | 0x1026..=0x1028
                | 0x1075..=0x107C
                | 0x108A
                | 0x1099
                | 0x10B5
        )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct E1000Config {
    /// Receive buffers posted to the hardware at once.
    pub rx_ring: usize,
    /// Transmit buffers owned by the hardware at once.
    pub tx_ring: usize,
    pub irq_priority: IrqPriority,
    pub reset_timeout_us: u32,
}

impl Default for E1000Config {
    fn default() -> Self {
        Self {
            rx_ring: E1000_NUM_RX_QUEUE,
            tx_ring: E1000_NUM_TX_QUEUE,
            irq_priority: IrqPriority::Net,
            reset_timeout_us: 10_000,
        }
    }
}
