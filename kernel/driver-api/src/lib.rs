//! Interfaces drivers consume from the rest of the kernel.
//!
//! Nothing in here is implemented by the network subsystem itself: the physical
//! allocator, PCI enumeration, interrupt plumbing and the device-file layer are
//! provided by the platform and handed over as a `Platform` bundle.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc)]

extern crate alloc;

pub mod device;
pub mod irq;
pub mod mem;
pub mod pci;
pub mod principal;
pub mod regs;
#[cfg(feature = "testing")]
pub mod testing;

pub use netmux_core::drivers::{DriverError, DriverResult};

use alloc::sync::Arc;

/// Waits without touching shared state.
pub trait Delay: Send + Sync {
    fn delay_us(&self, micros: u32);
}

#[derive(Clone)]
/// Everything a driver or the coordinator may call into.
pub struct Platform {
    pub pages: Arc<dyn mem::PageAllocator>,
    pub pci: Arc<dyn pci::PciBus>,
    pub irq: Arc<dyn irq::InterruptController>,
    pub devices: Arc<dyn device::DeviceFramework>,
    pub delay: Arc<dyn Delay>,
}
