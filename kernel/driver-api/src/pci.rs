//! PCI bus, as seen by a driver.

use crate::{DriverResult, regs::RegisterBus};
use alloc::{sync::Arc, vec::Vec};
use core::ops::BitOr;
use netmux_core::PhysAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// A PCI function found during enumeration.
pub struct PciFunction {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
    pub vendor_id: u16,
    pub device_id: u16,
}

impl PciFunction {
    #[must_use]
    #[inline]
    pub const fn new(bus: u8, device: u8, function: u8, vendor_id: u16, device_id: u16) -> Self {
        Self {
            bus,
            device,
            function,
            vendor_id,
            device_id,
        }
    }
}

impl core::fmt::Display for PciFunction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}.{} [{:04x}:{:04x}]",
            self.bus, self.device, self.function, self.vendor_id, self.device_id
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A memory BAR.
pub struct Bar {
    pub base: PhysAddr,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciResources {
    pub bars: [Option<Bar>; 6],
    pub irq_line: u8,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
/// Bits of the PCI command register.
pub struct PciEnable(u16);

impl PciEnable {
    pub const IO: Self = Self(1 << 0);
    pub const MEMORY: Self = Self(1 << 1);
    pub const BUS_MASTER: Self = Self(1 << 2);

    #[must_use]
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for PciEnable {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

pub trait PciBus: Send + Sync {
    #[must_use]
    /// Returns every function accepted by `filter`.
    fn enumerate(&self, filter: &dyn Fn(&PciFunction) -> bool) -> Vec<PciFunction>;

    /// Reads BARs and the interrupt line of a function.
    fn configure(&self, function: &PciFunction) -> DriverResult<PciResources>;

    /// Sets bits in the command register.
    fn enable(&self, function: &PciFunction, flags: PciEnable) -> DriverResult<()>;

    /// Maps a memory BAR into the kernel.
    fn map_bar(&self, function: &PciFunction, bar: &Bar) -> DriverResult<Arc<dyn RegisterBus>>;
}
