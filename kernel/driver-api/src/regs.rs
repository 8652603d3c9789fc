//! Register access.

use netmux_core::VirtAddr;

/// 32-bit register window of a device.
///
/// Offsets are in bytes from the start of the window.
pub trait RegisterBus: Send + Sync {
    #[must_use]
    fn read32(&self, offset: usize) -> u32;

    fn write32(&self, offset: usize, value: u32);
}

#[derive(Debug, Clone, Copy)]
/// Memory-mapped register window.
pub struct MmioBus {
    base: VirtAddr,
    len: usize,
}

/// SAFETY: Memory-mapped I/O registers are safe to access from different threads
/// as long as accesses are properly synchronized, which is up to the driver.
unsafe impl Send for MmioBus {}
unsafe impl Sync for MmioBus {}

impl MmioBus {
    #[must_use]
    #[inline]
    /// # Safety
    ///
    /// `base..base + len` must be an uncached kernel mapping of device registers
    /// that stays valid for the lifetime of the bus.
    pub const unsafe fn new(base: VirtAddr, len: usize) -> Self {
        assert!(base.is_aligned(4));
        Self { base, len }
    }

    #[inline]
    fn register(&self, offset: usize) -> *mut u32 {
        assert!(offset % 4 == 0 && offset + 4 <= self.len);
        // Safety: in bounds, checked above.
        unsafe { self.base.as_mut_ptr::<u32>().byte_add(offset) }
    }
}

impl RegisterBus for MmioBus {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        // Safety: the mapping is valid per `MmioBus::new`.
        unsafe { self.register(offset).read_volatile() }
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        // Safety: the mapping is valid per `MmioBus::new`.
        unsafe { self.register(offset).write_volatile(value) };
    }
}
