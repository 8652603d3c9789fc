//! Physical and kernel-virtual addresses.
//!
//! Buffers and descriptor rings are handed to the hardware by physical address
//! and touched by the CPU through the kernel mapping returned by the page allocator.

use core::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(u64);

impl VirtAddr {
    #[must_use]
    #[inline]
    pub const fn new(addr: u64) -> Self {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
        // Perform sign extension
        let virt_addr = ((addr << 16) as i64 >> 16) as u64;
        assert!(virt_addr == addr);
        Self(virt_addr)
    }

    #[must_use]
    #[inline]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self::new(ptr as u64)
    }

    #[must_use]
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    #[inline]
    pub const fn as_ptr<T>(self) -> *const T {
        self.0 as _
    }

    #[must_use]
    #[inline]
    pub const fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as _
    }

    #[must_use]
    #[inline]
    pub const fn is_aligned(self, align: u64) -> bool {
        assert!(align.is_power_of_two());
        self.0 & (align - 1) == 0
    }
}

impl PhysAddr {
    #[must_use]
    #[inline]
    pub const fn new(addr: u64) -> Self {
        let phys_addr = addr % (1 << 52);
        assert!(phys_addr == addr);
        Self(phys_addr)
    }

    #[must_use]
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    #[inline]
    /// Low half, as programmed into the `*BAL` registers.
    pub const fn low(self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let low = self.0 as u32;
        low
    }

    #[must_use]
    #[inline]
    /// High half, as programmed into the `*BAH` registers.
    pub const fn high(self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let high = (self.0 >> 32) as u32;
        high
    }

    #[must_use]
    #[inline]
    pub const fn is_aligned(self, align: u64) -> bool {
        assert!(align.is_power_of_two());
        self.0 & (align - 1) == 0
    }
}

impl Add<u64> for VirtAddr {
    type Output = Self;

    #[inline]
    fn add(self, rhs: u64) -> Self {
        Self::new(self.0 + rhs)
    }
}

impl Sub<Self> for VirtAddr {
    type Output = u64;

    #[inline]
    fn sub(self, rhs: Self) -> u64 {
        self.0 - rhs.0
    }
}

impl Add<u64> for PhysAddr {
    type Output = Self;

    #[inline]
    fn add(self, rhs: u64) -> Self {
        Self::new(self.0 + rhs)
    }
}

impl Sub<Self> for PhysAddr {
    type Output = u64;

    #[inline]
    fn sub(self, rhs: Self) -> u64 {
        self.0 - rhs.0
    }
}
