//! Device-file framework.

use crate::DriverResult;
use core::ops::BitOr;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceFlags(u32);

impl DeviceFlags {
    /// Network device.
    pub const NET: Self = Self(1 << 0);
    /// Protected: access is checked against the caller's capabilities.
    pub const PROT: Self = Self(1 << 1);

    #[must_use]
    #[inline]
    pub const fn bits(self) -> u32 {
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

impl BitOr for DeviceFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(u32);

impl DeviceHandle {
    #[must_use]
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

pub trait DeviceFramework: Send + Sync {
    fn create_device(&self, name: &str, flags: DeviceFlags) -> DriverResult<DeviceHandle>;

    fn destroy_device(&self, device: DeviceHandle);
}
