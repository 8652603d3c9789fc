//! Types crossing the network control surface.
//!
//! Everything in here is shared between the buffer pool, the coordinator and the
//! drivers: interface metadata, the opaque buffer token handed to clients,
//! the control command codes and the error taxonomy they map to.

use crate::drivers::DriverError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// Magic stamped into every datagram buffer header.
pub const DATAGRAM_HDR_MAGIC: u16 = 0x9a0a;

/// Default Ethernet payload size.
pub const ETH_MTU: u16 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum IfType {
    Ethernet = 1,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    #[must_use]
    #[inline]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    #[must_use]
    #[inline]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl core::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
/// Opaque handle to a datagram buffer.
///
/// The upper half carries the buffer magic and the lower half its index in the
/// owning pool. Physical and virtual addresses never leave the kernel.
pub struct DbufToken(u32);

impl DbufToken {
    #[must_use]
    #[inline]
    pub const fn new(magic: u16, index: u16) -> Self {
        Self(((magic as u32) << 16) | index as u32)
    }

    #[must_use]
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    #[inline]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    #[must_use]
    #[inline]
    pub const fn magic(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let magic = (self.0 >> 16) as u16;
        magic
    }

    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let index = self.0 as u16;
        index
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
/// User-visible header of a datagram buffer.
pub struct DbufInfo {
    pub magic: u16,
    pub index: u16,
    /// Offset of the payload from the start of the buffer.
    pub data_offset: u32,
    pub data_length: u32,
    /// Payload bytes available after `data_offset`.
    pub capacity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfCaps {
    pub if_type: IfType,
    pub mtu: u16,
    pub mac: MacAddress,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Link and ring state as reported by a driver.
pub struct LinkStatus {
    pub link_up: bool,
    pub started: bool,
    /// Transmit buffers currently owned by the hardware.
    pub tx_in_flight: usize,
    /// Receive buffers currently posted to the hardware.
    pub rx_posted: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IfStatus {
    pub link: LinkStatus,
    /// Received frames waiting for `RX_DQBUF`.
    pub rx_pending: usize,
    /// Buffers staged for transmission while the interface was stopped.
    pub tx_staged: usize,
    pub free: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum NetCommand {
    QueryNrIf = 0x01,
    GetIfCaps = 0x02,
    GetStatus = 0x03,
    Start = 0x04,
    Stop = 0x05,
    TxQbuf = 0x10,
    RxQbuf = 0x11,
    TxDqbuf = 0x12,
    RxDqbuf = 0x13,
    BufInfo = 0x14,
}

impl NetCommand {
    #[must_use]
    #[inline]
    /// Whether the command targets a single interface rather than the coordinator.
    pub const fn is_per_interface(self) -> bool {
        !matches!(self, Self::QueryNrIf)
    }
}

pub mod errno {
    pub const EPERM: i32 = 1;
    pub const EIO: i32 = 5;
    pub const EBADF: i32 = 9;
    pub const EAGAIN: i32 = 11;
    pub const ENOMEM: i32 = 12;
    pub const EFAULT: i32 = 14;
    pub const EBUSY: i32 = 16;
    pub const ENODEV: i32 = 19;
    pub const EINVAL: i32 = 22;
    pub const ENOSPC: i32 = 28;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("Missing network capability")]
    PermissionDenied,
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Device already open")]
    Busy,
    #[error("Device not open")]
    NotOpen,
    #[error("No such device")]
    NoDevice,
    #[error("No buffer available")]
    NoBuffer,
    #[error("Transmit ring full")]
    OutOfResources,
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Invalid buffer handle")]
    InvalidHandle,
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

impl NetError {
    #[must_use]
    #[inline]
    /// Flow-control conditions the caller is expected to retry.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::NoBuffer | Self::OutOfResources)
    }

    #[must_use]
    /// Positive error number reported through the device file.
    pub const fn errno(self) -> i32 {
        match self {
            Self::PermissionDenied => errno::EPERM,
            Self::InvalidArgument => errno::EINVAL,
            Self::Busy => errno::EBUSY,
            Self::NotOpen => errno::EBADF,
            Self::NoDevice | Self::Driver(DriverError::Absent) => errno::ENODEV,
            Self::NoBuffer => errno::EAGAIN,
            Self::OutOfResources => errno::ENOSPC,
            Self::OutOfMemory | Self::Driver(DriverError::OutOfMemory) => errno::ENOMEM,
            Self::InvalidHandle => errno::EFAULT,
            Self::Driver(_) => errno::EIO,
        }
    }
}

pub type NetResult<T> = Result<T, NetError>;
