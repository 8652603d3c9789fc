//! Legacy receive and transmit descriptors.

use netmux_core::{PhysAddr, static_assert};

/// Receive descriptor, written back by the hardware.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C, packed)]
pub struct RxDescriptor {
    buffer_addr: u64,
    length: u16,
    checksum: u16,
    status: u8,
    errors: u8,
    special: u16,
}

static_assert!(size_of::<RxDescriptor>() == 16);

impl RxDescriptor {
    /// Descriptor Done - Hardware has finished processing this descriptor
    const STATUS_DD: u8 = 1 << 0;
    /// End of Packet - This descriptor contains the end of a packet
    const STATUS_EOP: u8 = 1 << 1;

    #[must_use]
    #[inline]
    /// Descriptor handing an empty buffer to the hardware.
    pub const fn new(buffer_addr: PhysAddr) -> Self {
        Self {
            buffer_addr: buffer_addr.as_u64(),
            length: 0,
            checksum: 0,
            status: 0,
            errors: 0,
            special: 0,
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_done(&self) -> bool {
        self.status & Self::STATUS_DD != 0
    }

    #[must_use]
    #[inline]
    pub const fn is_end_of_packet(&self) -> bool {
        self.status & Self::STATUS_EOP != 0
    }

    #[must_use]
    #[inline]
    pub const fn packet_length(&self) -> u16 {
        self.length
    }

    #[must_use]
    #[inline]
    pub const fn has_errors(&self) -> bool {
        self.errors != 0
    }

    #[must_use]
    #[inline]
    /// Whether the descriptor holds a whole, valid frame.
    pub const fn is_complete_frame(&self) -> bool {
        self.is_done() && self.is_end_of_packet() && !self.has_errors() && self.length != 0
    }

    #[cfg(any(test, feature = "testing"))]
    pub(crate) const fn buffer_addr(&self) -> u64 {
        self.buffer_addr
    }

    #[cfg(any(test, feature = "testing"))]
    /// Write-back of a received frame.
    pub(crate) const fn complete(&mut self, length: u16) {
        self.length = length;
        self.status = Self::STATUS_DD | Self::STATUS_EOP;
        self.errors = 0;
    }
}

/// Transmit descriptor.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C, packed)]
pub struct TxDescriptor {
    buffer_addr: u64,
    length: u16,
    cso: u8,
    cmd: u8,
    status: u8,
    css: u8,
    special: u16,
}

static_assert!(size_of::<TxDescriptor>() == 16);

impl TxDescriptor {
    /// End of Packet - This is the last descriptor for a packet
    const CMD_EOP: u8 = 1 << 0;
    /// Insert FCS/CRC - Hardware should insert Ethernet CRC
    const CMD_IFCS: u8 = 1 << 1;
    /// Report Status - Hardware should update the status field
    const CMD_RS: u8 = 1 << 3;

    /// Descriptor Done - Hardware has finished transmitting
    const STATUS_DD: u8 = 1 << 0;

    #[must_use]
    #[inline]
    /// Single-descriptor frame of `length` bytes.
    pub const fn for_send(buffer_addr: PhysAddr, length: u16) -> Self {
        Self {
            buffer_addr: buffer_addr.as_u64(),
            length,
            cso: 0,
            cmd: Self::CMD_EOP | Self::CMD_IFCS | Self::CMD_RS,
            status: 0,
            css: 0,
            special: 0,
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_done(&self) -> bool {
        self.status & Self::STATUS_DD != 0
    }

    #[cfg(any(test, feature = "testing"))]
    pub(crate) const fn buffer_addr(&self) -> u64 {
        self.buffer_addr
    }

    #[cfg(any(test, feature = "testing"))]
    pub(crate) const fn length(&self) -> u16 {
        self.length
    }

    #[cfg(any(test, feature = "testing"))]
    pub(crate) const fn reports_status(&self) -> bool {
        self.cmd & Self::CMD_RS != 0
    }

    #[cfg(any(test, feature = "testing"))]
    pub(crate) const fn complete(&mut self) {
        self.status |= Self::STATUS_DD;
    }
}
