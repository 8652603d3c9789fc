//! 8254x register offsets and bit flags.
//!
//! Offsets are in bytes from the start of BAR0. See the PCI/PCI-X Family of
//! Gigabit Ethernet Controllers Software Developer's Manual, section 13.

pub struct Registers;

#[allow(dead_code)]
impl Registers {
    // General
    pub const CTRL: usize = 0x00000;
    pub const STATUS: usize = 0x00008;
    pub const EECD: usize = 0x00010; // EEPROM/Flash Control

    // Interrupts
    pub const ICR: usize = 0x000C0; // Interrupt Cause Read, read-to-clear
    pub const ICS: usize = 0x000C8; // Interrupt Cause Set
    pub const IMS: usize = 0x000D0; // Interrupt Mask Set
    pub const IMC: usize = 0x000D8; // Interrupt Mask Clear

    // Receive
    pub const RCTL: usize = 0x00100;
    pub const RDBAL: usize = 0x02800;
    pub const RDBAH: usize = 0x02804;
    pub const RDLEN: usize = 0x02808;
    pub const RDH: usize = 0x02810;
    pub const RDT: usize = 0x02818;

    // Transmit
    pub const TCTL: usize = 0x00400;
    pub const TIPG: usize = 0x00410; // Transmit Inter-Packet Gap
    pub const TDBAL: usize = 0x03800;
    pub const TDBAH: usize = 0x03804;
    pub const TDLEN: usize = 0x03808;
    pub const TDH: usize = 0x03810;
    pub const TDT: usize = 0x03818;

    // First receive address, loaded from the EEPROM on reset
    pub const RAL0: usize = 0x05400;
    pub const RAH0: usize = 0x05404;
}

pub struct CtrlFlags;

impl CtrlFlags {
    /// Set Link Up
    pub const SLU: u32 = 1 << 6;
    /// Device Reset, self-clearing
    pub const RST: u32 = 1 << 26;
    /// PHY Reset
    pub const PHY_RST: u32 = 1 << 31;
}

pub struct StatusFlags;

impl StatusFlags {
    /// Link Up
    pub const LU: u32 = 1 << 1;
}

pub struct EecdFlags;

impl EecdFlags {
    /// EEPROM auto-read done
    pub const AUTO_RD: u32 = 1 << 9;
}

pub struct RahFlags;

impl RahFlags {
    /// Address Valid
    pub const AV: u32 = 1 << 31;
}

/// RCTL (Receive Control) register flags
pub struct RctlFlags;

#[allow(dead_code)]
impl RctlFlags {
    /// Receiver Enable
    pub const EN: u32 = 1 << 1;
    /// Unicast Promiscuous Mode
    pub const UPE: u32 = 1 << 3;
    /// Multicast Promiscuous Mode
    pub const MPE: u32 = 1 << 4;
    /// Broadcast Accept Mode
    pub const BAM: u32 = 1 << 15;

    // Buffer sizes, BSEX (bit 25) scales by 16
    pub const BSIZE_256: u32 = 0b11 << 16;
    pub const BSIZE_512: u32 = 0b10 << 16;
    pub const BSIZE_1024: u32 = 0b01 << 16;
    pub const BSIZE_2048: u32 = 0b00 << 16;
    pub const BSIZE_4096: u32 = (0b11 << 16) | (0b1 << 25);
    pub const BSIZE_8192: u32 = (0b10 << 16) | (0b1 << 25);
    pub const BSIZE_16384: u32 = (0b01 << 16) | (0b1 << 25);

    /// Strip Ethernet CRC
    pub const SECRC: u32 = 1 << 26;

    #[must_use]
    /// Largest hardware buffer size that fits in `capacity` bytes.
    pub const fn bsize_for(capacity: usize) -> Option<u32> {
        Some(match capacity {
            16384.. => Self::BSIZE_16384,
            8192.. => Self::BSIZE_8192,
            4096.. => Self::BSIZE_4096,
            2048.. => Self::BSIZE_2048,
            1024.. => Self::BSIZE_1024,
            512.. => Self::BSIZE_512,
            256.. => Self::BSIZE_256,
            _ => return None,
        })
    }
}

/// TCTL (Transmit Control) register flags
pub struct TctlFlags;

impl TctlFlags {
    /// Transmit Enable
    pub const EN: u32 = 1 << 1;
    /// Pad Short Packets
    pub const PSP: u32 = 1 << 3;
    /// Collision Threshold shift
    pub const CT_SHIFT: u32 = 4;
    /// Collision Distance shift
    pub const COLD_SHIFT: u32 = 12;
    /// Re-transmit on late collision (no threshold)
    pub const RR_NOTHRESH: u32 = 0b11 << 29;

    /// Enabled, full duplex.
    pub const RUNNING: u32 = Self::EN
        | Self::PSP
        | (15 << Self::CT_SHIFT)
        | (63 << Self::COLD_SHIFT)
        | Self::RR_NOTHRESH;
}

/// Interrupt Cause flags
pub struct IntFlags;

#[allow(dead_code)]
impl IntFlags {
    /// Transmit Descriptor Written Back
    pub const TXDW: u32 = 1 << 0;
    /// Transmit Queue Empty
    pub const TXQE: u32 = 1 << 1;
    /// Link Status Change
    pub const LSC: u32 = 1 << 2;
    /// Receive Sequence Error
    pub const RXSEQ: u32 = 1 << 3;
    /// Receive Descriptor Minimum Threshold Reached
    pub const RXDMT0: u32 = 1 << 4;
    /// Receiver Overrun
    pub const RXO: u32 = 1 << 6;
    /// Receive Timer Interrupt
    pub const RXT0: u32 = 1 << 7;

    pub const ALL: u32 = u32::MAX;

    pub const TX: u32 = Self::TXDW | Self::TXQE;
    pub const RX: u32 = Self::RXT0 | Self::RXDMT0 | Self::RXO;
    /// Causes unmasked while the interface runs.
    pub const ENABLED: u32 = Self::TX | Self::RX | Self::LSC;
}

/// Inter-packet gap for IEEE 802.3 copper, see section 13.4.34.
pub const TIPG_COPPER: u32 = 0x0060_200A;
