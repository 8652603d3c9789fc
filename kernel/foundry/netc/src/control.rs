//! Control requests, typed and raw.

use netmux_core::net::{DbufInfo, DbufToken, IfCaps, IfStatus, NetCommand, NetError, NetResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    QueryNrIf,
    GetIfCaps,
    GetStatus,
    Start,
    Stop,
    /// Sends the first `length` bytes of a held buffer.
    TxQbuf { token: DbufToken, length: usize },
    /// Gives a held buffer back to the free queue.
    RxQbuf { token: DbufToken },
    /// Gets an empty buffer to fill.
    TxDqbuf,
    /// Gets the oldest received frame.
    RxDqbuf,
    BufInfo { token: DbufToken },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
/// Argument block of a raw control request.
pub struct IoctlArgs {
    pub token: u32,
    pub length: u32,
}

impl Request {
    #[must_use]
    pub const fn command(&self) -> NetCommand {
        match self {
            Self::QueryNrIf => NetCommand::QueryNrIf,
            Self::GetIfCaps => NetCommand::GetIfCaps,
            Self::GetStatus => NetCommand::GetStatus,
            Self::Start => NetCommand::Start,
            Self::Stop => NetCommand::Stop,
            Self::TxQbuf { .. } => NetCommand::TxQbuf,
            Self::RxQbuf { .. } => NetCommand::RxQbuf,
            Self::TxDqbuf => NetCommand::TxDqbuf,
            Self::RxDqbuf => NetCommand::RxDqbuf,
            Self::BufInfo { .. } => NetCommand::BufInfo,
        }
    }

    /// Decodes a raw command code and its arguments.
    pub fn decode(cmd: u32, args: IoctlArgs) -> NetResult<Self> {
        let command = NetCommand::try_from(cmd).map_err(|_| NetError::InvalidArgument)?;
        let token = DbufToken::from_raw(args.token);

        Ok(match command {
            NetCommand::QueryNrIf => Self::QueryNrIf,
            NetCommand::GetIfCaps => Self::GetIfCaps,
            NetCommand::GetStatus => Self::GetStatus,
            NetCommand::Start => Self::Start,
            NetCommand::Stop => Self::Stop,
            NetCommand::TxQbuf => Self::TxQbuf {
                token,
                length: usize::try_from(args.length).map_err(|_| NetError::InvalidArgument)?,
            },
            NetCommand::RxQbuf => Self::RxQbuf { token },
            NetCommand::TxDqbuf => Self::TxDqbuf,
            NetCommand::RxDqbuf => Self::RxDqbuf,
            NetCommand::BufInfo => Self::BufInfo { token },
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
/// Out-argument block of a raw control request, for replies that do not fit
/// in the return value.
pub struct IoctlOut {
    pub if_type: u32,
    pub mtu: u32,
    pub mac: [u8; 6],
    pub link_up: u8,
    pub started: u8,
    pub tx_in_flight: u32,
    pub rx_posted: u32,
    pub rx_pending: u32,
    pub tx_staged: u32,
    pub free: u32,
    pub info: DbufInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Count(usize),
    Caps(IfCaps),
    Status(IfStatus),
    Done,
    Buffer(DbufToken),
    Info(DbufInfo),
}

impl Reply {
    #[must_use]
    /// Value returned through the device file on success.
    pub const fn as_raw(&self) -> u64 {
        match self {
            Self::Count(count) => *count as u64,
            Self::Buffer(token) => token.as_raw() as u64,
            Self::Caps(_) | Self::Status(_) | Self::Done | Self::Info(_) => 0,
        }
    }

    /// Copies the payload of caps, status and buffer-info replies into `out`.
    ///
    /// Fields a reply does not carry are left untouched.
    #[allow(clippy::cast_possible_truncation)]
    pub fn fill(&self, out: &mut IoctlOut) {
        match self {
            Self::Caps(caps) => {
                out.if_type = caps.if_type.into();
                out.mtu = u32::from(caps.mtu);
                out.mac = caps.mac.octets();
            }
            Self::Status(status) => {
                out.link_up = status.link.link_up.into();
                out.started = status.link.started.into();
                out.tx_in_flight = status.link.tx_in_flight as u32;
                out.rx_posted = status.link.rx_posted as u32;
                out.rx_pending = status.rx_pending as u32;
                out.tx_staged = status.tx_staged as u32;
                out.free = status.free as u32;
            }
            Self::Info(info) => out.info = *info,
            Self::Count(_) | Self::Done | Self::Buffer(_) => {}
        }
    }
}
