//! Network-device subsystem.
//!
//! Boot wiring: every supported adapter found on the PCI bus is registered,
//! then the coordinator attaches them and exposes `netc` and `net0..netN`.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc)]

extern crate alloc;

pub mod logging;

pub use dbuf::{BufferPool, DbufState, PoolConfig, PoolError};
pub use driver_api::Platform;
pub use e1000::{E1000, E1000Config};
pub use netc::{Coordinator, CoordinatorConfig, IoctlArgs, IoctlOut, NetDriver, Registry, Reply, Request, Target};
pub use netmux_core::net::{DbufInfo, DbufToken, IfType, NetCommand, NetError, NetResult};

use alloc::boxed::Box;
use driver_api::{device::DeviceHandle, principal::Principal};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NetConfig {
    pub coordinator: CoordinatorConfig,
    pub e1000: E1000Config,
}

/// Probes the adapters and brings the coordinator up.
pub fn init(platform: &Platform) -> NetResult<Coordinator> {
    init_with(platform, NetConfig::default())
}

pub fn init_with(platform: &Platform, config: NetConfig) -> NetResult<Coordinator> {
    let mut registry = Registry::new();
    for driver in E1000::probe_with(platform, config.e1000) {
        registry.register(Box::new(driver), IfType::Ethernet);
    }
    if registry.is_empty() {
        log::warn!("netmux: no network controller found");
    }

    Coordinator::init(registry, platform, config.coordinator)
}

/// Control request on a device file, as the device framework forwards it.
///
/// Returns the reply's raw value, or a negated errno. Caps, status and buffer
/// info are copied into `out`.
pub fn ioctl(
    netc: &Coordinator,
    principal: &dyn Principal,
    device: DeviceHandle,
    cmd: u32,
    args: IoctlArgs,
    out: &mut IoctlOut,
) -> i64 {
    let reply = netc
        .target_of(device)
        .ok_or(NetError::NoDevice)
        .and_then(|target| netc.ioctl(principal, target, cmd, args));

    match reply {
        // Tokens and counts are far below `i64::MAX`.
        #[allow(clippy::cast_possible_wrap)]
        Ok(reply) => {
            reply.fill(out);
            reply.as_raw() as i64
        }
        Err(err) => -i64::from(err.errno()),
    }
}
