//! Network coordinator.
//!
//! Drivers are registered during boot into a `Registry`, which `Coordinator::init`
//! consumes: every driver that initializes gets a numbered interface slot with
//! its own buffer pool, and the coordinator exposes one control surface over
//! all of them.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc)]

extern crate alloc;

mod control;
mod coordinator;
mod driver;
mod registry;

pub use control::{IoctlArgs, IoctlOut, Reply, Request};
pub use coordinator::{Coordinator, Target};
pub use driver::{AttachContext, NetDriver};
pub use registry::Registry;

/// Interface slots the coordinator manages.
pub const MAX_NET_DEVS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub max_interfaces: usize,
    /// Fail initialization when no interface attaches.
    pub require_interface: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_interfaces: MAX_NET_DEVS,
            require_interface: false,
        }
    }
}
