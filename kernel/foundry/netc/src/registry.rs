use crate::NetDriver;
use alloc::{boxed::Box, vec::Vec};
use netmux_core::net::IfType;

pub(crate) struct RegisteredDriver {
    pub driver: Box<dyn NetDriver>,
    pub if_type: IfType,
}

#[derive(Default)]
/// Drivers waiting to be attached.
///
/// Filled during the single-threaded boot phase, then handed over to
/// `Coordinator::init`, which consumes it.
pub struct Registry {
    drivers: Vec<RegisteredDriver>,
}

impl Registry {
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self {
            drivers: Vec::new(),
        }
    }

    pub fn register(&mut self, driver: Box<dyn NetDriver>, if_type: IfType) {
        log::debug!("netc: registered {} driver", driver.name());
        self.drivers.push(RegisteredDriver { driver, if_type });
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub(crate) fn into_drivers(self) -> impl Iterator<Item = RegisteredDriver> {
        self.drivers.into_iter()
    }
}
