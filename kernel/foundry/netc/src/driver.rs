use alloc::sync::Arc;
use dbuf::{BufferPool, PoolConfig};
use driver_api::{DriverResult, Platform};
use netmux_core::net::{DbufToken, ETH_MTU, LinkStatus, MacAddress, NetResult};

/// What a driver gets when it is attached to a slot.
pub struct AttachContext<'a> {
    pub id: usize,
    /// Buffers of the slot, shared with the coordinator.
    pub pool: Arc<BufferPool>,
    pub platform: &'a Platform,
}

/// Operations a network driver offers to the coordinator.
///
/// `init` runs once, during boot. The other operations can run concurrently
/// with each other and with the driver's interrupt handler.
pub trait NetDriver: Send + Sync {
    /// Short name, for logs.
    fn name(&self) -> &'static str;

    /// Geometry of the buffer pool built for this driver.
    fn pool_config(&self) -> PoolConfig {
        PoolConfig::default()
    }

    fn init(&mut self, ctx: &AttachContext<'_>) -> DriverResult<()>;

    fn start(&self) -> NetResult<()>;

    fn stop(&self) -> NetResult<()>;

    /// Sends the first `length` bytes of a claimed buffer.
    ///
    /// On success the buffer belongs to the driver until it is released to the
    /// free queue. `NetError::OutOfResources` leaves it with the caller.
    fn transmit(&self, token: DbufToken, length: usize) -> NetResult<()>;

    fn status(&self) -> LinkStatus;

    fn mac(&self) -> MacAddress;

    fn mtu(&self) -> u16 {
        ETH_MTU
    }
}
