use crate::{
    AttachContext, CoordinatorConfig, IoctlArgs, NetDriver, Registry, Reply, Request,
    registry::RegisteredDriver,
};
use alloc::{boxed::Box, format, sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicBool, Ordering};
use dbuf::{BufferPool, DbufState};
use driver_api::{
    Platform,
    device::{DeviceFlags, DeviceHandle},
    principal::{Capability, Principal},
};
use netmux_core::net::{DbufToken, IfCaps, IfStatus, IfType, NetError, NetResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Device a request is addressed to.
pub enum Target {
    /// The top-level `netc` device.
    Coordinator,
    /// Interface slot `net{id}`.
    Interface(usize),
}

struct Interface {
    device: DeviceHandle,
    if_type: IfType,
    driver: Box<dyn NetDriver>,
    pool: Arc<BufferPool>,
    open: AtomicBool,
}

pub struct Coordinator {
    device: DeviceHandle,
    open: AtomicBool,
    interfaces: Vec<Interface>,
}

const DEVICE_FLAGS: DeviceFlags = DeviceFlags::NET.union(DeviceFlags::PROT);

impl Coordinator {
    /// Creates the `netc` device and attaches every registered driver that
    /// initializes, up to `config.max_interfaces`.
    ///
    /// A driver that fails to attach is logged and skipped. Slots are numbered
    /// in registration order, without gaps.
    pub fn init(
        registry: Registry,
        platform: &Platform,
        config: CoordinatorConfig,
    ) -> NetResult<Self> {
        let device = platform
            .devices
            .create_device("netc", DEVICE_FLAGS)
            .map_err(|_| NetError::NoDevice)?;

        let mut interfaces = Vec::with_capacity(config.max_interfaces);
        let mut skipped = 0;
        for registered in registry.into_drivers() {
            if interfaces.len() == config.max_interfaces {
                skipped += 1;
                continue;
            }
            if let Some(interface) = Self::attach(interfaces.len(), registered, platform) {
                interfaces.push(interface);
            }
        }

        if skipped > 0 {
            log::warn!(
                "netc: slot limit of {} reached, {skipped} driver(s) not attached",
                config.max_interfaces
            );
        }

        if interfaces.is_empty() {
            log::warn!("netc: no interface attached");
            if config.require_interface {
                platform.devices.destroy_device(device);
                return Err(NetError::NoDevice);
            }
        } else {
            log::info!("netc: {} interface(s) attached", interfaces.len());
        }

        Ok(Self {
            device,
            open: AtomicBool::new(false),
            interfaces,
        })
    }

    fn attach(id: usize, registered: RegisteredDriver, platform: &Platform) -> Option<Interface> {
        let RegisteredDriver {
            mut driver,
            if_type,
        } = registered;

        let name = format!("net{id}");
        let device = match platform.devices.create_device(&name, DEVICE_FLAGS) {
            Ok(device) => device,
            Err(err) => {
                log::warn!("netc: cannot create {name} for {}: {err}", driver.name());
                return None;
            }
        };

        let pool = match BufferPool::new(&platform.pages, driver.pool_config()) {
            Ok(pool) => Arc::new(pool),
            Err(err) => {
                log::warn!("netc: no buffers for {} on {name}: {err}", driver.name());
                platform.devices.destroy_device(device);
                return None;
            }
        };

        let ctx = AttachContext {
            id,
            pool: pool.clone(),
            platform,
        };
        if let Err(err) = driver.init(&ctx) {
            log::warn!("netc: {} failed to attach as {name}: {err}", driver.name());
            platform.devices.destroy_device(device);
            return None;
        }

        Some(Interface {
            device,
            if_type,
            driver,
            pool,
            open: AtomicBool::new(false),
        })
    }

    #[must_use]
    #[inline]
    pub fn nr_interfaces(&self) -> usize {
        self.interfaces.len()
    }

    #[must_use]
    /// Resolves a device handle handed back by the device framework.
    pub fn target_of(&self, device: DeviceHandle) -> Option<Target> {
        if device == self.device {
            return Some(Target::Coordinator);
        }
        self.interfaces
            .iter()
            .position(|interface| interface.device == device)
            .map(Target::Interface)
    }

    #[must_use]
    /// Driver bound to slot `id`.
    pub fn driver_private(&self, id: usize) -> Option<&dyn NetDriver> {
        self.interfaces
            .get(id)
            .map(|interface| interface.driver.as_ref())
    }

    #[must_use]
    pub fn pool(&self, id: usize) -> Option<&Arc<BufferPool>> {
        self.interfaces.get(id).map(|interface| &interface.pool)
    }

    fn check_capability(principal: &dyn Principal) -> NetResult<()> {
        if principal.has_capability(Capability::Network) {
            Ok(())
        } else {
            Err(NetError::PermissionDenied)
        }
    }

    fn open_flag(&self, target: Target) -> NetResult<&AtomicBool> {
        match target {
            Target::Coordinator => Ok(&self.open),
            Target::Interface(id) => self
                .interfaces
                .get(id)
                .map(|interface| &interface.open)
                .ok_or(NetError::NoDevice),
        }
    }

    /// Opens a device. Each device can be open only once at a time.
    pub fn open(&self, principal: &dyn Principal, target: Target) -> NetResult<()> {
        Self::check_capability(principal)?;
        self.open_flag(target)?
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| NetError::Busy)
    }

    pub fn close(&self, principal: &dyn Principal, target: Target) -> NetResult<()> {
        Self::check_capability(principal)?;
        self.open_flag(target)?
            .compare_exchange(true, false, Ordering::Release, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| NetError::NotOpen)
    }

    fn opened(&self, target: Target) -> NetResult<()> {
        if self.open_flag(target)?.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(NetError::NotOpen)
        }
    }

    fn interface(&self, target: Target) -> NetResult<&Interface> {
        self.opened(target)?;
        match target {
            Target::Coordinator => Err(NetError::InvalidArgument),
            Target::Interface(id) => self.interfaces.get(id).ok_or(NetError::NoDevice),
        }
    }

    /// Handles a raw control request, as issued on the device file.
    pub fn ioctl(
        &self,
        principal: &dyn Principal,
        target: Target,
        cmd: u32,
        args: IoctlArgs,
    ) -> NetResult<Reply> {
        Self::check_capability(principal)?;
        self.control(principal, target, Request::decode(cmd, args)?)
    }

    /// Handles a control request.
    ///
    /// Requests without the network capability are refused before anything
    /// else happens. Retryable errors (`NoBuffer`, `OutOfResources`) are flow
    /// control, not failures.
    pub fn control(
        &self,
        principal: &dyn Principal,
        target: Target,
        request: Request,
    ) -> NetResult<Reply> {
        Self::check_capability(principal)?;

        if !request.command().is_per_interface() {
            self.opened(target)?;
            return Ok(Reply::Count(self.interfaces.len()));
        }

        let interface = self.interface(target)?;
        let pool = &interface.pool;

        match request {
            Request::QueryNrIf => unreachable!(),
            Request::GetIfCaps => Ok(Reply::Caps(IfCaps {
                if_type: interface.if_type,
                mtu: interface.driver.mtu(),
                mac: interface.driver.mac(),
            })),
            Request::GetStatus => {
                let counts = pool.counts();
                Ok(Reply::Status(IfStatus {
                    link: interface.driver.status(),
                    rx_pending: counts.rx,
                    tx_staged: counts.tx,
                    free: counts.free,
                }))
            }
            Request::Start => interface.driver.start().map(|()| Reply::Done),
            Request::Stop => interface.driver.stop().map(|()| Reply::Done),
            Request::TxQbuf { token, length } => {
                Self::held(pool, token)?;
                pool.set_data_length(token, length)?;
                interface.driver.transmit(token, length)?;
                Ok(Reply::Done)
            }
            Request::RxQbuf { token } => {
                Self::held(pool, token)?;
                pool.release_to_free(token)?;
                Ok(Reply::Done)
            }
            // Staged frames stay queued until the driver sends them, only
            // free (or reclaimed) buffers are handed out.
            Request::TxDqbuf => pool
                .acquire_free()
                .map(Reply::Buffer)
                .ok_or(NetError::NoBuffer),
            Request::RxDqbuf => pool
                .take_rx()
                .map(Reply::Buffer)
                .ok_or(NetError::NoBuffer),
            Request::BufInfo { token } => {
                Self::held(pool, token)?;
                Ok(Reply::Info(pool.info(token)?))
            }
        }
    }

    /// Checks that a client-supplied token names a buffer the client holds.
    fn held(pool: &BufferPool, token: DbufToken) -> NetResult<()> {
        if !pool.contains(token) {
            return Err(NetError::InvalidHandle);
        }
        match pool.state(token)? {
            DbufState::Claimed => Ok(()),
            _ => Err(NetError::InvalidArgument),
        }
    }

    /// Copies the frame of a held buffer into `out`.
    pub fn read_buffer(
        &self,
        principal: &dyn Principal,
        target: Target,
        token: DbufToken,
        out: &mut [u8],
    ) -> NetResult<usize> {
        Self::check_capability(principal)?;
        let pool = &self.interface(target)?.pool;
        Self::held(pool, token)?;
        Ok(pool.read(token, out)?)
    }

    /// Fills a held buffer.
    pub fn write_buffer(
        &self,
        principal: &dyn Principal,
        target: Target,
        token: DbufToken,
        data: &[u8],
    ) -> NetResult<()> {
        Self::check_capability(principal)?;
        let pool = &self.interface(target)?.pool;
        Self::held(pool, token)?;
        Ok(pool.write(token, data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbuf::{Direction, PoolConfig};
    use driver_api::{
        DriverError, DriverResult,
        testing::{Caps, FakePlatform},
    };
    use netmux_core::net::{LinkStatus, MacAddress};
    use netmux_sync::IrqLock;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct MockState {
        started: AtomicBool,
        in_flight: IrqLock<Vec<DbufToken>>,
        transmits: AtomicUsize,
    }

    /// Driver with a "ring" of `depth` transmit slots.
    struct MockDriver {
        fail_init: bool,
        depth: usize,
        pool: Option<Arc<BufferPool>>,
        state: Arc<MockState>,
    }

    impl MockDriver {
        fn new(fail_init: bool) -> (Box<Self>, Arc<MockState>) {
            let state = Arc::new(MockState::default());
            let driver = Box::new(Self {
                fail_init,
                depth: 2,
                pool: None,
                state: state.clone(),
            });
            (driver, state)
        }
    }

    impl MockState {
        /// Completes the oldest transmission.
        fn complete(&self, pool: &BufferPool) {
            let token = self.in_flight.with_locked(|ring| ring.remove(0));
            pool.release_to_free(token).unwrap();
        }
    }

    impl NetDriver for MockDriver {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn pool_config(&self) -> PoolConfig {
            PoolConfig {
                buffers: 4,
                ..PoolConfig::default()
            }
        }

        fn init(&mut self, ctx: &AttachContext<'_>) -> DriverResult<()> {
            if self.fail_init {
                return Err(DriverError::ResetFailed);
            }
            self.pool = Some(ctx.pool.clone());
            Ok(())
        }

        fn start(&self) -> NetResult<()> {
            self.state.started.store(true, Ordering::Relaxed);
            Ok(())
        }

        fn stop(&self) -> NetResult<()> {
            self.state.started.store(false, Ordering::Relaxed);
            Ok(())
        }

        fn transmit(&self, token: DbufToken, _length: usize) -> NetResult<()> {
            let pool = self.pool.as_ref().ok_or(NetError::NoDevice)?;
            self.state.in_flight.with_locked(|ring| {
                if ring.len() == self.depth {
                    return Err(NetError::OutOfResources);
                }
                pool.mark_pending(token)?;
                ring.push(token);
                self.state.transmits.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
        }

        fn status(&self) -> LinkStatus {
            LinkStatus {
                link_up: true,
                started: self.state.started.load(Ordering::Relaxed),
                tx_in_flight: self.state.in_flight.with_locked(|ring| ring.len()),
                rx_posted: 0,
            }
        }

        fn mac(&self) -> MacAddress {
            MacAddress::new([2, 0, 0, 0, 0, 1])
        }
    }

    struct Bed {
        fake: FakePlatform,
        states: Vec<Arc<MockState>>,
        netc: Coordinator,
    }

    fn bed(outcomes: &[bool], config: CoordinatorConfig) -> Bed {
        let fake = FakePlatform::new();
        let mut registry = Registry::new();
        let mut states = Vec::new();
        for &fails in outcomes {
            let (driver, state) = MockDriver::new(fails);
            registry.register(driver, IfType::Ethernet);
            states.push(state);
        }
        let netc = Coordinator::init(registry, &fake.platform(), config).unwrap();
        Bed { fake, states, netc }
    }

    fn opened(outcomes: &[bool]) -> Bed {
        let bed = bed(outcomes, CoordinatorConfig::default());
        bed.netc.open(&Caps::NETWORK, Target::Coordinator).unwrap();
        bed.netc.open(&Caps::NETWORK, Target::Interface(0)).unwrap();
        bed
    }

    #[test]
    fn test_failed_driver_is_skipped() {
        let bed = bed(&[false, true, false], CoordinatorConfig::default());

        assert_eq!(bed.netc.nr_interfaces(), 2);
        assert_eq!(bed.fake.devices.live(), ["netc", "net0", "net1"]);
        assert_eq!(bed.fake.devices.destroyed(), 1);
        // The failed driver's buffers went back to the allocator.
        assert_eq!(bed.fake.pages.live_pages(), 2 * 4);
        assert!(bed.netc.driver_private(1).is_some());
        assert!(bed.netc.driver_private(2).is_none());
    }

    #[test]
    fn test_slot_limit() {
        let config = CoordinatorConfig {
            max_interfaces: 2,
            ..CoordinatorConfig::default()
        };
        let bed = bed(&[false, false, false], config);

        assert_eq!(bed.netc.nr_interfaces(), 2);
        assert_eq!(bed.fake.devices.live(), ["netc", "net0", "net1"]);
    }

    #[test]
    fn test_no_interface() {
        let bed = bed(&[true], CoordinatorConfig::default());
        assert_eq!(bed.netc.nr_interfaces(), 0);

        bed.netc.open(&Caps::NETWORK, Target::Coordinator).unwrap();
        assert_eq!(
            bed.netc
                .control(&Caps::NETWORK, Target::Coordinator, Request::QueryNrIf),
            Ok(Reply::Count(0))
        );
    }

    #[test]
    fn test_no_interface_required() {
        let fake = FakePlatform::new();
        let mut registry = Registry::new();
        registry.register(MockDriver::new(true).0, IfType::Ethernet);
        let config = CoordinatorConfig {
            require_interface: true,
            ..CoordinatorConfig::default()
        };

        let result = Coordinator::init(registry, &fake.platform(), config);
        assert!(matches!(result, Err(NetError::NoDevice)));
        assert!(fake.devices.live().is_empty());
    }

    #[test]
    fn test_netc_device_failure() {
        let fake = FakePlatform::new();
        fake.devices.refuse("netc");

        let result = Coordinator::init(Registry::new(), &fake.platform(), CoordinatorConfig::default());
        assert!(matches!(result, Err(NetError::NoDevice)));
    }

    #[test]
    fn test_single_open() {
        let bed = bed(&[false], CoordinatorConfig::default());
        let netc = &bed.netc;

        netc.open(&Caps::NETWORK, Target::Coordinator).unwrap();
        assert_eq!(netc.open(&Caps::NETWORK, Target::Coordinator), Err(NetError::Busy));

        netc.open(&Caps::NETWORK, Target::Interface(0)).unwrap();
        assert_eq!(
            netc.open(&Caps::NETWORK, Target::Interface(0)),
            Err(NetError::Busy)
        );
        assert_eq!(
            netc.open(&Caps::NETWORK, Target::Interface(1)),
            Err(NetError::NoDevice)
        );

        netc.close(&Caps::NETWORK, Target::Interface(0)).unwrap();
        assert_eq!(
            netc.close(&Caps::NETWORK, Target::Interface(0)),
            Err(NetError::NotOpen)
        );
        netc.open(&Caps::NETWORK, Target::Interface(0)).unwrap();
    }

    #[test]
    fn test_closed_interface() {
        let bed = bed(&[false], CoordinatorConfig::default());

        assert_eq!(
            bed.netc
                .control(&Caps::NETWORK, Target::Interface(0), Request::Start),
            Err(NetError::NotOpen)
        );
        assert!(!bed.states[0].started.load(Ordering::Relaxed));
    }

    #[test]
    fn test_interface_request_on_coordinator() {
        let bed = opened(&[false]);
        assert_eq!(
            bed.netc
                .control(&Caps::NETWORK, Target::Coordinator, Request::TxDqbuf),
            Err(NetError::InvalidArgument)
        );
        assert_eq!(
            bed.netc
                .control(&Caps::NETWORK, Target::Coordinator, Request::GetIfCaps),
            Err(NetError::InvalidArgument)
        );
        // Only the interface count is answered on every device.
        assert_eq!(
            bed.netc
                .control(&Caps::NETWORK, Target::Interface(0), Request::QueryNrIf),
            Ok(Reply::Count(1))
        );
    }

    #[test]
    fn test_capability_gating() {
        let bed = opened(&[false]);
        let netc = &bed.netc;
        let pool = netc.pool(0).unwrap();
        let before = pool.counts();

        for request in [
            Request::QueryNrIf,
            Request::Start,
            Request::TxDqbuf,
            Request::RxDqbuf,
            Request::RxQbuf {
                token: DbufToken::new(0x9a0a, 0),
            },
        ] {
            assert_eq!(
                netc.control(&Caps::NONE, Target::Interface(0), request),
                Err(NetError::PermissionDenied)
            );
        }
        assert_eq!(
            netc.ioctl(&Caps::NONE, Target::Interface(0), 0xff, IoctlArgs::default()),
            Err(NetError::PermissionDenied)
        );
        assert_eq!(
            netc.open(&Caps::NONE, Target::Interface(0)),
            Err(NetError::PermissionDenied)
        );
        assert_eq!(
            netc.close(&Caps::NONE, Target::Interface(0)),
            Err(NetError::PermissionDenied)
        );

        assert_eq!(pool.counts(), before);
        assert!(!bed.states[0].started.load(Ordering::Relaxed));
        // Still open.
        assert_eq!(
            netc.open(&Caps::NETWORK, Target::Interface(0)),
            Err(NetError::Busy)
        );
    }

    #[test]
    fn test_unknown_command() {
        let bed = opened(&[false]);
        assert_eq!(
            bed.netc
                .ioctl(&Caps::NETWORK, Target::Interface(0), 0x42, IoctlArgs::default()),
            Err(NetError::InvalidArgument)
        );
    }

    #[test]
    fn test_query_and_caps() {
        let bed = opened(&[false, false]);
        let netc = &bed.netc;

        assert_eq!(
            netc.ioctl(&Caps::NETWORK, Target::Coordinator, 0x01, IoctlArgs::default()),
            Ok(Reply::Count(2))
        );
        let Ok(Reply::Caps(caps)) = netc.control(&Caps::NETWORK, Target::Interface(0), Request::GetIfCaps)
        else {
            panic!("no caps");
        };
        assert_eq!(caps.if_type, IfType::Ethernet);
        assert_eq!(caps.mtu, 1500);
    }

    #[test]
    fn test_start_stop_status() {
        let bed = opened(&[false]);
        let netc = &bed.netc;
        let status = || match netc.control(&Caps::NETWORK, Target::Interface(0), Request::GetStatus) {
            Ok(Reply::Status(status)) => status,
            other => panic!("unexpected {other:?}"),
        };

        netc.control(&Caps::NETWORK, Target::Interface(0), Request::Start)
            .unwrap();
        assert!(status().link.started);
        assert_eq!(status().free, 4);

        netc.control(&Caps::NETWORK, Target::Interface(0), Request::Stop)
            .unwrap();
        assert!(!status().link.started);
    }

    #[test]
    fn test_buffer_exchange() {
        let bed = opened(&[false]);
        let netc = &bed.netc;
        let caps = &Caps::NETWORK;
        let iface = Target::Interface(0);
        let pool = netc.pool(0).unwrap().clone();

        // Transmit two frames, the third one hits the ring limit.
        let mut sent = Vec::new();
        for i in 0..3_u8 {
            let Ok(Reply::Buffer(token)) = netc.control(caps, iface, Request::TxDqbuf) else {
                panic!("no buffer");
            };
            netc.write_buffer(caps, iface, token, &[i; 60]).unwrap();
            let result = netc.control(caps, iface, Request::TxQbuf { token, length: 60 });
            if i < 2 {
                assert_eq!(result, Ok(Reply::Done));
                sent.push(token);
            } else {
                assert_eq!(result, Err(NetError::OutOfResources));
                assert!(result.unwrap_err().is_retryable());
                // Still held by the client.
                assert_eq!(pool.state(token), Ok(DbufState::Claimed));
                netc.control(caps, iface, Request::RxQbuf { token }).unwrap();
            }
        }

        // A buffer owned by the "hardware" cannot be given back by the client.
        assert_eq!(
            netc.control(caps, iface, Request::RxQbuf { token: sent[0] }),
            Err(NetError::InvalidArgument)
        );

        bed.states[0].complete(&pool);
        assert_eq!(bed.states[0].transmits.load(Ordering::Relaxed), 2);
        assert_eq!(pool.counts().lent, 1);
    }

    #[test]
    fn test_rx_dequeue() {
        let bed = opened(&[false]);
        let netc = &bed.netc;
        let caps = &Caps::NETWORK;
        let iface = Target::Interface(0);
        let pool = netc.pool(0).unwrap().clone();

        assert_eq!(
            netc.control(caps, iface, Request::RxDqbuf),
            Err(NetError::NoBuffer)
        );

        // A frame arrives.
        let token = pool.acquire_pending().unwrap();
        pool.publish_rx(token, 3).unwrap();

        assert_eq!(
            netc.control(caps, iface, Request::RxDqbuf),
            Ok(Reply::Buffer(token))
        );
        let Ok(Reply::Info(info)) = netc.control(caps, iface, Request::BufInfo { token }) else {
            panic!("no info");
        };
        assert_eq!(info.data_length, 3);

        let mut out = [0xff; 8];
        assert_eq!(netc.read_buffer(caps, iface, token, &mut out), Ok(3));
        assert_eq!(out[..3], [0, 0, 0]);

        netc.control(caps, iface, Request::RxQbuf { token }).unwrap();
        assert_eq!(pool.counts().free, 4);
    }

    #[test]
    fn test_tx_dequeue_exhaustion() {
        let bed = opened(&[false]);
        let netc = &bed.netc;

        for _ in 0..4 {
            assert!(matches!(
                netc.control(&Caps::NETWORK, Target::Interface(0), Request::TxDqbuf),
                Ok(Reply::Buffer(_))
            ));
        }
        assert_eq!(
            netc.control(&Caps::NETWORK, Target::Interface(0), Request::TxDqbuf),
            Err(NetError::NoBuffer)
        );
    }

    #[test]
    fn test_tx_dequeue_skips_staged_frames() {
        let bed = opened(&[false]);
        let netc = &bed.netc;
        let pool = netc.pool(0).unwrap().clone();

        let staged = pool.acquire_free().unwrap();
        pool.write(staged, &[0xaa; 60]).unwrap();
        pool.publish_tx(staged, 60).unwrap();

        for _ in 0..3 {
            let Ok(Reply::Buffer(token)) =
                netc.control(&Caps::NETWORK, Target::Interface(0), Request::TxDqbuf)
            else {
                panic!("no buffer");
            };
            assert_ne!(token, staged);
        }
        assert_eq!(
            netc.control(&Caps::NETWORK, Target::Interface(0), Request::TxDqbuf),
            Err(NetError::NoBuffer)
        );
        assert_eq!(pool.state(staged), Ok(DbufState::Ready(Direction::Tx)));
    }

    #[test]
    fn test_bad_tokens() {
        let bed = opened(&[false]);
        let netc = &bed.netc;
        let iface = Target::Interface(0);

        for token in [DbufToken::from_raw(0), DbufToken::new(0x9a0a, 99)] {
            assert_eq!(
                netc.control(&Caps::NETWORK, iface, Request::RxQbuf { token }),
                Err(NetError::InvalidHandle)
            );
            assert_eq!(
                netc.control(&Caps::NETWORK, iface, Request::TxQbuf { token, length: 1 }),
                Err(NetError::InvalidHandle)
            );
        }

        // A free buffer is not held by anybody.
        let free = DbufToken::new(0x9a0a, 0);
        assert_eq!(
            netc.control(&Caps::NETWORK, iface, Request::BufInfo { token: free }),
            Err(NetError::InvalidArgument)
        );
    }

    #[test]
    fn test_target_of() {
        let bed = bed(&[false, false], CoordinatorConfig::default());
        let netc = &bed.netc;

        assert_eq!(netc.target_of(netc.device), Some(Target::Coordinator));
        assert_eq!(
            netc.target_of(netc.interfaces[1].device),
            Some(Target::Interface(1))
        );
        assert_eq!(netc.target_of(DeviceHandle::new(99)), None);
    }
}
