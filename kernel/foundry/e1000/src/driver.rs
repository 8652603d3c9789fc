use crate::{
    E1000Config,
    descriptors::{RxDescriptor, TxDescriptor},
    is_supported,
    registers::{
        CtrlFlags, EecdFlags, IntFlags, RahFlags, RctlFlags, Registers, StatusFlags, TIPG_COPPER,
        TctlFlags,
    },
    ring::Ring,
};
use alloc::{sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicBool, Ordering, fence};
use dbuf::{BufferPool, DEFAULT_POOL_BUFFERS, PoolConfig};
use driver_api::{
    Delay, DriverError, DriverResult, Platform,
    irq::{InterruptController, InterruptHandle, InterruptHandler},
    pci::{PciEnable, PciFunction},
    regs::RegisterBus,
};
use netc::{AttachContext, NetDriver};
use netmux_core::net::{DbufToken, LinkStatus, MacAddress, NetError, NetResult};
use netmux_sync::IrqLock;

/// Polling interval while waiting for the reset to complete.
const RESET_POLL_US: u32 = 10;

pub struct E1000 {
    function: PciFunction,
    config: E1000Config,
    attached: Option<Attached>,
}

struct Attached {
    inner: Arc<Inner>,
    irq: Arc<dyn InterruptController>,
    handle: InterruptHandle,
}

struct Rings {
    rx: Ring<RxDescriptor>,
    tx: Ring<TxDescriptor>,
    started: bool,
}

/// State shared with the interrupt handler.
struct Inner {
    regs: Arc<dyn RegisterBus>,
    pool: Arc<BufferPool>,
    mac: MacAddress,
    rctl: u32,
    link_up: AtomicBool,
    rings: IrqLock<Rings>,
}

impl E1000 {
    #[must_use]
    pub const fn new(function: PciFunction, config: E1000Config) -> Self {
        Self {
            function,
            config,
            attached: None,
        }
    }

    #[must_use]
    /// One driver per supported PCI function.
    pub fn probe(platform: &Platform) -> Vec<Self> {
        Self::probe_with(platform, E1000Config::default())
    }

    #[must_use]
    pub fn probe_with(platform: &Platform, config: E1000Config) -> Vec<Self> {
        platform
            .pci
            .enumerate(&|function| is_supported(function.vendor_id, function.device_id))
            .into_iter()
            .map(|function| {
                log::info!("e1000: found {function}");
                Self::new(function, config)
            })
            .collect()
    }

    #[must_use]
    #[inline]
    pub const fn function(&self) -> &PciFunction {
        &self.function
    }

    fn inner(&self) -> NetResult<&Inner> {
        self.attached
            .as_ref()
            .map(|attached| attached.inner.as_ref())
            .ok_or(NetError::NoDevice)
    }
}

impl NetDriver for E1000 {
    fn name(&self) -> &'static str {
        "e1000"
    }

    fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            buffers: DEFAULT_POOL_BUFFERS.max(self.config.rx_ring + self.config.tx_ring),
            ..PoolConfig::default()
        }
    }

    fn init(&mut self, ctx: &AttachContext<'_>) -> DriverResult<()> {
        assert!(self.attached.is_none());
        let platform = ctx.platform;

        let resources = platform.pci.configure(&self.function)?;
        let Some(bar) = resources.bars[0] else {
            log::warn!("e1000: {} does not have a memory BAR", self.function);
            return Err(DriverError::Absent);
        };
        platform
            .pci
            .enable(&self.function, PciEnable::MEMORY | PciEnable::BUS_MASTER)?;
        let regs = platform.pci.map_bar(&self.function, &bar)?;

        reset(regs.as_ref(), platform.delay.as_ref(), self.config.reset_timeout_us)?;
        let mac = read_mac(regs.as_ref())?;

        let rctl = RctlFlags::bsize_for(ctx.pool.buf_capacity()).ok_or(DriverError::Invalid)?
            | RctlFlags::UPE
            | RctlFlags::MPE
            | RctlFlags::BAM
            | RctlFlags::SECRC;
        let rings = Rings {
            rx: Ring::new(&platform.pages, self.config.rx_ring)?,
            tx: Ring::new(&platform.pages, self.config.tx_ring)?,
            started: false,
        };

        let inner = Arc::new(Inner {
            regs,
            pool: ctx.pool.clone(),
            mac,
            rctl,
            link_up: AtomicBool::new(false),
            rings: IrqLock::new(rings),
        });
        inner.configure_descriptors();

        let handle = platform
            .irq
            .attach(resources.irq_line, self.config.irq_priority, inner.clone())?;

        log::info!(
            "e1000: {} attached at slot {}, mmio_base={:#x}, mmio_size={:#x}, irqline={}, mac={mac}",
            self.function,
            ctx.id,
            bar.base.as_u64(),
            bar.size,
            resources.irq_line
        );

        self.attached = Some(Attached {
            inner,
            irq: platform.irq.clone(),
            handle,
        });
        Ok(())
    }

    fn start(&self) -> NetResult<()> {
        self.inner()?.start();
        Ok(())
    }

    fn stop(&self) -> NetResult<()> {
        self.inner()?.stop();
        Ok(())
    }

    fn transmit(&self, token: DbufToken, length: usize) -> NetResult<()> {
        self.inner()?.transmit(token, length)
    }

    fn status(&self) -> LinkStatus {
        self.inner().map_or_else(|_| LinkStatus::default(), Inner::status)
    }

    fn mac(&self) -> MacAddress {
        self.inner()
            .map_or_else(|_| MacAddress::default(), |inner| inner.mac)
    }
}

impl Drop for E1000 {
    fn drop(&mut self) {
        if let Some(attached) = self.attached.take() {
            attached.inner.stop();
            attached.irq.detach(attached.handle);
        }
    }
}

/// Global reset, in the order the 8254x manual asks for.
fn reset(regs: &dyn RegisterBus, delay: &dyn Delay, timeout_us: u32) -> DriverResult<()> {
    regs.write32(Registers::IMC, IntFlags::ALL);
    regs.write32(Registers::RCTL, 0);
    regs.write32(Registers::TCTL, TctlFlags::PSP);
    // Flush, then let pending bus transactions complete.
    let _ = regs.read32(Registers::STATUS);
    delay.delay_us(10_000);

    regs.write32(
        Registers::CTRL,
        regs.read32(Registers::CTRL) | CtrlFlags::PHY_RST,
    );
    delay.delay_us(5_000);
    regs.write32(Registers::CTRL, regs.read32(Registers::CTRL) | CtrlFlags::RST);

    let mut waited = 0;
    while regs.read32(Registers::CTRL) & CtrlFlags::RST != 0
        || regs.read32(Registers::EECD) & EecdFlags::AUTO_RD == 0
    {
        if waited >= timeout_us {
            log::warn!("e1000: reset did not complete within {timeout_us}us");
            return Err(DriverError::ResetFailed);
        }
        delay.delay_us(RESET_POLL_US);
        waited += RESET_POLL_US;
    }

    regs.write32(Registers::IMC, IntFlags::ALL);
    let _ = regs.read32(Registers::ICR);
    Ok(())
}

fn read_mac(regs: &dyn RegisterBus) -> DriverResult<MacAddress> {
    let low = regs.read32(Registers::RAL0).to_le_bytes();
    let high = regs.read32(Registers::RAH0);
    if high & RahFlags::AV == 0 {
        log::warn!("e1000: no valid MAC address");
        return Err(DriverError::Invalid);
    }

    let [a, b, c, d] = low;
    let [e, f, ..] = high.to_le_bytes();
    Ok(MacAddress::new([a, b, c, d, e, f]))
}

impl Inner {
    #[inline]
    fn read_reg(&self, offset: usize) -> u32 {
        self.regs.read32(offset)
    }

    #[inline]
    fn write_reg(&self, offset: usize, value: u32) {
        self.regs.write32(offset, value);
    }

    #[inline]
    fn update_reg(&self, offset: usize, f: impl FnOnce(u32) -> u32) {
        self.write_reg(offset, f(self.read_reg(offset)));
    }

    fn configure_descriptors(&self) {
        self.rings.with_locked(|rings| {
            let rx = &rings.rx.descs;
            self.write_reg(Registers::RDBAL, rx.paddr().low());
            self.write_reg(Registers::RDBAH, rx.paddr().high());
            self.write_reg(Registers::RDLEN, rx.byte_len());
            self.write_reg(Registers::RDH, 0);
            self.write_reg(Registers::RDT, 0);

            let tx = &rings.tx.descs;
            self.write_reg(Registers::TDBAL, tx.paddr().low());
            self.write_reg(Registers::TDBAH, tx.paddr().high());
            self.write_reg(Registers::TDLEN, tx.byte_len());
            self.write_reg(Registers::TDH, 0);
            self.write_reg(Registers::TDT, 0);
        });
        self.write_reg(Registers::TIPG, TIPG_COPPER);
    }

    fn read_link(&self) -> bool {
        self.read_reg(Registers::STATUS) & StatusFlags::LU != 0
    }

    /// Hands a buffer the driver no longer needs back to the free queue.
    fn recycle(&self, token: DbufToken) {
        let released = self.pool.release_to_free(token);
        debug_assert!(released.is_ok(), "recycling {token:?}: {released:?}");
    }

    fn start(&self) {
        self.rings.with_locked(|rings| {
            if rings.started {
                return;
            }
            rings.started = true;

            self.refill_rx(rings);
            self.write_reg(Registers::RCTL, self.rctl | RctlFlags::EN);
            self.write_reg(Registers::TCTL, TctlFlags::RUNNING);
            self.update_reg(Registers::CTRL, |ctrl| ctrl | CtrlFlags::SLU);
            self.link_up.store(self.read_link(), Ordering::Relaxed);
            self.write_reg(Registers::IMS, IntFlags::ENABLED);

            self.push_staged(rings);
        });
        log::debug!("e1000: started");
    }

    fn stop(&self) {
        self.rings.with_locked(|rings| {
            self.write_reg(Registers::IMC, IntFlags::ALL);
            if !rings.started {
                return;
            }
            rings.started = false;

            self.update_reg(Registers::RCTL, |rctl| rctl & !RctlFlags::EN);
            self.update_reg(Registers::TCTL, |tctl| tctl & !TctlFlags::EN);

            rings.rx.drain(|token| self.recycle(token));
            rings.tx.drain(|token| self.recycle(token));
            for reg in [Registers::RDH, Registers::RDT, Registers::TDH, Registers::TDT] {
                self.write_reg(reg, 0);
            }
            let _ = self.read_reg(Registers::ICR);
        });
        log::debug!("e1000: stopped");
    }

    fn transmit(&self, token: DbufToken, length: usize) -> NetResult<()> {
        let wire_length = u16::try_from(length).map_err(|_| NetError::InvalidArgument)?;

        self.rings.with_locked(|rings| {
            if !rings.started {
                // Sent by the next `start`.
                self.pool.publish_tx(token, length)?;
                return Ok(());
            }
            if rings.tx.is_full() {
                log::debug!("e1000: transmit ring full");
                return Err(NetError::OutOfResources);
            }

            let paddr = self.pool.paddr(token)?;
            self.pool.mark_pending(token)?;
            rings
                .tx
                .push(TxDescriptor::for_send(paddr, wire_length), token);

            // Descriptor writes must land before the tail moves.
            fence(Ordering::Release);
            self.write_reg(Registers::TDT, rings.tx.tail());
            Ok(())
        })
    }

    fn status(&self) -> LinkStatus {
        self.rings.with_locked(|rings| LinkStatus {
            link_up: self.link_up.load(Ordering::Relaxed),
            started: rings.started,
            tx_in_flight: rings.tx.owned(),
            rx_posted: rings.rx.owned(),
        })
    }

    /// Posts free buffers until the receive ring is full or the pool is dry.
    fn refill_rx(&self, rings: &mut Rings) {
        let before = rings.rx.owned();
        while !rings.rx.is_full() {
            let Some(token) = self.pool.acquire_pending() else {
                break;
            };
            match self.pool.paddr(token) {
                Ok(paddr) => rings.rx.push(RxDescriptor::new(paddr), token),
                Err(_) => {
                    self.recycle(token);
                    break;
                }
            }
        }

        if rings.rx.owned() != before {
            fence(Ordering::Release);
            self.write_reg(Registers::RDT, rings.rx.tail());
        }
    }

    /// Moves staged frames into the transmit ring.
    fn push_staged(&self, rings: &mut Rings) {
        let before = rings.tx.owned();
        while !rings.tx.is_full() {
            let Some(token) = self.pool.take_tx_pending() else {
                break;
            };
            let desc = self.pool.paddr(token).ok().and_then(|paddr| {
                let length = self.pool.data_length(token).ok()?;
                Some(TxDescriptor::for_send(paddr, u16::try_from(length).ok()?))
            });
            match desc {
                Some(desc) => rings.tx.push(desc, token),
                // Cannot go on the wire, drop it.
                None => self.recycle(token),
            }
        }

        if rings.tx.owned() != before {
            fence(Ordering::Release);
            self.write_reg(Registers::TDT, rings.tx.tail());
        }
    }

    /// Publishes every frame the hardware wrote back, then refills.
    fn reclaim_rx(&self, rings: &mut Rings) {
        let head = self.read_reg(Registers::RDH) as usize;
        while let Some((desc, token)) = rings.rx.pop(head) {
            if !desc.is_complete_frame()
                || self
                    .pool
                    .publish_rx(token, usize::from(desc.packet_length()))
                    .is_err()
            {
                self.recycle(token);
            }
        }
        self.refill_rx(rings);
    }

    /// Frees every transmitted buffer, in ring order, then sends staged frames.
    fn reclaim_tx(&self, rings: &mut Rings) {
        let head = self.read_reg(Registers::TDH) as usize;
        while let Some((_, token)) = rings.tx.pop(head) {
            self.recycle(token);
        }
        self.push_staged(rings);
    }

    fn link_change(&self) {
        let up = self.read_link();
        if self.link_up.swap(up, Ordering::Relaxed) != up {
            log::debug!("e1000: link {}", if up { "up" } else { "down" });
        }
    }
}

impl InterruptHandler for Inner {
    fn handle(&self) -> bool {
        let icr = self.read_reg(Registers::ICR);
        if icr == 0 {
            return false;
        }

        if icr & IntFlags::LSC != 0 {
            self.link_change();
        }
        if icr & (IntFlags::RX | IntFlags::TX) != 0 {
            self.rings.with_locked(|rings| {
                if !rings.started {
                    return;
                }
                if icr & IntFlags::RX != 0 {
                    self.reclaim_rx(rings);
                }
                if icr & IntFlags::TX != 0 {
                    self.reclaim_tx(rings);
                }
            });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Access, FakeE1000};
    use dbuf::{DbufState, Direction};
    use driver_api::{irq::IrqPriority, testing::FakePlatform};

    const MAC: [u8; 6] = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];

    struct Bed {
        fake: FakePlatform,
        hw: Arc<FakeE1000>,
        line: u8,
        pool: Arc<BufferPool>,
        driver: E1000,
    }

    impl Bed {
        fn fire(&self) -> bool {
            self.fake.irq.fire(self.line)
        }

        /// A claimed buffer holding `fill`.
        fn frame(&self, fill: u8) -> DbufToken {
            let token = self.pool.acquire_free().unwrap();
            self.pool.write(token, &[fill; 60]).unwrap();
            token
        }
    }

    fn try_bed(depth: usize, setup: impl FnOnce(&FakePlatform, &FakeE1000)) -> (Bed, DriverResult<()>) {
        let fake = FakePlatform::new();
        let (hw, _function, line) = FakeE1000::plug(&fake, 0, MAC);
        setup(&fake, hw.as_ref());

        let platform = fake.platform();
        let config = E1000Config {
            rx_ring: depth,
            tx_ring: depth,
            ..E1000Config::default()
        };
        let mut driver = E1000::probe_with(&platform, config).pop().unwrap();
        let pool = Arc::new(BufferPool::new(&platform.pages, driver.pool_config()).unwrap());
        let result = driver.init(&AttachContext {
            id: 0,
            pool: pool.clone(),
            platform: &platform,
        });

        let bed = Bed {
            fake,
            hw,
            line,
            pool,
            driver,
        };
        (bed, result)
    }

    fn bed(depth: usize) -> Bed {
        let (bed, result) = try_bed(depth, |_, _| {});
        result.unwrap();
        bed
    }

    fn started(depth: usize) -> Bed {
        let bed = bed(depth);
        bed.driver.start().unwrap();
        bed
    }

    #[test]
    fn test_reset_sequence() {
        let bed = bed(8);

        let interesting = |access: &Access| match *access {
            Access::Write(offset, _) => [
                Registers::IMC,
                Registers::RCTL,
                Registers::TCTL,
                Registers::CTRL,
            ]
            .contains(&offset),
            Access::Read(offset) => offset == Registers::STATUS || offset == Registers::ICR,
        };
        let sequence = bed
            .hw
            .journal()
            .into_iter()
            .take_while(|access| !matches!(access, Access::Write(offset, _) if *offset == Registers::RDBAL))
            .filter(interesting)
            .collect::<Vec<_>>();

        assert_eq!(
            sequence,
            [
                Access::Write(Registers::IMC, IntFlags::ALL),
                Access::Write(Registers::RCTL, 0),
                Access::Write(Registers::TCTL, TctlFlags::PSP),
                Access::Read(Registers::STATUS),
                Access::Write(Registers::CTRL, CtrlFlags::PHY_RST),
                Access::Write(Registers::CTRL, CtrlFlags::PHY_RST | CtrlFlags::RST),
                Access::Write(Registers::IMC, IntFlags::ALL),
                Access::Read(Registers::ICR),
            ]
        );
        assert_eq!(bed.hw.resets(), 1);
        assert!(bed.fake.delay.waited_us() >= 15_000);
    }

    #[test]
    fn test_attach() {
        let bed = bed(8);

        assert_eq!(bed.driver.mac(), MacAddress::new(MAC));
        assert_eq!(bed.fake.irq.attached(bed.line), Some(IrqPriority::Net));
        assert!(
            bed.fake
                .pci
                .enabled(bed.driver.function())
                .contains(PciEnable::MEMORY | PciEnable::BUS_MASTER)
        );
        // Both rings: 16 descriptors each.
        assert_eq!(bed.hw.peek(Registers::RDLEN), 256);
        assert_eq!(bed.hw.peek(Registers::TDLEN), 256);
        assert_eq!(bed.hw.peek(Registers::RCTL) & RctlFlags::EN, 0);
        assert!(!bed.driver.status().started);
    }

    #[test]
    fn test_reset_timeout() {
        let (bed, result) = try_bed(8, |_, hw| hw.stall_reset());

        assert_eq!(result, Err(DriverError::ResetFailed));
        assert_eq!(bed.fake.irq.attached(bed.line), None);
        // Only the pool is left.
        assert_eq!(bed.fake.pages.live_pages(), bed.pool.len());
        assert_eq!(bed.driver.start(), Err(NetError::NoDevice));
    }

    #[test]
    fn test_ring_allocation_failure() {
        // Let the pool and the receive ring through.
        let (bed, result) = try_bed(8, |fake, _| fake.pages.fail_after(64 + 1));

        assert_eq!(result, Err(DriverError::OutOfMemory));
        assert_eq!(bed.fake.pages.live_pages(), bed.pool.len());
        assert_eq!(bed.fake.irq.attached(bed.line), None);
    }

    #[test]
    fn test_start_posts_receive_buffers() {
        let bed = started(8);

        let status = bed.driver.status();
        assert!(status.started && status.link_up);
        assert_eq!(status.rx_posted, 8);
        assert_eq!(bed.pool.counts().free, 64 - 8);
        assert_eq!(bed.hw.peek(Registers::RDT), 8);
        assert_eq!(bed.hw.peek(Registers::IMS), IntFlags::ENABLED);
        assert_ne!(bed.hw.peek(Registers::RCTL) & RctlFlags::EN, 0);

        // Idempotent.
        bed.driver.start().unwrap();
        assert_eq!(bed.driver.status().rx_posted, 8);
    }

    #[test]
    fn test_transmit_backpressure() {
        let bed = started(8);

        let sent = (0..8)
            .map(|i| {
                let token = bed.frame(i);
                bed.driver.transmit(token, 60).unwrap();
                token
            })
            .collect::<Vec<_>>();
        assert_eq!(bed.driver.status().tx_in_flight, 8);
        assert_eq!(bed.hw.peek(Registers::TDT), 8);

        let ninth = bed.frame(8);
        assert_eq!(bed.driver.transmit(ninth, 60), Err(NetError::OutOfResources));
        assert_eq!(bed.pool.state(ninth), Ok(DbufState::Claimed));

        let free_before = bed.pool.counts().free;
        assert_eq!(bed.hw.complete_tx(3), 3);
        assert!(bed.fire());
        assert_eq!(bed.pool.counts().free, free_before + 3);
        assert_eq!(bed.driver.status().tx_in_flight, 5);

        // Completed buffers sit at the back of the free queue, oldest first.
        let mut drained = Vec::new();
        while let Some(token) = bed.pool.acquire_free() {
            drained.push(token);
        }
        assert_eq!(drained[drained.len() - 3..], sent[..3]);
        for token in drained {
            bed.pool.release_to_free(token).unwrap();
        }

        bed.driver.transmit(ninth, 60).unwrap();
        assert_eq!(bed.driver.status().tx_in_flight, 6);

        let wire = bed.hw.transmitted();
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[1], [1; 60]);
    }

    #[test]
    fn test_receive() {
        let bed = started(8);
        let frame = (0..100).collect::<Vec<u8>>();

        assert!(bed.hw.receive(&frame));
        assert!(bed.hw.receive(&frame[..42]));
        assert!(bed.fire());

        let first = bed.pool.take_rx().unwrap();
        let mut out = [0; 128];
        assert_eq!(bed.pool.read(first, &mut out), Ok(100));
        assert_eq!(out[..100], frame[..]);
        let second = bed.pool.take_rx().unwrap();
        assert_eq!(bed.pool.data_length(second), Ok(42));

        // The ring was topped up again.
        assert_eq!(bed.driver.status().rx_posted, 8);
        assert_eq!(bed.hw.peek(Registers::RDT), 10);
    }

    #[test]
    fn test_receive_without_free_buffers() {
        let bed = started(8);
        let held = core::iter::from_fn(|| bed.pool.acquire_free()).collect::<Vec<_>>();

        for _ in 0..8 {
            assert!(bed.hw.receive(&[0xab; 64]));
        }
        // Ring exhausted, the frame is dropped by the hardware.
        assert!(!bed.hw.receive(&[0xab; 64]));
        bed.fire();
        assert_eq!(bed.pool.counts().rx, 8);
        assert_eq!(bed.driver.status().rx_posted, 0);

        for token in held {
            bed.pool.release_to_free(token).unwrap();
        }
        // The next overrun refills the ring.
        assert!(!bed.hw.receive(&[0; 64]));
        assert!(bed.fire());
        assert_eq!(bed.driver.status().rx_posted, 8);
        assert!(bed.hw.receive(&[0; 64]));
    }

    #[test]
    fn test_stop_reclaims_everything() {
        let bed = started(8);
        for i in 0..3 {
            let token = bed.frame(i);
            bed.driver.transmit(token, 60).unwrap();
        }

        bed.driver.stop().unwrap();
        assert_eq!(bed.pool.counts().lent, 0);
        assert_eq!(bed.pool.counts().free, 64);
        assert_eq!(bed.hw.peek(Registers::IMS), 0);
        assert_eq!(bed.hw.peek(Registers::RCTL) & RctlFlags::EN, 0);
        assert_eq!(bed.hw.peek(Registers::TDT), 0);
        let status = bed.driver.status();
        assert!(!status.started);
        assert_eq!((status.rx_posted, status.tx_in_flight), (0, 0));
    }

    #[test]
    fn test_transmit_while_stopped_is_staged() {
        let bed = bed(8);
        let token = bed.frame(7);

        bed.driver.transmit(token, 60).unwrap();
        assert_eq!(bed.pool.state(token), Ok(DbufState::Ready(Direction::Tx)));
        assert_eq!(bed.hw.peek(Registers::TDT), 0);

        bed.driver.start().unwrap();
        assert_eq!(bed.pool.state(token), Ok(DbufState::Pending));
        assert_eq!(bed.driver.status().tx_in_flight, 1);
        assert_eq!(bed.hw.complete_tx(8), 1);
        assert_eq!(bed.hw.transmitted(), [[7; 60]]);
    }

    #[test]
    fn test_link_change() {
        let bed = started(8);
        assert!(bed.driver.status().link_up);

        bed.hw.set_link(false);
        assert!(bed.fire());
        assert!(!bed.driver.status().link_up);

        bed.hw.set_link(true);
        assert!(bed.fire());
        assert!(bed.driver.status().link_up);
    }

    #[test]
    fn test_spurious_interrupt() {
        let bed = started(8);
        assert!(!bed.fire());
    }

    #[test]
    fn test_drop_detaches() {
        let bed = started(8);
        let Bed {
            fake,
            hw,
            line,
            pool,
            driver,
        } = bed;

        drop(driver);
        assert_eq!(fake.irq.attached(line), None);
        assert_eq!(pool.counts().lent, 0);
        assert_eq!(hw.peek(Registers::IMS), 0);
        // Only the pool is left.
        assert_eq!(fake.pages.live_pages(), pool.len());
    }

    #[test]
    fn test_probe() {
        let fake = FakePlatform::new();
        FakeE1000::plug(&fake, 0, MAC);
        FakeE1000::plug(&fake, 1, MAC);
        let other = PciFunction::new(0, 5, 0, 0x10EC, 0x8139);
        fake.pci.add(other, 9, Arc::new(FakeE1000::new(fake.pages.clone(), MAC)));

        let drivers = E1000::probe(&fake.platform());
        assert_eq!(drivers.len(), 2);
        assert_eq!(drivers[1].function().device, 4);
    }
}
