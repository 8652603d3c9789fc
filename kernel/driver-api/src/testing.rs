//! Host fakes of the platform collaborators.
//!
//! Physical memory is host heap memory, identity-mapped: a "physical" address
//! is the address of the allocation, so a fake device model can follow the
//! DMA addresses a driver programs.

use crate::{
    Delay, DriverError, DriverResult, Platform,
    device::{DeviceFlags, DeviceFramework, DeviceHandle},
    irq::{InterruptController, InterruptHandle, InterruptHandler, IrqPriority},
    mem::PageAllocator,
    pci::{Bar, PciBus, PciEnable, PciFunction, PciResources},
    principal::{Capability, Principal},
    regs::RegisterBus,
};
use alloc::{
    alloc::{Layout, alloc_zeroed, dealloc},
    collections::BTreeMap,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use netmux_core::{PhysAddr, VirtAddr, mem::PAGE_SIZE};
use netmux_sync::IrqLock;

fn page_layout(count: usize) -> Layout {
    Layout::from_size_align(count * PAGE_SIZE, PAGE_SIZE).unwrap()
}

#[derive(Default)]
struct PagesState {
    live: BTreeMap<u64, usize>,
    fail_after: Option<usize>,
}

#[derive(Default)]
/// Counting page allocator with failure injection.
pub struct FakePages {
    state: IrqLock<PagesState>,
    allocs: AtomicUsize,
    frees: AtomicUsize,
}

impl FakePages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets the next `successes` allocations through, then fails every later one.
    pub fn fail_after(&self, successes: usize) {
        self.state.with_locked(|state| state.fail_after = Some(successes));
    }

    pub fn stop_failing(&self) {
        self.state.with_locked(|state| state.fail_after = None);
    }

    #[must_use]
    /// Calls to `alloc_pages`, failed ones included.
    pub fn alloc_calls(&self) -> usize {
        self.allocs.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn free_calls(&self) -> usize {
        self.frees.load(Ordering::Relaxed)
    }

    #[must_use]
    /// Pages currently allocated.
    pub fn live_pages(&self) -> usize {
        self.state.with_locked(|state| state.live.values().sum())
    }
}

impl PageAllocator for FakePages {
    fn alloc_pages(&self, count: usize) -> DriverResult<PhysAddr> {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        self.state.with_locked(|state| {
            if let Some(remaining) = state.fail_after.as_mut() {
                if *remaining == 0 {
                    return Err(DriverError::OutOfMemory);
                }
                *remaining -= 1;
            }

            let ptr = unsafe { alloc_zeroed(page_layout(count)) };
            if ptr.is_null() {
                return Err(DriverError::OutOfMemory);
            }
            state.live.insert(ptr as u64, count);
            Ok(PhysAddr::new(ptr as u64))
        })
    }

    unsafe fn free_pages(&self, paddr: PhysAddr, count: usize) {
        self.frees.fetch_add(1, Ordering::Relaxed);
        self.state.with_locked(|state| {
            let recorded = state.live.remove(&paddr.as_u64());
            assert_eq!(recorded, Some(count), "freeing unknown pages {paddr:?}");
        });
        unsafe { dealloc(paddr.as_u64() as *mut u8, page_layout(count)) };
    }

    fn phys_to_kernel(&self, paddr: PhysAddr) -> VirtAddr {
        VirtAddr::new(paddr.as_u64())
    }
}

impl Drop for FakePages {
    fn drop(&mut self) {
        for (&addr, &count) in &self.state.get_mut().live {
            unsafe { dealloc(addr as *mut u8, page_layout(count)) };
        }
    }
}

struct FakeFunction {
    function: PciFunction,
    resources: PciResources,
    bus: Arc<dyn RegisterBus>,
    enabled: PciEnable,
}

#[derive(Default)]
pub struct FakePci {
    functions: IrqLock<Vec<FakeFunction>>,
}

impl FakePci {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugs a function whose BAR0 is served by `bus`.
    pub fn add(&self, function: PciFunction, irq_line: u8, bus: Arc<dyn RegisterBus>) {
        let mut bars = [None; 6];
        bars[0] = Some(Bar {
            base: PhysAddr::new(0xfebc_0000 + u64::from(irq_line) * 0x2_0000),
            size: 0x2_0000,
        });
        self.functions.with_locked(|functions| {
            functions.push(FakeFunction {
                function,
                resources: PciResources { bars, irq_line },
                bus,
                enabled: PciEnable::default(),
            });
        });
    }

    #[must_use]
    pub fn enabled(&self, function: &PciFunction) -> PciEnable {
        self.functions.with_locked(|functions| {
            functions
                .iter()
                .find(|f| f.function == *function)
                .map_or_else(PciEnable::default, |f| f.enabled)
        })
    }
}

impl PciBus for FakePci {
    fn enumerate(&self, filter: &dyn Fn(&PciFunction) -> bool) -> Vec<PciFunction> {
        self.functions.with_locked(|functions| {
            functions
                .iter()
                .map(|f| f.function)
                .filter(|f| filter(f))
                .collect()
        })
    }

    fn configure(&self, function: &PciFunction) -> DriverResult<PciResources> {
        self.functions.with_locked(|functions| {
            functions
                .iter()
                .find(|f| f.function == *function)
                .map(|f| f.resources)
                .ok_or(DriverError::Absent)
        })
    }

    fn enable(&self, function: &PciFunction, flags: PciEnable) -> DriverResult<()> {
        self.functions.with_locked(|functions| {
            let f = functions
                .iter_mut()
                .find(|f| f.function == *function)
                .ok_or(DriverError::Absent)?;
            f.enabled = f.enabled | flags;
            Ok(())
        })
    }

    fn map_bar(&self, function: &PciFunction, bar: &Bar) -> DriverResult<Arc<dyn RegisterBus>> {
        self.functions.with_locked(|functions| {
            let f = functions
                .iter()
                .find(|f| f.function == *function)
                .ok_or(DriverError::Absent)?;
            if f.resources.bars[0] == Some(*bar) {
                Ok(f.bus.clone())
            } else {
                Err(DriverError::Invalid)
            }
        })
    }
}

struct Attachment {
    line: u8,
    priority: IrqPriority,
    handler: Arc<dyn InterruptHandler>,
}

#[derive(Default)]
/// Interrupt controller whose lines are raised by hand.
pub struct FakeIrq {
    slots: IrqLock<Vec<Option<Attachment>>>,
}

impl FakeIrq {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers an interrupt on `line`, returns whether a handler claimed it.
    pub fn fire(&self, line: u8) -> bool {
        let handlers = self.slots.with_locked(|slots| {
            slots
                .iter()
                .flatten()
                .filter(|a| a.line == line)
                .map(|a| a.handler.clone())
                .collect::<Vec<_>>()
        });
        // Handlers run outside the controller lock, as they would on hardware.
        handlers
            .iter()
            .fold(false, |claimed, handler| handler.handle() | claimed)
    }

    #[must_use]
    pub fn attached(&self, line: u8) -> Option<IrqPriority> {
        self.slots.with_locked(|slots| {
            slots
                .iter()
                .flatten()
                .find(|a| a.line == line)
                .map(|a| a.priority)
        })
    }
}

impl InterruptController for FakeIrq {
    fn attach(
        &self,
        line: u8,
        priority: IrqPriority,
        handler: Arc<dyn InterruptHandler>,
    ) -> DriverResult<InterruptHandle> {
        self.slots.with_locked(|slots| {
            slots.push(Some(Attachment {
                line,
                priority,
                handler,
            }));
            let raw = u32::try_from(slots.len() - 1).map_err(|_| DriverError::Unknown)?;
            Ok(InterruptHandle::new(raw))
        })
    }

    fn detach(&self, handle: InterruptHandle) {
        self.slots.with_locked(|slots| {
            if let Some(slot) = slots.get_mut(handle.as_u32() as usize) {
                *slot = None;
            }
        });
    }
}

struct DeviceEntry {
    name: String,
    flags: DeviceFlags,
    live: bool,
}

#[derive(Default)]
/// Records created and destroyed device files.
pub struct FakeDevices {
    devices: IrqLock<Vec<DeviceEntry>>,
    refuse: IrqLock<Option<String>>,
}

impl FakeDevices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create_device` fail for `name`.
    pub fn refuse(&self, name: &str) {
        self.refuse.with_locked(|refuse| *refuse = Some(name.to_string()));
    }

    #[must_use]
    /// Names of the devices currently alive, in creation order.
    pub fn live(&self) -> Vec<String> {
        self.devices.with_locked(|devices| {
            devices
                .iter()
                .filter(|d| d.live)
                .map(|d| d.name.clone())
                .collect()
        })
    }

    #[must_use]
    pub fn flags(&self, name: &str) -> Option<DeviceFlags> {
        self.devices.with_locked(|devices| {
            devices
                .iter()
                .rev()
                .find(|d| d.name == name)
                .map(|d| d.flags)
        })
    }

    #[must_use]
    /// Devices destroyed so far.
    pub fn destroyed(&self) -> usize {
        self.devices
            .with_locked(|devices| devices.iter().filter(|d| !d.live).count())
    }
}

impl DeviceFramework for FakeDevices {
    fn create_device(&self, name: &str, flags: DeviceFlags) -> DriverResult<DeviceHandle> {
        if self
            .refuse
            .with_locked(|refuse| refuse.as_deref() == Some(name))
        {
            return Err(DriverError::Unknown);
        }
        self.devices.with_locked(|devices| {
            devices.push(DeviceEntry {
                name: name.to_string(),
                flags,
                live: true,
            });
            let raw = u32::try_from(devices.len() - 1).map_err(|_| DriverError::Unknown)?;
            Ok(DeviceHandle::new(raw))
        })
    }

    fn destroy_device(&self, device: DeviceHandle) {
        self.devices.with_locked(|devices| {
            let entry = &mut devices[device.as_u32() as usize];
            assert!(entry.live, "device {} destroyed twice", entry.name);
            entry.live = false;
        });
    }
}

#[derive(Debug, Default)]
/// Returns immediately, accounting the requested time.
pub struct NoDelay {
    waited: AtomicU64,
}

impl NoDelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn waited_us(&self) -> u64 {
        self.waited.load(Ordering::Relaxed)
    }
}

impl Delay for NoDelay {
    fn delay_us(&self, micros: u32) {
        self.waited.fetch_add(u64::from(micros), Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caps {
    network: bool,
}

impl Caps {
    pub const NETWORK: Self = Self { network: true };
    pub const NONE: Self = Self { network: false };
}

impl Principal for Caps {
    fn has_capability(&self, capability: Capability) -> bool {
        match capability {
            Capability::Network => self.network,
        }
    }
}

/// Every fake, bundled.
pub struct FakePlatform {
    pub pages: Arc<FakePages>,
    pub pci: Arc<FakePci>,
    pub irq: Arc<FakeIrq>,
    pub devices: Arc<FakeDevices>,
    pub delay: Arc<NoDelay>,
}

impl FakePlatform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages: Arc::new(FakePages::new()),
            pci: Arc::new(FakePci::new()),
            irq: Arc::new(FakeIrq::new()),
            devices: Arc::new(FakeDevices::new()),
            delay: Arc::new(NoDelay::new()),
        }
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        Platform {
            pages: self.pages.clone(),
            pci: self.pci.clone(),
            irq: self.irq.clone(),
            devices: self.devices.clone(),
            delay: self.delay.clone(),
        }
    }
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}
