//! Register-level model of an 82540EM.
//!
//! The model follows the descriptor rings the driver programs through DMA
//! memory. Nothing happens on its own: tests move the hardware forward with
//! `complete_tx`, `receive` and `set_link`, then deliver the interrupt through
//! `FakeIrq::fire`.

use crate::{
    E1000_82540EM, INTEL_VENDOR_ID,
    descriptors::{RxDescriptor, TxDescriptor},
    registers::{CtrlFlags, EecdFlags, IntFlags, RahFlags, RctlFlags, Registers, StatusFlags, TctlFlags},
};
use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use driver_api::{mem::PageAllocator, pci::PciFunction, regs::RegisterBus, testing::FakePlatform};
use netmux_core::PhysAddr;
use netmux_sync::IrqLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(usize),
    Write(usize, u32),
}

struct Model {
    regs: BTreeMap<usize, u32>,
    mac: [u8; 6],
    link_up: bool,
    stall_reset: bool,
    resets: usize,
    journal: Vec<Access>,
    transmitted: Vec<Vec<u8>>,
}

impl Model {
    fn reg(&self, offset: usize) -> u32 {
        self.regs.get(&offset).copied().unwrap_or(0)
    }

    /// Power-on values, EEPROM already loaded.
    fn reset(&mut self) {
        self.regs.clear();
        self.regs.insert(Registers::EECD, EecdFlags::AUTO_RD);
        let [a, b, c, d, e, f] = self.mac;
        self.regs
            .insert(Registers::RAL0, u32::from_le_bytes([a, b, c, d]));
        self.regs.insert(
            Registers::RAH0,
            u32::from_le_bytes([e, f, 0, 0]) | RahFlags::AV,
        );
    }

    fn raise(&mut self, cause: u32) {
        *self.regs.entry(Registers::ICR).or_default() |= cause;
    }

    fn ring(&self, bal: usize, bah: usize, len: usize) -> (PhysAddr, usize) {
        let base = u64::from(self.reg(bah)) << 32 | u64::from(self.reg(bal));
        (PhysAddr::new(base), self.reg(len) as usize / 16)
    }
}

pub struct FakeE1000 {
    pages: Arc<dyn PageAllocator>,
    model: IrqLock<Model>,
}

impl FakeE1000 {
    #[must_use]
    pub fn new(pages: Arc<dyn PageAllocator>, mac: [u8; 6]) -> Self {
        let mut model = Model {
            regs: BTreeMap::new(),
            mac,
            link_up: true,
            stall_reset: false,
            resets: 0,
            journal: Vec::new(),
            transmitted: Vec::new(),
        };
        model.reset();
        Self {
            pages,
            model: IrqLock::new(model),
        }
    }

    /// Plugs an adapter into `fake` as PCI device `3 + slot` on line `11 + slot`.
    pub fn plug(fake: &FakePlatform, slot: u8, mac: [u8; 6]) -> (Arc<Self>, PciFunction, u8) {
        let hw = Arc::new(Self::new(fake.pages.clone(), mac));
        let function = PciFunction::new(0, 3 + slot, 0, INTEL_VENDOR_ID, E1000_82540EM);
        let line = 11 + slot;
        fake.pci.add(function, line, hw.clone());
        (hw, function, line)
    }

    /// Keeps `CTRL.RST` set forever.
    pub fn stall_reset(&self) {
        self.model.with_locked(|model| model.stall_reset = true);
    }

    #[must_use]
    pub fn resets(&self) -> usize {
        self.model.with_locked(|model| model.resets)
    }

    #[must_use]
    /// Every register access so far, in order.
    pub fn journal(&self) -> Vec<Access> {
        self.model.with_locked(|model| model.journal.clone())
    }

    #[must_use]
    /// Reads a register without side effects.
    pub fn peek(&self, offset: usize) -> u32 {
        self.model.with_locked(|model| match offset {
            Registers::STATUS if model.link_up => StatusFlags::LU,
            _ => model.reg(offset),
        })
    }

    #[must_use]
    /// Frames put on the wire so far.
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.model.with_locked(|model| model.transmitted.clone())
    }

    #[must_use]
    /// Whether an unmasked cause is pending.
    pub fn interrupt_pending(&self) -> bool {
        self.peek(Registers::ICR) & self.peek(Registers::IMS) != 0
    }

    fn ptr<T>(&self, paddr: PhysAddr) -> *mut T {
        self.pages.phys_to_kernel(paddr).as_mut_ptr()
    }

    /// Sends up to `count` frames from the transmit ring, returns how many.
    pub fn complete_tx(&self, count: usize) -> usize {
        self.model.with_locked(|model| {
            let (base, len) = model.ring(Registers::TDBAL, Registers::TDBAH, Registers::TDLEN);
            if len == 0 || model.reg(Registers::TCTL) & TctlFlags::EN == 0 {
                return 0;
            }

            let tail = model.reg(Registers::TDT) as usize;
            let mut head = model.reg(Registers::TDH) as usize;
            let mut done = 0;
            while done < count && head != tail {
                let slot = self.ptr::<TxDescriptor>(base + (head * 16) as u64);
                // Safety: the driver programmed this ring into the registers.
                let mut desc = unsafe { slot.read_volatile() };
                let frame = self.ptr::<u8>(PhysAddr::new(desc.buffer_addr()));
                // Safety: the descriptor points into a live pool buffer.
                let bytes =
                    unsafe { core::slice::from_raw_parts(frame, usize::from(desc.length())) };
                model.transmitted.push(bytes.to_vec());

                if desc.reports_status() {
                    desc.complete();
                    // Safety: as above.
                    unsafe { slot.write_volatile(desc) };
                }
                head = (head + 1) % len;
                done += 1;
            }

            #[allow(clippy::cast_possible_truncation)]
            let head_reg = head as u32;
            model.regs.insert(Registers::TDH, head_reg);
            if done > 0 {
                model.raise(IntFlags::TXDW);
                if head == tail {
                    model.raise(IntFlags::TXQE);
                }
            }
            done
        })
    }

    /// Writes `frame` into the next receive buffer.
    ///
    /// Returns `false` when the driver left no descriptor to the hardware, in
    /// which case the frame is lost and `RXO` is raised.
    pub fn receive(&self, frame: &[u8]) -> bool {
        self.model.with_locked(|model| {
            let (base, len) = model.ring(Registers::RDBAL, Registers::RDBAH, Registers::RDLEN);
            if len == 0 || model.reg(Registers::RCTL) & RctlFlags::EN == 0 {
                return false;
            }

            let head = model.reg(Registers::RDH) as usize;
            if head == model.reg(Registers::RDT) as usize {
                model.raise(IntFlags::RXO);
                return false;
            }

            let slot = self.ptr::<RxDescriptor>(base + (head * 16) as u64);
            // Safety: the driver programmed this ring into the registers.
            let mut desc = unsafe { slot.read_volatile() };
            let buffer = self.ptr::<u8>(PhysAddr::new(desc.buffer_addr()));
            // Safety: the descriptor points into a live pool buffer of at
            // least 2 KiB, per RCTL.BSIZE.
            unsafe { core::ptr::copy_nonoverlapping(frame.as_ptr(), buffer, frame.len()) };
            desc.complete(u16::try_from(frame.len()).unwrap());
            // Safety: as above.
            unsafe { slot.write_volatile(desc) };

            #[allow(clippy::cast_possible_truncation)]
            let head_reg = ((head + 1) % len) as u32;
            model.regs.insert(Registers::RDH, head_reg);
            model.raise(IntFlags::RXT0);
            true
        })
    }

    pub fn set_link(&self, up: bool) {
        self.model.with_locked(|model| {
            model.link_up = up;
            model.raise(IntFlags::LSC);
        });
    }
}

impl RegisterBus for FakeE1000 {
    fn read32(&self, offset: usize) -> u32 {
        self.model.with_locked(|model| {
            model.journal.push(Access::Read(offset));
            match offset {
                Registers::ICR => model.regs.remove(&Registers::ICR).unwrap_or(0),
                Registers::STATUS if model.link_up => StatusFlags::LU,
                _ => model.reg(offset),
            }
        })
    }

    fn write32(&self, offset: usize, value: u32) {
        self.model.with_locked(|model| {
            model.journal.push(Access::Write(offset, value));
            match offset {
                Registers::CTRL if value & CtrlFlags::RST != 0 && !model.stall_reset => {
                    model.resets += 1;
                    model.reset();
                }
                Registers::IMS => *model.regs.entry(Registers::IMS).or_default() |= value,
                Registers::IMC => *model.regs.entry(Registers::IMS).or_default() &= !value,
                Registers::ICS => model.raise(value),
                _ => {
                    model.regs.insert(offset, value);
                }
            }
        });
    }
}
