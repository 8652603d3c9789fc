//! Descriptor rings and the buffers the hardware owns through them.

use alloc::{boxed::Box, sync::Arc, vec};
use core::marker::PhantomData;
use driver_api::{
    DriverResult,
    mem::{DmaRegion, PageAllocator},
};
use netmux_core::{PhysAddr, mem::pages_for, net::DbufToken};

/// Descriptors per hardware ring for a queue of `depth` buffers.
///
/// One descriptor always stays empty: the hardware reads `head == tail` as
/// an empty ring. Ring lengths must be multiples of 128 bytes, i.e. of 8
/// descriptors.
#[must_use]
pub const fn ring_len(depth: usize) -> usize {
    (depth + 1).next_multiple_of(8)
}

/// Descriptor array shared with the device.
pub struct DescRing<D> {
    region: DmaRegion,
    len: usize,
    _desc: PhantomData<D>,
}

impl<D: Copy + Default> DescRing<D> {
    pub fn alloc(pages: &Arc<dyn PageAllocator>, len: usize) -> DriverResult<Self> {
        let region = DmaRegion::alloc(pages, pages_for(len * size_of::<D>()))?;
        Ok(Self {
            region,
            len,
            _desc: PhantomData,
        })
    }

    #[must_use]
    #[inline]
    pub const fn paddr(&self) -> PhysAddr {
        self.region.paddr()
    }

    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    #[inline]
    /// Value programmed into the `*DLEN` register.
    pub fn byte_len(&self) -> u32 {
        // Rings are a few pages at most.
        #[allow(clippy::cast_possible_truncation)]
        let len = (self.len * size_of::<D>()) as u32;
        len
    }

    #[inline]
    fn slot(&self, index: usize) -> *mut D {
        assert!(index < self.len);
        // Safety: in bounds of the region, checked above.
        unsafe { self.region.vaddr().as_mut_ptr::<D>().add(index) }
    }

    #[must_use]
    #[inline]
    pub fn read(&self, index: usize) -> D {
        // Safety: the device writes descriptors back concurrently.
        unsafe { self.slot(index).read_volatile() }
    }

    #[inline]
    pub fn write(&self, index: usize, desc: D) {
        // Safety: see `read`.
        unsafe { self.slot(index).write_volatile(desc) };
    }

    pub fn clear(&self) {
        for index in 0..self.len {
            self.write(index, D::default());
        }
    }
}

/// Software side of a ring: which buffer sits behind each descriptor.
///
/// Descriptors `clean..tail` are owned by the hardware, at most `depth` of
/// them at a time.
pub struct Ring<D> {
    pub descs: DescRing<D>,
    tokens: Box<[Option<DbufToken>]>,
    depth: usize,
    /// Next descriptor to hand to the hardware.
    tail: usize,
    /// Next descriptor to take back from the hardware.
    clean: usize,
    owned: usize,
}

impl<D: Copy + Default> Ring<D> {
    pub fn new(pages: &Arc<dyn PageAllocator>, depth: usize) -> DriverResult<Self> {
        assert!(depth > 0);
        let len = ring_len(depth);
        Ok(Self {
            descs: DescRing::alloc(pages, len)?,
            tokens: vec![None; len].into_boxed_slice(),
            depth,
            tail: 0,
            clean: 0,
            owned: 0,
        })
    }

    #[must_use]
    #[inline]
    pub const fn owned(&self) -> usize {
        self.owned
    }

    #[must_use]
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.owned == self.depth
    }

    #[must_use]
    #[inline]
    /// Value of the tail register.
    pub fn tail(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let tail = self.tail as u32;
        tail
    }

    /// Writes `desc` at the tail and records `token` behind it.
    pub fn push(&mut self, desc: D, token: DbufToken) {
        assert!(!self.is_full());
        debug_assert!(self.tokens[self.tail].is_none());
        self.descs.write(self.tail, desc);
        self.tokens[self.tail] = Some(token);
        self.tail = (self.tail + 1) % self.descs.len();
        self.owned += 1;
    }

    /// Takes back the oldest owned descriptor, unless the hardware still
    /// holds it (`head` is the hardware's head register).
    pub fn pop(&mut self, head: usize) -> Option<(D, DbufToken)> {
        if self.owned == 0 || self.clean == head % self.descs.len() {
            return None;
        }
        let desc = self.descs.read(self.clean);
        let token = self.tokens[self.clean].take()?;
        self.clean = (self.clean + 1) % self.descs.len();
        self.owned -= 1;
        Some((desc, token))
    }

    /// Takes back every buffer regardless of the hardware, once it is stopped.
    pub fn drain(&mut self, mut f: impl FnMut(DbufToken)) {
        while self.owned > 0 {
            if let Some(token) = self.tokens[self.clean].take() {
                f(token);
            }
            self.clean = (self.clean + 1) % self.descs.len();
            self.owned -= 1;
        }
        self.descs.clear();
        self.tail = 0;
        self.clean = 0;
    }
}
