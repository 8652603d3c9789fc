use crate::{
    DbufState, Direction, PoolConfig, PoolError, PoolResult,
    queue::{Link, Queue},
};
use alloc::{boxed::Box, sync::Arc, vec::Vec};
use driver_api::mem::{DmaRegion, PageAllocator};
use netmux_core::{
    PhysAddr,
    net::{DATAGRAM_HDR_MAGIC, DbufInfo, DbufToken},
};
use netmux_sync::IrqLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    state: DbufState,
    data_length: usize,
}

struct Queues {
    slots: Vec<Slot>,
    links: Vec<Link>,
    free: Queue,
    rx: Queue,
    tx: Queue,
}

impl Queues {
    /// Moves a buffer to `state`, linking it into the matching queue.
    fn enqueue(&mut self, index: u16, state: DbufState) {
        let Self {
            slots,
            links,
            free,
            rx,
            tx,
        } = self;

        slots[usize::from(index)].state = state;
        let queue = match state {
            DbufState::Free => free,
            DbufState::Ready(Direction::Rx) => rx,
            DbufState::Ready(Direction::Tx) => tx,
            DbufState::Claimed | DbufState::Pending => return,
        };
        queue.push_back(links, index);
    }

    /// Pops the head of the queue holding `state` buffers and claims it.
    fn dequeue(&mut self, state: DbufState) -> Option<u16> {
        let Self {
            slots,
            links,
            free,
            rx,
            tx,
        } = self;

        let queue = match state {
            DbufState::Free => free,
            DbufState::Ready(Direction::Rx) => rx,
            DbufState::Ready(Direction::Tx) => tx,
            DbufState::Claimed | DbufState::Pending => return None,
        };
        let index = queue.pop_front(links)?;
        debug_assert_eq!(slots[usize::from(index)].state, state);
        slots[usize::from(index)].state = DbufState::Claimed;
        Some(index)
    }

    fn require(&self, index: u16, allowed: &[DbufState]) -> PoolResult<&Slot> {
        let slot = &self.slots[usize::from(index)];
        if allowed.contains(&slot.state) {
            Ok(slot)
        } else {
            Err(PoolError::BadState { found: slot.state })
        }
    }
}

const LENT: &[DbufState] = &[DbufState::Claimed, DbufState::Pending];
const CLAIMED: &[DbufState] = &[DbufState::Claimed];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueCounts {
    pub free: usize,
    pub rx: usize,
    pub tx: usize,
    /// Buffers in no queue: claimed or posted to hardware.
    pub lent: usize,
}

impl QueueCounts {
    #[must_use]
    #[inline]
    pub const fn total(&self) -> usize {
        self.free + self.rx + self.tx + self.lent
    }
}

/// Fixed set of datagram buffers and their queues.
///
/// Every operation takes the queue lock for a single O(1) splice and never
/// calls into the page allocator, so it is safe from interrupt context.
/// The interrupt handler of a driver writes to `free` (transmit reclaim),
/// takes from `free` (receive refill), appends to `rx` (receive reclaim)
/// and drains `tx`.
pub struct BufferPool {
    buffers: Box<[DmaRegion]>,
    config: PoolConfig,
    queues: IrqLock<Queues>,
}

impl BufferPool {
    /// Allocates and zeroes `config.buffers` buffers, all free.
    ///
    /// On failure every buffer allocated so far is given back.
    pub fn new(pages: &Arc<dyn PageAllocator>, config: PoolConfig) -> PoolResult<Self> {
        assert!(config.buffers > 0 && config.buffers <= usize::from(u16::MAX) + 1);
        assert!(config.buf_pages > 0 && config.buf_align.is_power_of_two());
        assert!(config.data_offset() < config.buf_pages * netmux_core::mem::PAGE_SIZE);

        let mut buffers = Vec::with_capacity(config.buffers);
        for _ in 0..config.buffers {
            match DmaRegion::alloc(pages, config.buf_pages) {
                Ok(region) => buffers.push(region),
                Err(_) => {
                    log::warn!(
                        "dbuf: out of memory after {} of {} buffers",
                        buffers.len(),
                        config.buffers
                    );
                    return Err(PoolError::OutOfMemory);
                }
            }
        }

        let mut queues = Queues {
            slots: Vec::with_capacity(config.buffers),
            links: alloc::vec![Link::Unlinked; config.buffers],
            free: Queue::new(),
            rx: Queue::new(),
            tx: Queue::new(),
        };
        let pool_buffers = buffers.into_boxed_slice();
        for index in 0..config.buffers {
            // Bounded by the assertion above.
            #[allow(clippy::cast_possible_truncation)]
            let index = index as u16;
            queues.slots.push(Slot {
                state: DbufState::Free,
                data_length: 0,
            });
            queues.enqueue(index, DbufState::Free);
        }

        let pool = Self {
            buffers: pool_buffers,
            config,
            queues: IrqLock::new(queues),
        };
        for index in 0..pool.buffers.len() {
            pool.stamp(index, 0);
        }

        log::debug!(
            "dbuf: {} buffer(s) of {} bytes ready",
            config.buffers,
            config.capacity()
        );
        Ok(pool)
    }

    #[must_use]
    #[inline]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[must_use]
    #[inline]
    /// Payload bytes each buffer can hold.
    pub const fn buf_capacity(&self) -> usize {
        self.config.capacity()
    }

    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    #[inline]
    fn header(&self, index: usize) -> *mut DbufInfo {
        self.buffers[index].vaddr().as_mut_ptr()
    }

    #[inline]
    fn payload(&self, index: usize) -> *mut u8 {
        // Safety: `data_offset` is within the region, checked in `new`.
        unsafe {
            self.buffers[index]
                .vaddr()
                .as_mut_ptr::<u8>()
                .add(self.config.data_offset())
        }
    }

    fn stamp(&self, index: usize, data_length: usize) {
        #[allow(clippy::cast_possible_truncation)]
        let info = DbufInfo {
            magic: DATAGRAM_HDR_MAGIC,
            index: index as u16,
            data_offset: self.config.data_offset() as u32,
            data_length: data_length as u32,
            capacity: self.config.capacity() as u32,
        };
        // Safety: the header sits at the page-aligned start of the region.
        unsafe { self.header(index).write(info) };
    }

    fn check(&self, token: DbufToken) -> Option<u16> {
        let index = token.index();
        if token.magic() != DATAGRAM_HDR_MAGIC || usize::from(index) >= self.buffers.len() {
            return None;
        }
        // Header writes happen under the lock, and may come from the
        // interrupt handler while a client validates the same buffer.
        // Safety: in bounds, checked just above.
        let magic = self
            .queues
            .with_locked(|_| unsafe { self.header(usize::from(index)).read() }.magic);
        (magic == DATAGRAM_HDR_MAGIC).then_some(index)
    }

    fn validate(&self, token: DbufToken) -> PoolResult<u16> {
        let index = self.check(token);
        debug_assert!(index.is_some(), "invalid dbuf handle {token:?}");
        index.ok_or(PoolError::InvalidHandle)
    }

    #[inline]
    fn token(index: u16) -> DbufToken {
        DbufToken::new(DATAGRAM_HDR_MAGIC, index)
    }

    #[must_use]
    /// Whether `token` names a buffer of this pool.
    ///
    /// Unlike the other operations, a bad token is not treated as a bug.
    pub fn contains(&self, token: DbufToken) -> bool {
        self.check(token).is_some()
    }

    #[must_use]
    /// Claims the head of the free queue.
    ///
    /// `None` means the pool is exhausted for now, not an error.
    pub fn acquire_free(&self) -> Option<DbufToken> {
        self.queues
            .with_locked(|queues| queues.dequeue(DbufState::Free))
            .map(Self::token)
    }

    /// Returns a lent buffer to the free queue.
    pub fn release_to_free(&self, token: DbufToken) -> PoolResult<()> {
        let index = self.validate(token)?;
        self.queues.with_locked(|queues| {
            queues.require(index, LENT)?;
            queues.slots[usize::from(index)].data_length = 0;
            self.stamp(usize::from(index), 0);
            queues.enqueue(index, DbufState::Free);
            Ok(())
        })
    }

    /// Queues a received frame of `length` bytes for clients.
    pub fn publish_rx(&self, token: DbufToken, length: usize) -> PoolResult<()> {
        self.publish(token, length, Direction::Rx, LENT)
    }

    /// Stages a filled buffer for transmission.
    pub fn publish_tx(&self, token: DbufToken, length: usize) -> PoolResult<()> {
        self.publish(token, length, Direction::Tx, CLAIMED)
    }

    fn publish(
        &self,
        token: DbufToken,
        length: usize,
        direction: Direction,
        allowed: &[DbufState],
    ) -> PoolResult<()> {
        let index = self.validate(token)?;
        let capacity = self.buf_capacity();
        if length > capacity {
            return Err(PoolError::TooLong { length, capacity });
        }

        self.queues.with_locked(|queues| {
            queues.require(index, allowed)?;
            queues.slots[usize::from(index)].data_length = length;
            self.stamp(usize::from(index), length);
            queues.enqueue(index, DbufState::Ready(direction));
            Ok(())
        })
    }

    #[must_use]
    /// Claims the oldest received frame.
    pub fn take_rx(&self) -> Option<DbufToken> {
        self.queues
            .with_locked(|queues| queues.dequeue(DbufState::Ready(Direction::Rx)))
            .map(Self::token)
    }

    #[must_use]
    /// Claims the oldest staged transmit buffer.
    pub fn take_tx(&self) -> Option<DbufToken> {
        self.queues
            .with_locked(|queues| queues.dequeue(DbufState::Ready(Direction::Tx)))
            .map(Self::token)
    }

    #[must_use]
    /// Moves the head of the free queue straight to a hardware descriptor.
    pub fn acquire_pending(&self) -> Option<DbufToken> {
        self.post(DbufState::Free)
    }

    #[must_use]
    /// Moves the oldest staged transmit buffer straight to a hardware descriptor.
    pub fn take_tx_pending(&self) -> Option<DbufToken> {
        self.post(DbufState::Ready(Direction::Tx))
    }

    fn post(&self, from: DbufState) -> Option<DbufToken> {
        self.queues
            .with_locked(|queues| {
                let index = queues.dequeue(from)?;
                queues.enqueue(index, DbufState::Pending);
                Some(index)
            })
            .map(Self::token)
    }

    /// Records that a claimed buffer now belongs to a hardware descriptor.
    pub fn mark_pending(&self, token: DbufToken) -> PoolResult<()> {
        let index = self.validate(token)?;
        self.queues.with_locked(|queues| {
            queues.require(index, CLAIMED)?;
            queues.enqueue(index, DbufState::Pending);
            Ok(())
        })
    }

    pub fn state(&self, token: DbufToken) -> PoolResult<DbufState> {
        let index = self.validate(token)?;
        Ok(self
            .queues
            .with_locked(|queues| queues.slots[usize::from(index)].state))
    }

    /// DMA address of the payload.
    pub fn paddr(&self, token: DbufToken) -> PoolResult<PhysAddr> {
        let index = self.validate(token)?;
        Ok(self.buffers[usize::from(index)].paddr() + self.config.data_offset() as u64)
    }

    pub fn data_length(&self, token: DbufToken) -> PoolResult<usize> {
        let index = self.validate(token)?;
        Ok(self
            .queues
            .with_locked(|queues| queues.slots[usize::from(index)].data_length))
    }

    /// Sets the frame length of a claimed buffer.
    pub fn set_data_length(&self, token: DbufToken, length: usize) -> PoolResult<()> {
        let index = self.validate(token)?;
        let capacity = self.buf_capacity();
        if length > capacity {
            return Err(PoolError::TooLong { length, capacity });
        }

        self.queues.with_locked(|queues| {
            queues.require(index, CLAIMED)?;
            queues.slots[usize::from(index)].data_length = length;
            self.stamp(usize::from(index), length);
            Ok(())
        })
    }

    /// Header of a buffer, as a client sees it.
    pub fn info(&self, token: DbufToken) -> PoolResult<DbufInfo> {
        let index = self.validate(token)?;
        // Header writes happen under the lock.
        Ok(self
            .queues
            .with_locked(|_| unsafe { self.header(usize::from(index)).read() }))
    }

    /// Copies the frame of a claimed buffer into `out`, returns the bytes copied.
    pub fn read(&self, token: DbufToken, out: &mut [u8]) -> PoolResult<usize> {
        let index = self.validate(token)?;
        self.queues.with_locked(|queues| {
            let slot = queues.require(index, CLAIMED)?;
            let count = slot.data_length.min(out.len());
            // Safety: `count <= data_length <= capacity`, and the caller owns the buffer.
            unsafe {
                core::ptr::copy_nonoverlapping(
                    self.payload(usize::from(index)),
                    out.as_mut_ptr(),
                    count,
                );
            }
            Ok(count)
        })
    }

    /// Fills a claimed buffer with `data` and sets its length.
    pub fn write(&self, token: DbufToken, data: &[u8]) -> PoolResult<()> {
        let index = self.validate(token)?;
        let capacity = self.buf_capacity();
        if data.len() > capacity {
            return Err(PoolError::TooLong {
                length: data.len(),
                capacity,
            });
        }

        self.queues.with_locked(|queues| {
            queues.require(index, CLAIMED)?;
            // Safety: `data.len() <= capacity`, and the caller owns the buffer.
            unsafe {
                core::ptr::copy_nonoverlapping(
                    data.as_ptr(),
                    self.payload(usize::from(index)),
                    data.len(),
                );
            }
            queues.slots[usize::from(index)].data_length = data.len();
            self.stamp(usize::from(index), data.len());
            Ok(())
        })
    }

    #[must_use]
    pub fn counts(&self) -> QueueCounts {
        self.queues.with_locked(|queues| {
            let free = queues.free.len();
            let rx = queues.rx.len();
            let tx = queues.tx.len();
            QueueCounts {
                free,
                rx,
                tx,
                lent: queues.slots.len() - free - rx - tx,
            }
        })
    }

    #[cfg(test)]
    /// Asserts that queues and states agree and partition the buffers.
    pub(crate) fn check_partition(&self) {
        self.queues.with_locked(|queues| {
            let mut seen = alloc::vec![false; queues.slots.len()];
            for (queue, state) in [
                (&queues.free, DbufState::Free),
                (&queues.rx, DbufState::Ready(Direction::Rx)),
                (&queues.tx, DbufState::Ready(Direction::Tx)),
            ] {
                let mut walked = 0;
                for index in queue.iter(&queues.links) {
                    let index = usize::from(index);
                    assert!(!seen[index], "buffer {index} is in two queues");
                    assert_eq!(queues.slots[index].state, state);
                    seen[index] = true;
                    walked += 1;
                }
                assert_eq!(walked, queue.len());
            }
            for (index, slot) in queues.slots.iter().enumerate() {
                if !seen[index] {
                    assert!(
                        matches!(slot.state, DbufState::Claimed | DbufState::Pending),
                        "buffer {index} is {:?} but in no queue",
                        slot.state
                    );
                    assert_eq!(queues.links[index], Link::Unlinked);
                }
            }
        });
    }

    #[cfg(test)]
    pub(crate) fn free_order(&self) -> Vec<u16> {
        self.queues
            .with_locked(|queues| queues.free.iter(&queues.links).collect())
    }
}
