//! Physical memory for DMA.

use crate::DriverResult;
use alloc::sync::Arc;
use netmux_core::{PhysAddr, VirtAddr, mem::PAGE_SIZE};

/// Physical page allocator.
pub trait PageAllocator: Send + Sync {
    /// Allocates `count` physically contiguous pages.
    fn alloc_pages(&self, count: usize) -> DriverResult<PhysAddr>;

    /// Returns pages to the allocator.
    ///
    /// # Safety
    ///
    /// `paddr` and `count` must come from a single `alloc_pages` call and the
    /// memory must no longer be accessed, by the CPU or by a device.
    unsafe fn free_pages(&self, paddr: PhysAddr, count: usize);

    /// Kernel mapping of a physical address.
    fn phys_to_kernel(&self, paddr: PhysAddr) -> VirtAddr;
}

/// Zeroed, physically contiguous memory that is released on drop.
///
/// The physical address never changes while the region lives, so it can be
/// handed to a device.
pub struct DmaRegion {
    paddr: PhysAddr,
    vaddr: VirtAddr,
    pages: usize,
    allocator: Arc<dyn PageAllocator>,
}

// Safety:
// The region is exclusively owned and only reachable through this struct.
unsafe impl Send for DmaRegion {}
unsafe impl Sync for DmaRegion {}

impl DmaRegion {
    pub fn alloc(allocator: &Arc<dyn PageAllocator>, pages: usize) -> DriverResult<Self> {
        assert!(pages > 0);
        let paddr = allocator.alloc_pages(pages)?;
        let vaddr = allocator.phys_to_kernel(paddr);

        // Safety:
        // The pages were just allocated and mapped, nobody else references them.
        unsafe { core::ptr::write_bytes(vaddr.as_mut_ptr::<u8>(), 0, pages * PAGE_SIZE) };

        Ok(Self {
            paddr,
            vaddr,
            pages,
            allocator: allocator.clone(),
        })
    }

    #[must_use]
    #[inline]
    pub const fn paddr(&self) -> PhysAddr {
        self.paddr
    }

    #[must_use]
    #[inline]
    pub const fn vaddr(&self) -> VirtAddr {
        self.vaddr
    }

    #[must_use]
    #[inline]
    pub const fn pages(&self) -> usize {
        self.pages
    }

    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.pages * PAGE_SIZE
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.pages == 0
    }
}

impl Drop for DmaRegion {
    fn drop(&mut self) {
        // Safety:
        // The region came from `alloc_pages` and the owner guarantees no DMA is
        // still targeting it when it is dropped.
        unsafe { self.allocator.free_pages(self.paddr, self.pages) };
    }
}

impl core::fmt::Debug for DmaRegion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DmaRegion")
            .field("paddr", &self.paddr)
            .field("vaddr", &self.vaddr)
            .field("pages", &self.pages)
            .finish_non_exhaustive()
    }
}
