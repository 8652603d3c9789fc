//! Page geometry.

/// Size of the pages handed out by the physical allocator.
pub const PAGE_SIZE: usize = 4096;

#[must_use]
#[inline]
/// Rounds `value` up to the next multiple of `align`.
///
/// `align` must be a power of two.
pub const fn align_up(value: usize, align: usize) -> usize {
    assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

#[must_use]
#[inline]
/// Number of pages needed to hold `bytes`.
pub const fn pages_for(bytes: usize) -> usize {
    bytes.div_ceil(PAGE_SIZE)
}
