//! Datagram buffers.
//!
//! A `BufferPool` owns a fixed set of page-backed buffers, each holding one frame,
//! and moves them between three FIFO queues:
//!
//! - `free`: empty buffers, claimed by the driver for receive or by a client for transmit,
//! - `rx`: received frames waiting for a client,
//! - `tx`: filled buffers staged for a driver that is not running.
//!
//! A buffer out of every queue is *lent*: claimed by somebody, or posted to a
//! hardware descriptor. Buffers are allocated when the pool is built and freed
//! when it is dropped, never in between.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc)]

extern crate alloc;

mod pool;
mod queue;
#[cfg(test)]
mod tests_prop;

pub use pool::{BufferPool, QueueCounts};

use netmux_core::{
    mem::PAGE_SIZE,
    net::{DbufInfo, NetError},
};
use thiserror::Error;

/// Buffers per pool unless the driver asks for something else.
pub const DEFAULT_POOL_BUFFERS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub buffers: usize,
    /// Pages backing each buffer.
    pub buf_pages: usize,
    /// Alignment of the payload within the buffer.
    pub buf_align: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buffers: DEFAULT_POOL_BUFFERS,
            buf_pages: 1,
            buf_align: 64,
        }
    }
}

impl PoolConfig {
    #[must_use]
    #[inline]
    /// Offset of the payload from the start of a buffer, past its header.
    pub const fn data_offset(&self) -> usize {
        netmux_core::mem::align_up(size_of::<DbufInfo>(), self.buf_align)
    }

    #[must_use]
    #[inline]
    /// Payload bytes each buffer can hold.
    pub const fn capacity(&self) -> usize {
        self.buf_pages * PAGE_SIZE - self.data_offset()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where a buffer is.
///
/// The state alone determines queue membership: `Free` buffers are in the free
/// queue, `Ready` ones in the queue of their direction, the others in none.
pub enum DbufState {
    Free,
    /// Holds a frame, `data_length` is valid.
    Ready(Direction),
    /// Lent to a driver or a client.
    Claimed,
    /// Posted to a hardware descriptor.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Invalid buffer handle")]
    InvalidHandle,
    #[error("Buffer is {found:?}")]
    BadState { found: DbufState },
    #[error("{length} bytes exceed the buffer capacity of {capacity}")]
    TooLong { length: usize, capacity: usize },
}

pub type PoolResult<T> = Result<T, PoolError>;

impl From<PoolError> for NetError {
    fn from(error: PoolError) -> Self {
        match error {
            PoolError::OutOfMemory => Self::OutOfMemory,
            PoolError::InvalidHandle => Self::InvalidHandle,
            PoolError::BadState { .. } | PoolError::TooLong { .. } => Self::InvalidArgument,
        }
    }
}
