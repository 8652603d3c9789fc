//! Synchronization primitives shared between interrupt handlers and
//! control-request context.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]

pub mod locks;

pub use locks::{BackOff, DefaultMask, InterruptMask, Spin, Unmasked, irq::IrqLock};
