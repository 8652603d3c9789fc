//! Locks related utilities.
//!
//! ## Back-off Strategy
//!
//! `BackOff` defines how a waiting CPU behaves while the lock is contended.
//! The default, `Spin`, is a spin-wait loop.
//!
//! ## Interrupt masking
//!
//! `InterruptMask` defines how the local interrupt state is saved, disabled and
//! restored around a critical section. The kernel plugs its own implementation
//! (e.g. `cli`/`popf` on x86_64). `Unmasked` does nothing and is what host
//! builds use, where "interrupts" are delivered by ordinary threads.
//! `DefaultMask` picks `LocalIrq` on bare-metal x86_64 and `Unmasked` elsewhere.

pub mod irq;

/// A trait that defines a back-off strategy for locks.
pub trait BackOff {
    /// Performs the back-off operation.
    fn back_off();
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// A back-off strategy that uses a spin-wait loop.
pub struct Spin;

impl BackOff for Spin {
    #[inline]
    fn back_off() {
        core::hint::spin_loop();
    }
}

/// Local interrupt masking.
pub trait InterruptMask {
    /// Interrupt state saved by `save_and_disable`.
    type State;

    /// Disables local interrupts and returns the previous state.
    fn save_and_disable() -> Self::State;

    /// Restores a state returned by `save_and_disable`.
    fn restore(state: Self::State);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Leaves interrupts untouched.
pub struct Unmasked;

impl InterruptMask for Unmasked {
    type State = ();

    #[inline]
    fn save_and_disable() -> Self::State {}

    #[inline]
    fn restore((): Self::State) {}
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Clears and restores the IF flag of the current core.
pub struct LocalIrq;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
impl InterruptMask for LocalIrq {
    /// Whether interrupts were enabled.
    type State = bool;

    #[inline]
    fn save_and_disable() -> bool {
        const IF: u64 = 1 << 9;

        let rflags: u64;
        unsafe {
            core::arch::asm!("pushfq", "pop {}", "cli", out(reg) rflags, options(nomem, preserves_flags));
        }
        rflags & IF != 0
    }

    #[inline]
    fn restore(state: bool) {
        if state {
            unsafe {
                core::arch::asm!("sti", options(nomem, preserves_flags, nostack));
            }
        }
    }
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub type DefaultMask = LocalIrq;
#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
pub type DefaultMask = Unmasked;
