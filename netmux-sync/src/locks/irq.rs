//! Interrupt-safe ticket lock.
//!
//! Data shared between an interrupt handler and regular kernel context must be
//! protected by a lock that also masks local interrupts: otherwise the handler
//! could fire on the CPU that already holds the lock and spin forever.
//!
//! `IrqLock` masks interrupts through its `InterruptMask` parameter, then takes a
//! fair ticket lock. The guard releases the lock before restoring the interrupt state.
//!
//! ```rust
//! # use netmux_sync::IrqLock;
//! let lock = IrqLock::<u8>::new(0);
//!
//! lock.with_locked(|value| *value = 42);
//! assert_eq!(*lock.lock(), 42);
//! ```

use super::{BackOff, DefaultMask, InterruptMask, Spin};
use core::{
    cell::UnsafeCell,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicU32, Ordering},
};

pub struct IrqLock<T, M: InterruptMask = DefaultMask, B: BackOff = Spin> {
    /// The ticket number of the next CPU to acquire the lock.
    next_ticket: AtomicU32,
    /// The ticket number of the CPU holding the lock.
    now_serving: AtomicU32,
    data: UnsafeCell<T>,
    _mask: PhantomData<M>,
    _back_off: PhantomData<B>,
}

// Safety:
// Access to `data` is serialized by the ticket lock.
unsafe impl<T: Send, M: InterruptMask, B: BackOff> Send for IrqLock<T, M, B> {}
unsafe impl<T: Send, M: InterruptMask, B: BackOff> Sync for IrqLock<T, M, B> {}

impl<T, M: InterruptMask, B: BackOff> IrqLock<T, M, B> {
    #[must_use]
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            next_ticket: AtomicU32::new(0),
            now_serving: AtomicU32::new(0),
            data: UnsafeCell::new(data),
            _mask: PhantomData,
            _back_off: PhantomData,
        }
    }

    #[must_use]
    #[inline]
    /// Masks local interrupts, then locks.
    pub fn lock(&self) -> IrqGuard<'_, T, M, B> {
        let state = M::save_and_disable();

        let ticket = self.next_ticket.fetch_add(1, Ordering::Acquire);
        while self.now_serving.load(Ordering::Acquire) != ticket {
            B::back_off();
        }

        IrqGuard {
            lock: self,
            state: Some(state),
        }
    }

    #[must_use]
    #[inline]
    /// Takes the lock only if nobody holds or waits for it.
    pub fn try_lock(&self) -> Option<IrqGuard<'_, T, M, B>> {
        let state = M::save_and_disable();

        let serving = self.now_serving.load(Ordering::Acquire);
        if self
            .next_ticket
            .compare_exchange(
                serving,
                serving.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
        {
            Some(IrqGuard {
                lock: self,
                state: Some(state),
            })
        } else {
            M::restore(state);
            None
        }
    }

    #[inline]
    /// Runs `f` with the lock held.
    pub fn with_locked<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    #[inline]
    /// Runs `f` if the lock is immediately available.
    pub fn try_with_locked<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.try_lock().map(|mut guard| f(&mut guard))
    }

    #[must_use]
    #[inline]
    /// Whether the lock is currently held.
    pub fn is_locked(&self) -> bool {
        self.next_ticket.load(Ordering::Relaxed) != self.now_serving.load(Ordering::Relaxed)
    }

    #[inline]
    /// Exclusive access without locking, through a unique borrow.
    pub const fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    #[must_use]
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    #[inline]
    /// # Safety
    ///
    /// The caller must be the owner of the lock.
    unsafe fn unlock(&self) {
        self.now_serving.fetch_add(1, Ordering::Release);
    }
}

impl<T: Default, M: InterruptMask, B: BackOff> Default for IrqLock<T, M, B> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// RAII guard for `IrqLock`.
pub struct IrqGuard<'l, T, M: InterruptMask, B: BackOff> {
    lock: &'l IrqLock<T, M, B>,
    state: Option<M::State>,
}

impl<T, M: InterruptMask, B: BackOff> Drop for IrqGuard<'_, T, M, B> {
    #[inline]
    fn drop(&mut self) {
        // Safety: If the guard exists, we have the lock.
        unsafe { self.lock.unlock() };
        if let Some(state) = self.state.take() {
            M::restore(state);
        }
    }
}

impl<T, M: InterruptMask, B: BackOff> Deref for IrqGuard<'_, T, M, B> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T, M: InterruptMask, B: BackOff> DerefMut for IrqGuard<'_, T, M, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}
