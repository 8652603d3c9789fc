use crate::DriverResult;
use alloc::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Interrupt priority level.
///
/// A handler masks interrupts of equal or lower priority while it runs.
pub enum IrqPriority {
    Low,
    Block,
    Net,
    Clock,
}

/// Code run when an interrupt line fires.
///
/// Handlers run to completion: they must not block nor allocate.
pub trait InterruptHandler: Send + Sync {
    /// Returns whether the device behind this handler raised the interrupt.
    fn handle(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterruptHandle(u32);

impl InterruptHandle {
    #[must_use]
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

pub trait InterruptController: Send + Sync {
    fn attach(
        &self,
        line: u8,
        priority: IrqPriority,
        handler: Arc<dyn InterruptHandler>,
    ) -> DriverResult<InterruptHandle>;

    fn detach(&self, handle: InterruptHandle);
}
