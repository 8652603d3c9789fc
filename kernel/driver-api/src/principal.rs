#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Capability {
    /// Access to network devices.
    Network,
}

/// Caller of a device-file operation.
pub trait Principal {
    fn has_capability(&self, capability: Capability) -> bool;
}
