use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("Device not found")]
    Absent,
    #[error("Invalid device")]
    Invalid,
    #[error("Device did not complete reset")]
    ResetFailed,
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Unknown error")]
    Unknown,
}

pub type DriverResult<T> = Result<T, DriverError>;
