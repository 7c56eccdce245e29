use std::time::SystemTime;

use thiserror::Error;

use crate::types::Timestamp;

/// Error type for wall clock reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimeError {
    /// System time is before UNIX epoch
    #[error("System time is before UNIX epoch")]
    SystemTimeBeforeEpoch,
}

pub struct WallClock;

impl WallClock {
    /// Returns the current time in microseconds since UNIX epoch.
    ///
    /// # Errors
    /// Returns `TimeError::SystemTimeBeforeEpoch` if system time is before UNIX epoch.
    pub fn try_now_micros() -> Result<Timestamp, TimeError> {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_micros() as Timestamp)
            .map_err(|_| TimeError::SystemTimeBeforeEpoch)
    }
}
