use thiserror::Error;

/// Returned when a reader runs out of bits or meets a value it cannot
/// represent. Carries no detail: callers attach context at the packet level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bit stream ended early or contained an invalid value")]
pub struct SerdeErr;
