use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Edit record needs {bits_needed} bits but an empty edit packet holds only {bits_free}")]
    RecordTooLarge { bits_needed: u32, bits_free: u32 },
}
