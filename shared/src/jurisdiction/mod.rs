mod error;
mod map;
mod registry;

pub use error::JurisdictionError;
pub use map::{Area, JurisdictionMap};
pub use registry::{IngestOutcome, JurisdictionRegistry, RegistryEntry};
