use thiserror::Error;

use crate::spatial_address::{AddressError, SpatialAddress};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JurisdictionError {
    #[error("Delegated address {delegated} is not strictly below jurisdiction root {root}")]
    DelegatedNotDescendant {
        root: SpatialAddress,
        delegated: SpatialAddress,
    },
    #[error("Delegated addresses {first} and {second} overlap")]
    OverlappingDelegation {
        first: SpatialAddress,
        second: SpatialAddress,
    },
    #[error("A jurisdiction without a root cannot delegate subtrees")]
    DelegationWithoutRoot,
    #[error("Invalid jurisdiction address: {0}")]
    Address(#[from] AddressError),
}
