use thiserror::Error;
use voxnet_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{
    spatial_address::SpatialAddress,
    types::{Generation, TreeNodeId},
};

/// What a delta was computed against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeltaBaseline {
    /// Complete state, applicable to any replica
    Full,
    /// Changes since the given generation
    Since(Generation),
}

impl Serde for DeltaBaseline {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            DeltaBaseline::Full => false.ser(writer),
            DeltaBaseline::Since(generation) => {
                true.ser(writer);
                generation.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if bool::de(reader)? {
            Ok(DeltaBaseline::Since(Generation::de(reader)?))
        } else {
            Ok(DeltaBaseline::Full)
        }
    }

    fn bit_length(&self) -> u32 {
        match self {
            DeltaBaseline::Full => 1,
            DeltaBaseline::Since(generation) => 1 + generation.bit_length(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedDelta {
    pub generation: Generation,
    pub affected: Vec<SpatialAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Delta baseline generation {generation} is no longer available")]
    BaselineUnavailable { generation: Generation },
    #[error("Delta payload could not be applied: {0}")]
    MalformedDelta(String),
    #[error("Delta of {bytes} bytes does not fit the {max_bytes} byte budget")]
    PayloadTooLarge { bytes: usize, max_bytes: usize },
}

/// Replica side of the tree: where received deltas land.
pub trait TreeStore {
    /// Generation of the state currently held, if any
    fn current_generation(&self) -> Option<Generation>;

    fn apply_delta(
        &mut self,
        baseline: DeltaBaseline,
        payload: &[u8],
    ) -> Result<AppliedDelta, TreeError>;

    /// Removes the given nodes, returning the addresses that changed
    fn delete_nodes(&mut self, ids: &[TreeNodeId]) -> Vec<SpatialAddress>;
}

/// Authoritative side of the tree: produces deltas on demand.
pub trait TreeSource {
    fn current_generation(&self) -> Generation;

    /// Encodes the changes since `baseline` in at most `max_bytes`.
    fn write_delta(&self, baseline: DeltaBaseline, max_bytes: usize) -> Result<Vec<u8>, TreeError>;
}

/// Notified after each applied delta or deletion batch.
pub trait TreeObserver {
    fn on_tree_changed(&mut self, affected: &[SpatialAddress]);
}
