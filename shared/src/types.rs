use std::fmt;

use voxnet_serde::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr, UnsignedInteger};

pub type SequenceNumber = u32;
/// Monotonic version counter of a replicated tree.
pub type Generation = u64;
/// Wall-clock microseconds since UNIX epoch.
pub type Timestamp = u64;

/// Stable identifier of a node in the replicated tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeNodeId(pub u64);

impl Serde for TreeNodeId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u64::de(reader)?))
    }

    fn bit_length(&self) -> u32 {
        <Self as ConstBitLength>::const_bit_length()
    }
}

impl ConstBitLength for TreeNodeId {
    fn const_bit_length() -> u32 {
        <u64 as ConstBitLength>::const_bit_length()
    }
}

impl fmt::Display for TreeNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of authoritative server a map or packet belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRole {
    VoxelServer,
    ParticleServer,
    EntityServer,
    MetavoxelServer,
}

impl Serde for NodeRole {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let index = match self {
            NodeRole::VoxelServer => 0,
            NodeRole::ParticleServer => 1,
            NodeRole::EntityServer => 2,
            NodeRole::MetavoxelServer => 3,
        };
        UnsignedInteger::<2>::new(index).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        match UnsignedInteger::<2>::de(reader)?.get() {
            0 => Ok(NodeRole::VoxelServer),
            1 => Ok(NodeRole::ParticleServer),
            2 => Ok(NodeRole::EntityServer),
            3 => Ok(NodeRole::MetavoxelServer),
            _ => Err(SerdeErr),
        }
    }

    fn bit_length(&self) -> u32 {
        <Self as ConstBitLength>::const_bit_length()
    }
}

impl ConstBitLength for NodeRole {
    fn const_bit_length() -> u32 {
        <UnsignedInteger<2> as ConstBitLength>::const_bit_length()
    }
}
