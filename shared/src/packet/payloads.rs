use voxnet_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{
    replication::DeltaBaseline,
    spatial_address::SpatialAddress,
    types::{Generation, NodeRole, SequenceNumber, Timestamp, TreeNodeId},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JurisdictionRequest {
    pub role: NodeRole,
}

impl Serde for JurisdictionRequest {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.role.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            role: NodeRole::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.role.bit_length()
    }
}

/// Body of a TreeDelta packet. `bytes` is opaque to the transport layer and
/// produced/consumed by the tree implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeDeltaPayload {
    pub baseline: DeltaBaseline,
    pub generation: Generation,
    pub bytes: Vec<u8>,
}

impl Serde for TreeDeltaPayload {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.baseline.ser(writer);
        self.generation.ser(writer);
        self.bytes.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            baseline: DeltaBaseline::de(reader)?,
            generation: Generation::de(reader)?,
            bytes: Vec::<u8>::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.baseline.bit_length() + self.generation.bit_length() + self.bytes.bit_length()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TreeDeltaAck {
    /// Highest delta sequence applied in order
    pub acked: Option<SequenceNumber>,
    /// Timestamp of the newest deletion notice applied
    pub deletions_through: Option<Timestamp>,
}

impl Serde for TreeDeltaAck {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.acked.ser(writer);
        self.deletions_through.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            acked: Option::<SequenceNumber>::de(reader)?,
            deletions_through: Option::<Timestamp>::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.acked.bit_length() + self.deletions_through.bit_length()
    }
}

/// Nodes deleted up to and including `through`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionNotice {
    pub through: Timestamp,
    pub node_ids: Vec<TreeNodeId>,
}

impl Serde for DeletionNotice {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.through.ser(writer);
        self.node_ids.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            through: Timestamp::de(reader)?,
            node_ids: Vec::<TreeNodeId>::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.through.bit_length() + self.node_ids.bit_length()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ResyncRequest {
    pub last_applied: Option<SequenceNumber>,
}

impl Serde for ResyncRequest {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.last_applied.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            last_applied: Option::<SequenceNumber>::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.last_applied.bit_length()
    }
}

/// One addressed edit inside an EditRecords packet. Each entry is preceded by
/// a continue bit; a single unset bit ends the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditEntry<R> {
    pub address: SpatialAddress,
    pub record: R,
}

impl<R: Serde> Serde for EditEntry<R> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        true.ser(writer);
        self.address.ser(writer);
        self.record.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if !bool::de(reader)? {
            return Err(SerdeErr);
        }
        Ok(Self {
            address: SpatialAddress::de(reader)?,
            record: R::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        1 + self.address.bit_length() + self.record.bit_length()
    }
}

pub fn read_edit_records<R: Serde>(reader: &mut BitReader) -> Result<Vec<EditEntry<R>>, SerdeErr> {
    let mut output = Vec::new();
    while bool::de(reader)? {
        output.push(EditEntry {
            address: SpatialAddress::de(reader)?,
            record: R::de(reader)?,
        });
    }
    Ok(output)
}
