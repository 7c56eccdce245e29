// An enum representing the different types of packets that can be
// sent/received

use voxnet_serde::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr};

#[derive(Copy, Debug, Clone, Eq, PartialEq, Hash)]
pub enum PacketType {
    // Asks a server for its jurisdiction map
    JurisdictionRequest,
    // A server's answer to a JurisdictionRequest
    JurisdictionMap,
    // A sequenced change to the replicated tree
    TreeDelta,
    // Cumulative acknowledgement of deltas and deletion notices
    TreeDeltaAck,
    // Batch of tree nodes deleted since a timestamp
    DeletionNotice,
    // Coalesced edit records, sequenced per destination
    EditRecords,
    // Asks a server to send a full baseline
    ResyncRequest,
}

impl PacketType {
    pub fn to_index(&self) -> u8 {
        match self {
            PacketType::JurisdictionRequest => 0,
            PacketType::JurisdictionMap => 1,
            PacketType::TreeDelta => 2,
            PacketType::TreeDeltaAck => 3,
            PacketType::DeletionNotice => 4,
            PacketType::EditRecords => 5,
            PacketType::ResyncRequest => 6,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(PacketType::JurisdictionRequest),
            1 => Some(PacketType::JurisdictionMap),
            2 => Some(PacketType::TreeDelta),
            3 => Some(PacketType::TreeDeltaAck),
            4 => Some(PacketType::DeletionNotice),
            5 => Some(PacketType::EditRecords),
            6 => Some(PacketType::ResyncRequest),
            _ => None,
        }
    }

    /// Sequenced kinds carry a sequence number in their header.
    pub fn is_sequenced(&self) -> bool {
        matches!(self, PacketType::TreeDelta | PacketType::EditRecords)
    }
}

impl Serde for PacketType {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.to_index().ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        // Malicious or malformed packets can carry any index
        Self::from_index(u8::de(reader)?).ok_or(SerdeErr)
    }

    fn bit_length(&self) -> u32 {
        <Self as ConstBitLength>::const_bit_length()
    }
}

impl ConstBitLength for PacketType {
    fn const_bit_length() -> u32 {
        <u8 as ConstBitLength>::const_bit_length()
    }
}
