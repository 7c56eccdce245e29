use voxnet_serde::{BitReader, BitWrite, ConstBitLength, Serde};

use crate::{
    packet::{PacketError, PacketType},
    session::SessionId,
    types::SequenceNumber,
};

/// Prefix of every voxnet datagram: packet type, sending session, and for
/// sequenced kinds the sequence number.
#[derive(Copy, Debug, Clone, Eq, PartialEq)]
pub struct StandardHeader {
    packet_type: PacketType,
    sender: SessionId,
    sequence: Option<SequenceNumber>,
}

impl StandardHeader {
    pub fn new(packet_type: PacketType, sender: SessionId) -> Self {
        Self {
            packet_type,
            sender,
            sequence: None,
        }
    }

    pub fn sequenced(packet_type: PacketType, sender: SessionId, sequence: SequenceNumber) -> Self {
        Self {
            packet_type,
            sender,
            sequence: Some(sequence),
        }
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn sender(&self) -> SessionId {
        self.sender
    }

    pub fn sequence(&self) -> Option<SequenceNumber> {
        self.sequence
    }

    pub fn write(&self, writer: &mut dyn BitWrite) {
        self.packet_type.ser(writer);
        self.sender.ser(writer);
        if self.packet_type.is_sequenced() {
            self.sequence.unwrap_or(0).ser(writer);
        }
    }

    pub fn read(reader: &mut BitReader) -> Result<Self, PacketError> {
        let index = u8::de(reader)?;
        let packet_type =
            PacketType::from_index(index).ok_or(PacketError::UnknownPacketType { index })?;
        let sender = SessionId::de(reader)?;
        let sequence = if packet_type.is_sequenced() {
            Some(SequenceNumber::de(reader)?)
        } else {
            None
        };

        Ok(Self {
            packet_type,
            sender,
            sequence,
        })
    }

    pub fn bit_length(&self) -> u32 {
        Self::bit_length_for(self.packet_type)
    }

    pub fn bit_length_for(packet_type: PacketType) -> u32 {
        let mut output = <PacketType as ConstBitLength>::const_bit_length()
            + <SessionId as ConstBitLength>::const_bit_length();
        if packet_type.is_sequenced() {
            output += <SequenceNumber as ConstBitLength>::const_bit_length();
        }
        output
    }
}
