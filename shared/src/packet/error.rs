use thiserror::Error;
use voxnet_serde::SerdeErr;

use crate::packet::PacketType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("Unknown packet type index {index}")]
    UnknownPacketType { index: u8 },
    #[error("Malformed {packet_type:?} packet: {reason}")]
    Malformed {
        packet_type: PacketType,
        reason: &'static str,
    },
    #[error("Packet ended before it could be fully read")]
    Truncated,
}

impl From<SerdeErr> for PacketError {
    fn from(_: SerdeErr) -> Self {
        PacketError::Truncated
    }
}

/// Returned when a write would exceed the packet's capacity. Nothing is
/// written in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Write of {bits_needed} bits does not fit in the {bits_free} bits left in the packet")]
pub struct PacketOverflow {
    pub bits_needed: u32,
    pub bits_free: u32,
}
