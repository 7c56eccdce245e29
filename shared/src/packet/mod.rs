mod error;
mod packet_builder;
mod packet_type;
mod payloads;
mod standard_header;

pub use error::{PacketError, PacketOverflow};
pub use packet_builder::PacketBuilder;
pub use packet_type::PacketType;
pub use payloads::{
    read_edit_records, DeletionNotice, EditEntry, JurisdictionRequest, ResyncRequest,
    TreeDeltaAck, TreeDeltaPayload,
};
pub use standard_header::StandardHeader;
