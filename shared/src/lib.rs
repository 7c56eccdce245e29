//! # Voxnet Shared
//! Common functionality shared between voxnet-server & voxnet-client crates:
//! spatial addressing, jurisdiction maps, the packet format and the delta
//! sequencing used to replicate an octree over unreliable datagrams.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

pub use voxnet_serde::{
    BitCounter, BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr, SerdeInteger,
    UnsignedInteger, UnsignedVariableInteger, MTU_SIZE_BITS, MTU_SIZE_BYTES,
};

mod backends;
mod config;
mod deletion;
mod directory;
mod jurisdiction;
mod packet;
mod rate_limiter;
mod replication;
mod sequence_list;
mod session;
mod spatial_address;
mod transport;
mod types;
mod wrapping_number;

pub use backends::{Instant, TimeError, Timer, WallClock};
pub use config::{
    DeletionConfig, EditSenderConfig, JurisdictionConfig, ReplicationConfig, SequencerConfig,
};
pub use deletion::{compute_horizon, DeletionLedger, DeletionRecord, Horizon, PeerDeletionCursor};
pub use directory::NodeDirectory;
pub use jurisdiction::{
    Area, IngestOutcome, JurisdictionError, JurisdictionMap, JurisdictionRegistry, RegistryEntry,
};
pub use packet::{
    read_edit_records, DeletionNotice, EditEntry, JurisdictionRequest, PacketBuilder, PacketError,
    PacketOverflow, PacketType, ResyncRequest, StandardHeader, TreeDeltaAck, TreeDeltaPayload,
};
pub use rate_limiter::RateLimiter;
pub use replication::{
    AppliedDelta, DeltaBaseline, DeltaReceiver, DeltaSender, IncomingDelta, OutgoingDelta,
    ReceiveOutcome, TreeError, TreeObserver, TreeSource, TreeStore,
};
pub use sequence_list::{SequenceError, SequenceList};
pub use session::{ServerId, SessionId, SessionScope, SessionTicket};
pub use spatial_address::{AddressError, SpatialAddress, MAX_ADDRESS_DEPTH, MAX_VOXEL_DEPTH};
pub use transport::{PacketReceiver, PacketSender, TransportError};
pub use types::{Generation, NodeRole, SequenceNumber, Timestamp, TreeNodeId};
pub use wrapping_number::{sequence_greater_than, sequence_less_than, wrapping_diff};
