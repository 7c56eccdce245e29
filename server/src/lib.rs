//! # Voxnet Server
//! The authoritative side of voxnet. Announces the server's jurisdiction,
//! accepts edits that fall inside it and keeps every connected viewer's
//! replica current with sequenced deltas and deletion notices.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use voxnet_shared::{
        BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr, UnsignedInteger,
        UnsignedVariableInteger,
    };
}

mod diagnostics;
mod edit_receiver;
mod jurisdiction_sender;
mod server;
mod server_config;
mod viewer_connection;

pub use diagnostics::ServerDiagnostics;
pub use edit_receiver::EditReceiver;
pub use jurisdiction_sender::JurisdictionResponder;
pub use server::ReplicationServer;
pub use server_config::ServerConfig;
pub use viewer_connection::ViewerConnection;
