//! # Voxnet Client
//! The viewer side of voxnet. Learns which server owns which part of the
//! tree, routes edits to their owners at a bounded rate and rebuilds the
//! servers' trees from sequenced deltas.

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

mod client;
mod client_config;
mod diagnostics;
mod edit_sender;
mod error;
mod server_connection;

pub use client::ReplicaClient;
pub use client_config::ClientConfig;
pub use diagnostics::ClientDiagnostics;
pub use edit_sender::{EditPacketSender, EditStatus};
pub use error::EditError;
pub use server_connection::ServerConnection;
