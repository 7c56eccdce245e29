use std::default::Default;

use voxnet_shared::{NodeRole, ReplicationConfig};

/// Contains Config properties which will be used by a Client
#[derive(Clone)]
pub struct ClientConfig {
    /// The kind of server this client replicates from and edits
    pub role: NodeRole,
    /// Packet size, rates and timeouts
    pub replication: ReplicationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            role: NodeRole::VoxelServer,
            replication: ReplicationConfig::default(),
        }
    }
}
