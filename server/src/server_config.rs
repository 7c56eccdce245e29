use std::default::Default;

use voxnet_shared::{JurisdictionMap, NodeRole, ReplicationConfig};

/// Contains Config properties which will be used by the Server
#[derive(Clone)]
pub struct ServerConfig {
    /// The kind of tree this server is authoritative for
    pub role: NodeRole,
    /// Region of the tree this server owns. Defaults to the whole tree.
    pub jurisdiction: JurisdictionMap,
    /// Packet size, rates and timeouts
    pub replication: ReplicationConfig,
}

impl ServerConfig {
    pub fn for_role(role: NodeRole) -> Self {
        Self {
            role,
            jurisdiction: JurisdictionMap::whole_tree(role),
            replication: ReplicationConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::for_role(NodeRole::VoxelServer)
    }
}
