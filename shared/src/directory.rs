use crate::{session::ServerId, types::NodeRole};

/// View of the cluster membership, provided by whatever tracks connected nodes.
pub trait NodeDirectory {
    /// Currently connected nodes of the given role
    fn nodes_by_role(&self, role: NodeRole) -> Vec<ServerId>;

    fn is_connected(&self, id: &ServerId) -> bool;

    /// Nodes removed since the last call
    fn drain_removed_nodes(&mut self) -> Vec<ServerId>;
}
