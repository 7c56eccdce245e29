use std::collections::HashMap;

use voxnet_shared::{NodeDirectory, NodeRole, ServerId};

/// Node directory whose membership is set by the test
#[derive(Default)]
pub struct TestDirectory {
    nodes: HashMap<ServerId, NodeRole>,
    removed: Vec<ServerId>,
}

impl TestDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: ServerId, role: NodeRole) {
        self.nodes.insert(id, role);
    }

    pub fn remove_node(&mut self, id: &ServerId) {
        if self.nodes.remove(id).is_some() {
            self.removed.push(*id);
        }
    }
}

impl NodeDirectory for TestDirectory {
    fn nodes_by_role(&self, role: NodeRole) -> Vec<ServerId> {
        let mut nodes: Vec<ServerId> = self
            .nodes
            .iter()
            .filter(|(_, node_role)| **node_role == role)
            .map(|(id, _)| *id)
            .collect();
        nodes.sort();
        nodes
    }

    fn is_connected(&self, id: &ServerId) -> bool {
        self.nodes.contains_key(id)
    }

    fn drain_removed_nodes(&mut self) -> Vec<ServerId> {
        std::mem::take(&mut self.removed)
    }
}
