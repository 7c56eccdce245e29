use std::collections::{BTreeMap, BTreeSet};

use voxnet_shared::{
    AppliedDelta, BitReader, BitWrite, BitWriter, DeltaBaseline, Generation, Serde, SerdeErr,
    SpatialAddress, TreeError, TreeNodeId, TreeObserver, TreeSource, TreeStore,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeState {
    pub id: TreeNodeId,
    pub address: SpatialAddress,
    pub color: u32,
}

impl Serde for NodeState {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.address.ser(writer);
        self.color.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: TreeNodeId::de(reader)?,
            address: SpatialAddress::de(reader)?,
            color: u32::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.id.bit_length() + self.address.bit_length() + self.color.bit_length()
    }
}

/// Encoded form of one delta
struct DeltaBody {
    full: bool,
    generation: Generation,
    nodes: Vec<NodeState>,
}

impl DeltaBody {
    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        self.full.ser(&mut writer);
        self.generation.ser(&mut writer);
        self.nodes.ser(&mut writer);
        writer.to_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, SerdeErr> {
        let mut reader = BitReader::new(bytes);
        Ok(Self {
            full: bool::de(&mut reader)?,
            generation: Generation::de(&mut reader)?,
            nodes: Vec::<NodeState>::de(&mut reader)?,
        })
    }
}

/// Authoritative tree that remembers which generation touched each node
pub struct TestTree {
    nodes: BTreeMap<TreeNodeId, NodeState>,
    generation: Generation,
    changes: Vec<(Generation, TreeNodeId)>,
    oldest_baseline: Generation,
}

impl TestTree {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            generation: 0,
            changes: Vec::new(),
            oldest_baseline: 0,
        }
    }

    pub fn set_node(&mut self, id: u64, address: SpatialAddress, color: u32) -> Generation {
        let id = TreeNodeId(id);
        self.generation += 1;
        self.nodes.insert(id, NodeState { id, address, color });
        self.changes.push((self.generation, id));
        self.generation
    }

    /// Removes the node locally. Replicas learn of it through deletion notices.
    pub fn remove_node(&mut self, id: u64) -> Option<SpatialAddress> {
        let removed = self.nodes.remove(&TreeNodeId(id))?;
        self.generation += 1;
        Some(removed.address)
    }

    /// Deltas against generations older than the current one become
    /// unavailable, as if the change log were compacted.
    pub fn compact_history(&mut self) {
        self.oldest_baseline = self.generation;
        self.changes.clear();
    }

    pub fn node(&self, id: u64) -> Option<&NodeState> {
        self.nodes.get(&TreeNodeId(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeState> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSource for TestTree {
    fn current_generation(&self) -> Generation {
        self.generation
    }

    fn write_delta(&self, baseline: DeltaBaseline, max_bytes: usize) -> Result<Vec<u8>, TreeError> {
        let body = match baseline {
            DeltaBaseline::Full => DeltaBody {
                full: true,
                generation: self.generation,
                nodes: self.nodes.values().cloned().collect(),
            },
            DeltaBaseline::Since(since) => {
                if since < self.oldest_baseline || since > self.generation {
                    return Err(TreeError::BaselineUnavailable { generation: since });
                }
                let touched: BTreeSet<TreeNodeId> = self
                    .changes
                    .iter()
                    .filter(|(generation, _)| *generation > since)
                    .map(|(_, id)| *id)
                    .collect();
                DeltaBody {
                    full: false,
                    generation: self.generation,
                    nodes: touched
                        .iter()
                        .filter_map(|id| self.nodes.get(id).cloned())
                        .collect(),
                }
            }
        };

        let bytes = body.to_bytes();
        if bytes.len() > max_bytes {
            return Err(TreeError::PayloadTooLarge {
                bytes: bytes.len(),
                max_bytes,
            });
        }
        Ok(bytes)
    }
}

/// Replica side: holds whatever the deltas and deletion notices produced
#[derive(Default)]
pub struct ReplicaTree {
    nodes: BTreeMap<TreeNodeId, NodeState>,
    generation: Option<Generation>,
    deltas_applied: usize,
}

impl ReplicaTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: u64) -> Option<&NodeState> {
        self.nodes.get(&TreeNodeId(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn deltas_applied(&self) -> usize {
        self.deltas_applied
    }

    /// Whether this replica holds exactly the nodes of `source`
    pub fn matches(&self, source: &TestTree) -> bool {
        self.nodes.len() == source.len()
            && source
                .nodes()
                .all(|node| self.nodes.get(&node.id) == Some(node))
    }
}

impl TreeStore for ReplicaTree {
    fn current_generation(&self) -> Option<Generation> {
        self.generation
    }

    fn apply_delta(
        &mut self,
        baseline: DeltaBaseline,
        payload: &[u8],
    ) -> Result<AppliedDelta, TreeError> {
        let body = DeltaBody::from_bytes(payload)
            .map_err(|err| TreeError::MalformedDelta(err.to_string()))?;
        if body.full != (baseline == DeltaBaseline::Full) {
            return Err(TreeError::MalformedDelta(
                "baseline does not match payload".to_string(),
            ));
        }
        if let DeltaBaseline::Since(since) = baseline {
            if self.generation != Some(since) {
                return Err(TreeError::BaselineUnavailable { generation: since });
            }
        }

        let mut affected = Vec::new();
        if body.full {
            for (id, old) in std::mem::take(&mut self.nodes) {
                if !body.nodes.iter().any(|node| node.id == id) {
                    affected.push(old.address);
                }
            }
        }
        for node in body.nodes {
            affected.push(node.address.clone());
            self.nodes.insert(node.id, node);
        }

        self.generation = Some(body.generation);
        self.deltas_applied += 1;
        Ok(AppliedDelta {
            generation: body.generation,
            affected,
        })
    }

    fn delete_nodes(&mut self, ids: &[TreeNodeId]) -> Vec<SpatialAddress> {
        ids.iter()
            .filter_map(|id| self.nodes.remove(id))
            .map(|node| node.address)
            .collect()
    }
}

/// Records every change notification
#[derive(Default)]
pub struct ChangeRecorder {
    pub changes: Vec<Vec<SpatialAddress>>,
}

impl ChangeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_addresses(&self) -> usize {
        self.changes.iter().map(Vec::len).sum()
    }
}

impl TreeObserver for ChangeRecorder {
    fn on_tree_changed(&mut self, affected: &[SpatialAddress]) {
        self.changes.push(affected.to_vec());
    }
}
