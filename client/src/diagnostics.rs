use std::collections::HashMap;

use voxnet_shared::ServerId;

#[derive(Clone, Debug, Default)]
pub struct ClientDiagnostics {
    /// Datagrams dropped for failing to decode, by sender
    pub malformed_packets: HashMap<ServerId, u64>,
    pub deltas_applied: u64,
    pub resyncs_requested: u64,
    pub deletions_applied: u64,
}

impl ClientDiagnostics {
    pub fn malformed_from(&self, source: &ServerId) -> u64 {
        self.malformed_packets.get(source).copied().unwrap_or(0)
    }

    pub(crate) fn count_malformed(&mut self, source: ServerId) {
        *self.malformed_packets.entry(source).or_insert(0) += 1;
    }
}
