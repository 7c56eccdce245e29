use std::collections::HashMap;

use voxnet_shared::SessionId;

#[derive(Clone, Debug, Default)]
pub struct ServerDiagnostics {
    /// Datagrams dropped for failing to decode, by sender
    pub malformed_packets: HashMap<SessionId, u64>,
    pub deltas_sent: u64,
    pub deletion_notices_sent: u64,
    pub resyncs_served: u64,
    pub jurisdiction_responses: u64,
}

impl ServerDiagnostics {
    pub fn malformed_from(&self, source: &SessionId) -> u64 {
        self.malformed_packets.get(source).copied().unwrap_or(0)
    }

    pub(crate) fn count_malformed(&mut self, source: SessionId) {
        *self.malformed_packets.entry(source).or_insert(0) += 1;
    }
}
