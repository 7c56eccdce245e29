use std::collections::VecDeque;

use log::warn;

use voxnet_shared::{
    JurisdictionMap, PacketBuilder, PacketSender, PacketType, SessionId, SessionTicket,
    StandardHeader,
};

/// Answers JurisdictionRequests with this server's map. A server without a
/// configured jurisdiction answers with an unknown map.
pub struct JurisdictionResponder {
    map: JurisdictionMap,
    requests: VecDeque<(SessionId, SessionTicket)>,
}

impl JurisdictionResponder {
    pub fn new(map: JurisdictionMap) -> Self {
        Self {
            map,
            requests: VecDeque::new(),
        }
    }

    pub fn map(&self) -> &JurisdictionMap {
        &self.map
    }

    pub fn set_map(&mut self, map: JurisdictionMap) {
        self.map = map;
    }

    pub fn queue_request(&mut self, requester: SessionId, ticket: SessionTicket) {
        if self.requests.iter().any(|(queued, _)| *queued == requester) {
            return;
        }
        self.requests.push_back((requester, ticket));
    }

    pub fn pending_count(&self) -> usize {
        self.requests.len()
    }

    /// Sends one response per queued request. Returns how many were sent.
    pub fn send_responses(
        &mut self,
        sender: &mut dyn PacketSender,
        session: SessionId,
        max_bytes: usize,
    ) -> usize {
        let mut sent = 0;
        while let Some((requester, ticket)) = self.requests.pop_front() {
            if !ticket.is_valid() {
                continue;
            }
            let header = StandardHeader::new(PacketType::JurisdictionMap, session);
            let packet = match PacketBuilder::single(header, max_bytes, &self.map) {
                Ok(packet) => packet,
                Err(err) => {
                    warn!("jurisdiction map does not fit a packet: {}", err);
                    continue;
                }
            };
            match sender.send(&requester, &packet) {
                Ok(()) => sent += 1,
                Err(err) => warn!("jurisdiction response to {} not sent: {}", requester, err),
            }
        }
        sent
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }
}
