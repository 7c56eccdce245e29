use std::collections::HashMap;

use log::{debug, info, warn};

use voxnet_shared::{
    compute_horizon, read_edit_records, BitReader, DeletionLedger, DeletionNotice, DeltaBaseline,
    EditEntry, Generation, Instant, JurisdictionMap, JurisdictionRequest, PacketBuilder, PacketError,
    PacketSender, PacketType, ResyncRequest, Serde, SessionId, SessionScope, StandardHeader,
    TimeError, Timestamp, TreeDeltaAck, TreeDeltaPayload, TreeError, TreeNodeId, TreeSource,
    WallClock,
};

use crate::{
    diagnostics::ServerDiagnostics, edit_receiver::EditReceiver,
    jurisdiction_sender::JurisdictionResponder, server_config::ServerConfig,
    viewer_connection::ViewerConnection,
};

/// Room left in a TreeDelta packet for the baseline, generation and length
/// prefix around the tree's bytes
const DELTA_FRAMING_BYTES: usize = 20;

/// One authoritative server. Driven by feeding it datagrams and calling
/// `send_updates` on a timer.
pub struct ReplicationServer<R: Serde> {
    config: ServerConfig,
    scope: SessionScope,
    responder: JurisdictionResponder,
    edits: EditReceiver<R>,
    viewers: HashMap<SessionId, ViewerConnection>,
    ledger: DeletionLedger,
    diagnostics: ServerDiagnostics,
}

impl<R: Serde> ReplicationServer<R> {
    pub fn new(config: ServerConfig, session: SessionId) -> Self {
        let responder = JurisdictionResponder::new(config.jurisdiction.clone());
        Self {
            config,
            scope: SessionScope::new(session),
            responder,
            edits: EditReceiver::new(),
            viewers: HashMap::new(),
            ledger: DeletionLedger::new(),
            diagnostics: ServerDiagnostics::default(),
        }
    }

    pub fn session(&self) -> SessionId {
        self.scope.id()
    }

    pub fn jurisdiction(&self) -> &JurisdictionMap {
        &self.config.jurisdiction
    }

    pub fn set_jurisdiction(&mut self, map: JurisdictionMap) {
        info!("jurisdiction is now {:?}", map.root().map(|root| root.to_string()));
        self.responder.set_map(map.clone());
        self.config.jurisdiction = map;
    }

    pub fn ledger(&self) -> &DeletionLedger {
        &self.ledger
    }

    pub fn viewer(&self, viewer: &SessionId) -> Option<&ViewerConnection> {
        self.viewers.get(viewer)
    }

    pub fn edit_receiver(&self) -> &EditReceiver<R> {
        &self.edits
    }

    pub fn diagnostics(&self) -> &ServerDiagnostics {
        &self.diagnostics
    }

    /// Starts replicating to `viewer`. A viewer that is still remembered from
    /// an earlier connection resumes deletion catch-up where it left off.
    pub fn connect_viewer(&mut self, viewer: SessionId, now: &Instant) {
        if let Some(connection) = self.viewers.get_mut(&viewer) {
            info!(
                "viewer {} reconnected, resuming deletions from {}",
                viewer,
                connection.needs_deletions_from()
            );
            connection.set_connected(true, now);
            return;
        }

        info!("viewer {} connected", viewer);
        let next_deletion = self.next_deletion_stamp();
        self.viewers.insert(
            viewer,
            ViewerConnection::new(viewer, &self.config.replication.sequencer, next_deletion, now),
        );
    }

    pub fn disconnect_viewer(&mut self, viewer: &SessionId, now: &Instant) {
        if let Some(connection) = self.viewers.get_mut(viewer) {
            info!("viewer {} disconnected", viewer);
            connection.set_connected(false, now);
        }
        self.edits.forget_sender(viewer);
    }

    /// Returns the timestamp actually recorded
    pub fn record_deletion(&mut self, node_id: TreeNodeId, now: Timestamp) -> Timestamp {
        self.ledger.record_deletion(node_id, now)
    }

    /// Records a deletion stamped with the current wall clock time
    pub fn record_deletion_now(&mut self, node_id: TreeNodeId) -> Result<Timestamp, TimeError> {
        let now = WallClock::try_now_micros()?;
        Ok(self.ledger.record_deletion(node_id, now))
    }

    /// Edits accepted since the last call, in arrival order
    pub fn take_edits(&mut self) -> Vec<(SessionId, EditEntry<R>)> {
        self.edits.take_edits()
    }

    /// Handles one inbound datagram. Undecodable input is dropped and counted
    /// against its source.
    pub fn receive_packet(&mut self, from: SessionId, bytes: &[u8], now: &Instant) {
        if let Err(err) = self.process_packet(from, bytes, now) {
            warn!("dropping packet from {}: {}", from, err);
            self.diagnostics.count_malformed(from);
        }
    }

    fn process_packet(
        &mut self,
        from: SessionId,
        bytes: &[u8],
        now: &Instant,
    ) -> Result<(), PacketError> {
        let mut reader = BitReader::new(bytes);
        let header = StandardHeader::read(&mut reader)?;
        if header.sender() != from {
            return Err(PacketError::Malformed {
                packet_type: header.packet_type(),
                reason: "header session does not match sender",
            });
        }

        if let Some(connection) = self.viewers.get_mut(&from) {
            if connection.is_connected() {
                connection.mark_heard(now);
            }
        }

        match header.packet_type() {
            PacketType::JurisdictionRequest => {
                let request = JurisdictionRequest::de(&mut reader)?;
                if request.role != self.config.role {
                    debug!("{} asked for {:?} jurisdiction", from, request.role);
                }
                self.responder.queue_request(from, self.scope.ticket());
            }
            PacketType::TreeDeltaAck => {
                let ack = TreeDeltaAck::de(&mut reader)?;
                let Some(connection) = self.viewers.get_mut(&from) else {
                    debug!("ack from unknown viewer {}", from);
                    return Ok(());
                };
                if let Some(acked) = ack.acked {
                    connection.deltas.on_ack(acked);
                }
                if let Some(through) = ack.deletions_through {
                    connection.on_deletions_acked(through);
                }
            }
            PacketType::ResyncRequest => {
                let request = ResyncRequest::de(&mut reader)?;
                let Some(connection) = self.viewers.get_mut(&from) else {
                    debug!("resync request from unknown viewer {}", from);
                    return Ok(());
                };
                info!(
                    "viewer {} requested a resync after {:?}",
                    from, request.last_applied
                );
                connection.deltas.request_full_resync();
                self.diagnostics.resyncs_served += 1;
            }
            PacketType::EditRecords => {
                let sequence = header.sequence().ok_or(PacketError::Malformed {
                    packet_type: PacketType::EditRecords,
                    reason: "missing sequence",
                })?;
                let entries = read_edit_records::<R>(&mut reader)?;
                self.edits
                    .process(from, sequence, entries, &self.config.jurisdiction);
            }
            other => {
                debug!("ignoring {:?} packet from {}", other, from);
            }
        }
        Ok(())
    }

    /// Sends deltas, deletion notices and jurisdiction responses, and prunes
    /// deletions no remembered viewer still needs.
    pub fn send_updates(
        &mut self,
        now: &Instant,
        tree: &dyn TreeSource,
        sender: &mut dyn PacketSender,
    ) {
        let session = self.scope.id();
        let max_bytes = self.config.replication.max_packet_bytes;

        self.diagnostics.jurisdiction_responses +=
            self.responder.send_responses(sender, session, max_bytes) as u64;

        self.prune_deletions(now);

        let generation = tree.current_generation();
        let ack_timeout = self.config.replication.sequencer.ack_timeout;
        let resend_interval = self.config.replication.deletion.notice_resend_interval;

        for connection in self.viewers.values_mut() {
            if !connection.is_connected() {
                continue;
            }
            let viewer = connection.viewer();

            if let Some(age) = connection.deltas.oldest_unacked_age(now) {
                if age > ack_timeout {
                    debug!("viewer {} has not acked for {:?}, resending full state", viewer, age);
                    connection.deltas.request_full_resync();
                }
            }

            if connection.deltas.has_changes(generation) {
                if send_delta(connection, generation, now, tree, sender, session, max_bytes) {
                    self.diagnostics.deltas_sent += 1;
                }
            }

            let due = match connection.last_notice() {
                None => true,
                Some((_, sent_at)) => sent_at.elapsed(now) >= resend_interval,
            };
            let from = connection.needs_deletions_from();
            if due && self.ledger.has_deletions_since(from) {
                if let Some(through) =
                    send_deletions(&self.ledger, from, viewer, sender, session, max_bytes)
                {
                    connection.notice_sent(through, now);
                    self.diagnostics.deletion_notices_sent += 1;
                }
            }
        }
    }

    /// Ends the session: viewers, queued responses and the ledger are dropped.
    pub fn teardown(&mut self) {
        self.scope.teardown();
        self.responder.clear();
        self.edits.reset();
        self.viewers.clear();
        self.ledger.clear();
    }

    fn next_deletion_stamp(&self) -> Timestamp {
        self.ledger.next_stamp()
    }

    fn prune_deletions(&mut self, now: &Instant) {
        let cursors: Vec<_> = self.viewers.values().map(|viewer| viewer.cursor()).collect();
        let horizon = compute_horizon(
            &cursors,
            now,
            self.config.replication.deletion.peer_unreachable_after,
        );

        let next_deletion = self.next_deletion_stamp();
        for viewer in horizon.excluded {
            let Some(connection) = self.viewers.get_mut(&viewer) else {
                continue;
            };
            if connection.is_connected() {
                warn!("viewer {} unreachable, forcing a full resync", viewer);
                connection.deltas.request_full_resync();
                connection.restart_deletions_from(next_deletion);
                connection.mark_heard(now);
            } else {
                debug!("forgetting viewer {}", viewer);
                self.viewers.remove(&viewer);
            }
        }

        let horizon = horizon.horizon.unwrap_or(next_deletion);
        let pruned = self.ledger.prune(horizon);
        if pruned > 0 {
            debug!("pruned {} deletion records before {}", pruned, horizon);
        }
    }
}

/// Returns true if a delta was handed to the transport
fn send_delta(
    connection: &mut ViewerConnection,
    generation: Generation,
    now: &Instant,
    tree: &dyn TreeSource,
    sender: &mut dyn PacketSender,
    session: SessionId,
    max_bytes: usize,
) -> bool {
    let viewer = connection.viewer();
    let outgoing = connection.deltas.prepare(generation, now);
    let header = StandardHeader::sequenced(PacketType::TreeDelta, session, outgoing.sequence);
    let budget = (PacketBuilder::payload_capacity(&header, max_bytes) / 8) as usize;
    let budget = budget.saturating_sub(DELTA_FRAMING_BYTES);

    let mut baseline = outgoing.baseline;
    let written = match tree.write_delta(baseline, budget) {
        Err(TreeError::BaselineUnavailable { generation }) => {
            debug!("generation {} gone, sending {} full state", generation, viewer);
            baseline = DeltaBaseline::Full;
            tree.write_delta(baseline, budget)
        }
        other => other,
    };
    let bytes = match written {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("could not encode delta for {}: {}", viewer, err);
            connection.deltas.request_full_resync();
            return false;
        }
    };

    let payload = TreeDeltaPayload {
        baseline,
        generation,
        bytes,
    };
    let packet = match PacketBuilder::single(header, max_bytes, &payload) {
        Ok(packet) => packet,
        Err(err) => {
            warn!("delta for {} does not fit a packet: {}", viewer, err);
            connection.deltas.request_full_resync();
            return false;
        }
    };
    match sender.send(&viewer, &packet) {
        Ok(()) => true,
        Err(err) => {
            warn!("delta to {} not sent: {}", viewer, err);
            false
        }
    }
}

/// Sends as many deletions from `from` onward as fit one packet. Returns the
/// timestamp of the newest one included.
fn send_deletions(
    ledger: &DeletionLedger,
    from: Timestamp,
    viewer: SessionId,
    sender: &mut dyn PacketSender,
    session: SessionId,
    max_bytes: usize,
) -> Option<Timestamp> {
    let header = StandardHeader::new(PacketType::DeletionNotice, session);
    let capacity = PacketBuilder::payload_capacity(&header, max_bytes);

    let mut notice = DeletionNotice {
        through: from,
        node_ids: Vec::new(),
    };
    for record in ledger.records_since(from) {
        notice.node_ids.push(record.node_id);
        if notice.bit_length() > capacity {
            notice.node_ids.pop();
            break;
        }
        notice.through = record.deleted_at;
    }
    if notice.node_ids.is_empty() {
        return None;
    }

    let packet = match PacketBuilder::single(header, max_bytes, &notice) {
        Ok(packet) => packet,
        Err(err) => {
            warn!("deletion notice for {} does not fit: {}", viewer, err);
            return None;
        }
    };
    match sender.send(&viewer, &packet) {
        Ok(()) => Some(notice.through),
        Err(err) => {
            warn!("deletion notice to {} not sent: {}", viewer, err);
            None
        }
    }
}
