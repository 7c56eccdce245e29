use std::collections::HashMap;

use log::{debug, info, warn};

use voxnet_shared::{
    BitReader, DeletionNotice, IncomingDelta, IngestOutcome, Instant, JurisdictionMap,
    JurisdictionRegistry, NodeDirectory, PacketBuilder, PacketError, PacketSender, PacketType,
    ReceiveOutcome, Serde, ServerId, SessionId, SessionTicket, SpatialAddress, StandardHeader,
    TreeDeltaAck, TreeDeltaPayload, TreeObserver, TreeStore,
};

use crate::{
    client_config::ClientConfig,
    diagnostics::ClientDiagnostics,
    edit_sender::{EditPacketSender, EditStatus},
    error::EditError,
    server_connection::ServerConnection,
};

/// A viewer of one server role. Owns the jurisdiction registry, the edit
/// sender and a delta receiver per server, and is driven by feeding it
/// datagrams and calling `update` on a timer.
pub struct ReplicaClient<R: Serde> {
    config: ClientConfig,
    registry: JurisdictionRegistry,
    edits: EditPacketSender<R>,
    connections: HashMap<ServerId, ServerConnection>,
    diagnostics: ClientDiagnostics,
}

impl<R: Serde> ReplicaClient<R> {
    pub fn new(config: ClientConfig, session: SessionId) -> Self {
        let registry = JurisdictionRegistry::new(config.role, config.replication.jurisdiction.clone());
        let edits = EditPacketSender::new(
            session,
            config.replication.edit.clone(),
            config.replication.max_packet_bytes,
        );
        Self {
            config,
            registry,
            edits,
            connections: HashMap::new(),
            diagnostics: ClientDiagnostics::default(),
        }
    }

    pub fn session(&self) -> SessionId {
        self.edits.session()
    }

    pub fn session_ticket(&self) -> SessionTicket {
        self.edits.ticket()
    }

    pub fn registry(&self) -> &JurisdictionRegistry {
        &self.registry
    }

    pub fn edit_sender(&self) -> &EditPacketSender<R> {
        &self.edits
    }

    pub fn connection(&self, server: &ServerId) -> Option<&ServerConnection> {
        self.connections.get(server)
    }

    pub fn diagnostics(&self) -> &ClientDiagnostics {
        &self.diagnostics
    }

    pub fn queue_edit(
        &mut self,
        address: SpatialAddress,
        record: R,
    ) -> Result<EditStatus, EditError> {
        self.edits.queue_edit(&mut self.registry, address, record)
    }

    pub fn set_should_send(&mut self, should_send: bool) {
        self.edits.set_should_send(should_send);
    }

    /// Forgets the replication state kept for `server` after the link to it
    /// dropped. The next delta it sends starts a fresh sequence.
    pub fn disconnect_server(&mut self, server: &ServerId) {
        if self.connections.remove(server).is_some() {
            info!("disconnected from {}", server);
        }
    }

    /// Handles one inbound datagram. Undecodable input is dropped and counted
    /// against its source.
    pub fn receive_packet(
        &mut self,
        from: ServerId,
        bytes: &[u8],
        now: &Instant,
        directory: &dyn NodeDirectory,
        tree: &mut dyn TreeStore,
        observer: &mut dyn TreeObserver,
    ) {
        if let Err(err) = self.process_packet(from, bytes, now, directory, tree, observer) {
            warn!("dropping packet from {}: {}", from, err);
            self.diagnostics.count_malformed(from);
        }
    }

    fn process_packet(
        &mut self,
        from: ServerId,
        bytes: &[u8],
        now: &Instant,
        directory: &dyn NodeDirectory,
        tree: &mut dyn TreeStore,
        observer: &mut dyn TreeObserver,
    ) -> Result<(), PacketError> {
        let mut reader = BitReader::new(bytes);
        let header = StandardHeader::read(&mut reader)?;
        if header.sender() != from {
            return Err(PacketError::Malformed {
                packet_type: header.packet_type(),
                reason: "header session does not match sender",
            });
        }

        match header.packet_type() {
            PacketType::JurisdictionMap => {
                let map = JurisdictionMap::de(&mut reader)?;
                match self.registry.ingest(directory, from, map, now) {
                    IngestOutcome::Inserted | IngestOutcome::Refreshed => {
                        self.edits.on_jurisdiction_changed(&mut self.registry);
                    }
                    outcome => debug!("jurisdiction from {} not used: {:?}", from, outcome),
                }
            }
            PacketType::TreeDelta => {
                let sequence = header.sequence().ok_or(PacketError::Malformed {
                    packet_type: PacketType::TreeDelta,
                    reason: "missing sequence",
                })?;
                let payload = TreeDeltaPayload::de(&mut reader)?;
                let connection = self.connection_mut(from, now);
                connection.mark_heard(now);
                let outcome = connection.receiver.receive(
                    sequence,
                    IncomingDelta {
                        baseline: payload.baseline,
                        generation: payload.generation,
                        payload: payload.bytes,
                    },
                    now,
                    tree,
                );
                if let ReceiveOutcome::Applied { applied, affected } = outcome {
                    self.diagnostics.deltas_applied += applied as u64;
                    if !affected.is_empty() {
                        observer.on_tree_changed(&affected);
                    }
                }
            }
            PacketType::DeletionNotice => {
                let notice = DeletionNotice::de(&mut reader)?;
                let connection = self.connection_mut(from, now);
                connection.mark_heard(now);
                if connection.record_deletions(notice.through) {
                    let affected = tree.delete_nodes(&notice.node_ids);
                    self.diagnostics.deletions_applied += notice.node_ids.len() as u64;
                    if !affected.is_empty() {
                        observer.on_tree_changed(&affected);
                    }
                }
            }
            other => {
                debug!("ignoring {:?} packet from {}", other, from);
            }
        }
        Ok(())
    }

    /// Drives timers: jurisdiction refresh, edit sending, acks and resync
    /// requests.
    pub fn update(
        &mut self,
        now: &Instant,
        directory: &mut dyn NodeDirectory,
        sender: &mut dyn PacketSender,
    ) {
        for server in directory.drain_removed_nodes() {
            self.registry.on_server_removed(&server);
            if self.connections.remove(&server).is_some() {
                info!("server {} left, dropping its replica state", server);
            }
        }

        let session = self.session();
        self.registry.update(now, directory, sender, session);
        if self.edits.pending_count() > 0 {
            self.edits.on_jurisdiction_changed(&mut self.registry);
        }
        self.edits.send_packets(now, sender, &self.registry);

        let max_bytes = self.config.replication.max_packet_bytes;
        for (server, connection) in self.connections.iter_mut() {
            if let Some(request) = connection.receiver.take_resync_request(now) {
                self.diagnostics.resyncs_requested += 1;
                let header = StandardHeader::new(PacketType::ResyncRequest, session);
                send_single(sender, server, header, max_bytes, &request);
            }

            let acked = connection.receiver.take_ack();
            let deletion_ack = connection.take_deletion_ack();
            if acked.is_some() || deletion_ack {
                let ack = TreeDeltaAck {
                    acked: connection.receiver.last_applied(),
                    deletions_through: connection.deletions_through(),
                };
                let header = StandardHeader::new(PacketType::TreeDeltaAck, session);
                send_single(sender, server, header, max_bytes, &ack);
            }
        }
    }

    /// Ends the session: queued edits, replica state and known
    /// jurisdictions are dropped.
    pub fn teardown(&mut self) {
        self.edits.teardown();
        for connection in self.connections.values_mut() {
            connection.receiver.reset();
        }
        self.connections.clear();
        self.registry.clear();
    }

    fn connection_mut(&mut self, server: ServerId, now: &Instant) -> &mut ServerConnection {
        let sequencer = &self.config.replication.sequencer;
        self.connections
            .entry(server)
            .or_insert_with(|| ServerConnection::new(server, sequencer, now))
    }
}

fn send_single<T: Serde>(
    sender: &mut dyn PacketSender,
    destination: &ServerId,
    header: StandardHeader,
    max_bytes: usize,
    payload: &T,
) {
    let packet = match PacketBuilder::single(header, max_bytes, payload) {
        Ok(packet) => packet,
        Err(err) => {
            warn!("{:?} packet does not fit: {}", header.packet_type(), err);
            return;
        }
    };
    if let Err(err) = sender.send(destination, &packet) {
        warn!("{:?} packet to {} not sent: {}", header.packet_type(), destination, err);
    }
}
