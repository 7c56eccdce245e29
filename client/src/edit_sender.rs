use std::collections::{HashMap, VecDeque};

use log::{debug, trace, warn};

use voxnet_shared::{
    EditEntry, EditSenderConfig, Instant, JurisdictionRegistry, PacketBuilder, PacketSender,
    PacketType, RateLimiter, SequenceNumber, Serde, ServerId, SessionId, SessionScope,
    SessionTicket, SpatialAddress, StandardHeader,
};

use crate::error::EditError;

/// End-of-records marker
const TERMINATOR_BITS: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditStatus {
    /// Coalesced into a packet for this server
    Queued(ServerId),
    /// No known server owns the address yet
    AwaitingJurisdiction,
    /// Sending is switched off, the edit was dropped
    Disabled,
}

struct PendingEdit<R> {
    entry: EditEntry<R>,
    bits: u32,
    ticket: SessionTicket,
}

struct OpenBatch<R> {
    server: ServerId,
    entries: Vec<EditEntry<R>>,
    bits: u32,
}

/// Turns addressed edit records into EditRecords packets for the servers
/// that own them. Records wait while their owner is unknown, are packed as
/// tightly as the packet size allows and leave at a bounded rate.
pub struct EditPacketSender<R: Serde> {
    scope: SessionScope,
    config: EditSenderConfig,
    max_packet_bytes: usize,
    should_send: bool,
    pending: VecDeque<PendingEdit<R>>,
    open: Vec<OpenBatch<R>>,
    outbox: VecDeque<(ServerId, Vec<EditEntry<R>>)>,
    sequences: HashMap<ServerId, SequenceNumber>,
    rate_limiter: RateLimiter,
    edits_queued: u64,
    edits_rejected: u64,
    packets_sent: u64,
}

impl<R: Serde> EditPacketSender<R> {
    pub fn new(session: SessionId, config: EditSenderConfig, max_packet_bytes: usize) -> Self {
        let rate_limiter = RateLimiter::new(config.idle_poll_rate);
        Self {
            scope: SessionScope::new(session),
            config,
            max_packet_bytes,
            should_send: true,
            pending: VecDeque::new(),
            open: Vec::new(),
            outbox: VecDeque::new(),
            sequences: HashMap::new(),
            rate_limiter,
            edits_queued: 0,
            edits_rejected: 0,
            packets_sent: 0,
        }
    }

    pub fn session(&self) -> SessionId {
        self.scope.id()
    }

    /// A ticket that stays valid until `teardown`
    pub fn ticket(&self) -> SessionTicket {
        self.scope.ticket()
    }

    /// Bits of records one packet can carry
    pub fn record_capacity(&self) -> u32 {
        let header = StandardHeader::sequenced(PacketType::EditRecords, self.scope.id(), 0);
        PacketBuilder::payload_capacity(&header, self.max_packet_bytes)
            .saturating_sub(TERMINATOR_BITS)
    }

    pub fn queue_edit(
        &mut self,
        registry: &mut JurisdictionRegistry,
        address: SpatialAddress,
        record: R,
    ) -> Result<EditStatus, EditError> {
        if !self.should_send {
            trace!("edit sending disabled, dropping edit at {}", address);
            return Ok(EditStatus::Disabled);
        }

        let entry = EditEntry { address, record };
        let bits = entry.bit_length();
        let capacity = self.record_capacity();
        if bits > capacity {
            self.edits_rejected += 1;
            return Err(EditError::RecordTooLarge {
                bits_needed: bits,
                bits_free: capacity,
            });
        }

        self.edits_queued += 1;
        match registry.resolve(&entry.address) {
            Some(server) => {
                self.coalesce(server, entry, bits);
                Ok(EditStatus::Queued(server))
            }
            None => {
                debug!("no jurisdiction for {} yet, holding edit", entry.address);
                self.pending.push_back(PendingEdit {
                    entry,
                    bits,
                    ticket: self.scope.ticket(),
                });
                Ok(EditStatus::AwaitingJurisdiction)
            }
        }
    }

    /// Routes held edits whose owner has become known, keeping submission order.
    pub fn on_jurisdiction_changed(&mut self, registry: &mut JurisdictionRegistry) {
        let mut still_pending = VecDeque::new();
        while let Some(pending) = self.pending.pop_front() {
            if !pending.ticket.is_valid() {
                continue;
            }
            match registry.resolve(&pending.entry.address) {
                Some(server) => self.coalesce(server, pending.entry, pending.bits),
                None => still_pending.push_back(pending),
            }
        }
        self.pending = still_pending;
    }

    /// Seals every open packet so it can be sent.
    pub fn release_queued(&mut self) {
        for batch in self.open.drain(..) {
            self.outbox.push_back((batch.server, batch.entries));
        }
    }

    /// Sends as many sealed packets as the rate allows. Returns how many went out.
    pub fn send_packets(
        &mut self,
        now: &Instant,
        sender: &mut dyn PacketSender,
        registry: &JurisdictionRegistry,
    ) -> usize {
        let rate = if registry.known_server_count() == 0 {
            self.config.idle_poll_rate
        } else {
            self.config.packets_per_second
        };
        self.rate_limiter.set_rate(rate);
        self.release_queued();
        self.requeue_orphaned(registry);

        let mut sent = 0;
        while !self.outbox.is_empty() {
            if self.rate_limiter.available(now) == 0 {
                trace!("{} edit packets waiting on rate limit", self.outbox.len());
                break;
            }
            let Some((server, entries)) = self.outbox.pop_front() else {
                break;
            };

            let sequence = self
                .sequences
                .get(&server)
                .copied()
                .unwrap_or(0)
                .wrapping_add(1);
            let Some(packet) = self.build_packet(sequence, &entries) else {
                warn!("dropping {} edits for {} that do not fit a packet", entries.len(), server);
                continue;
            };
            if !self.rate_limiter.try_acquire(now) {
                self.outbox.push_front((server, entries));
                break;
            }
            self.sequences.insert(server, sequence);

            match sender.send(&server, &packet) {
                Ok(()) => {
                    sent += 1;
                    self.packets_sent += 1;
                }
                Err(err) => warn!("edit packet to {} not sent: {}", server, err),
            }
        }
        sent
    }

    pub fn set_should_send(&mut self, should_send: bool) {
        self.should_send = should_send;
    }

    pub fn should_send(&self) -> bool {
        self.should_send
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Packets sealed or open, not yet sent
    pub fn queued_packet_count(&self) -> usize {
        self.outbox.len() + self.open.len()
    }

    pub fn edits_queued(&self) -> u64 {
        self.edits_queued
    }

    pub fn edits_rejected(&self) -> u64 {
        self.edits_rejected
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// Drops everything queued and invalidates outstanding tickets.
    pub fn teardown(&mut self) {
        self.scope.teardown();
        self.pending.clear();
        self.open.clear();
        self.outbox.clear();
        self.sequences.clear();
    }

    fn build_packet(&self, sequence: SequenceNumber, entries: &[EditEntry<R>]) -> Option<Vec<u8>> {
        let header = StandardHeader::sequenced(PacketType::EditRecords, self.scope.id(), sequence);
        let mut builder = PacketBuilder::new(header, self.max_packet_bytes);
        builder.reserve_bits(TERMINATOR_BITS);
        for entry in entries {
            if let Err(err) = builder.try_write(entry) {
                warn!("edit packet {} overflowed: {}", sequence, err);
                return None;
            }
        }
        builder.release_bits(TERMINATOR_BITS);
        builder.try_write(&false).ok()?;
        Some(builder.finish())
    }

    /// Sealed packets whose server has left go back to waiting for an owner
    fn requeue_orphaned(&mut self, registry: &JurisdictionRegistry) {
        let outbox = std::mem::take(&mut self.outbox);
        for (server, entries) in outbox {
            if registry.map_for(&server).is_some() {
                self.outbox.push_back((server, entries));
                continue;
            }
            debug!("{} left with {} edits unsent, holding them", server, entries.len());
            for entry in entries {
                let bits = entry.bit_length();
                self.pending.push_back(PendingEdit {
                    entry,
                    bits,
                    ticket: self.scope.ticket(),
                });
            }
        }
    }

    fn coalesce(&mut self, server: ServerId, entry: EditEntry<R>, bits: u32) {
        let capacity = self.record_capacity();
        let index = match self.open.iter().position(|batch| batch.server == server) {
            Some(index) if self.open[index].bits + bits <= capacity => index,
            Some(index) => {
                let full = self.open.remove(index);
                self.outbox.push_back((full.server, full.entries));
                self.open.push(OpenBatch {
                    server,
                    entries: Vec::new(),
                    bits: 0,
                });
                self.open.len() - 1
            }
            None => {
                self.open.push(OpenBatch {
                    server,
                    entries: Vec::new(),
                    bits: 0,
                });
                self.open.len() - 1
            }
        };

        let batch = &mut self.open[index];
        batch.entries.push(entry);
        batch.bits += bits;
    }
}
