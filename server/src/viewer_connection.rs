use voxnet_shared::{
    DeltaSender, Instant, PeerDeletionCursor, SequencerConfig, SessionId, Timestamp,
};

/// Replication state for one viewer. Kept for a while after the viewer
/// disconnects so a quick reconnect can resume deletion catch-up.
pub struct ViewerConnection {
    viewer: SessionId,
    pub(crate) deltas: DeltaSender,
    needs_deletions_from: Timestamp,
    last_notice: Option<(Timestamp, Instant)>,
    last_heard: Instant,
    connected: bool,
}

impl ViewerConnection {
    pub fn new(
        viewer: SessionId,
        config: &SequencerConfig,
        needs_deletions_from: Timestamp,
        now: &Instant,
    ) -> Self {
        Self {
            viewer,
            deltas: DeltaSender::new(config.max_in_flight),
            needs_deletions_from,
            last_notice: None,
            last_heard: *now,
            connected: true,
        }
    }

    pub fn viewer(&self) -> SessionId {
        self.viewer
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn deltas(&self) -> &DeltaSender {
        &self.deltas
    }

    /// Oldest deletion the viewer has not acknowledged
    pub fn needs_deletions_from(&self) -> Timestamp {
        self.needs_deletions_from
    }

    pub fn last_heard(&self) -> Instant {
        self.last_heard
    }

    pub fn cursor(&self) -> PeerDeletionCursor {
        PeerDeletionCursor {
            peer: self.viewer,
            needs_from: self.needs_deletions_from,
            last_heard: self.last_heard,
        }
    }

    pub(crate) fn mark_heard(&mut self, now: &Instant) {
        self.last_heard = *now;
    }

    pub(crate) fn set_connected(&mut self, connected: bool, now: &Instant) {
        self.connected = connected;
        if connected {
            self.last_heard = *now;
            // sequence numbers continue so the replica does not discard the
            // full state as stale
            self.deltas.request_full_resync();
            self.last_notice = None;
        }
    }

    pub(crate) fn on_deletions_acked(&mut self, through: Timestamp) {
        let next = through.saturating_add(1);
        if next > self.needs_deletions_from {
            self.needs_deletions_from = next;
        }
        if let Some((notice_through, _)) = self.last_notice {
            if through >= notice_through {
                self.last_notice = None;
            }
        }
    }

    /// Skips every deletion before `from`, after a full resync made them moot
    pub(crate) fn restart_deletions_from(&mut self, from: Timestamp) {
        self.needs_deletions_from = from;
        self.last_notice = None;
    }

    pub(crate) fn last_notice(&self) -> Option<(Timestamp, Instant)> {
        self.last_notice
    }

    pub(crate) fn notice_sent(&mut self, through: Timestamp, now: &Instant) {
        self.last_notice = Some((through, *now));
    }
}
