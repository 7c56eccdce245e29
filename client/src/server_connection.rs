use voxnet_shared::{DeltaReceiver, Instant, SequencerConfig, ServerId, Timestamp};

/// Replication state for one server this client receives a tree from.
pub struct ServerConnection {
    server: ServerId,
    pub(crate) receiver: DeltaReceiver,
    deletions_through: Option<Timestamp>,
    deletion_ack_pending: bool,
    last_heard: Instant,
}

impl ServerConnection {
    pub fn new(server: ServerId, config: &SequencerConfig, now: &Instant) -> Self {
        Self {
            server,
            receiver: DeltaReceiver::new(config.hold_window, config.max_held),
            deletions_through: None,
            deletion_ack_pending: false,
            last_heard: *now,
        }
    }

    pub fn server(&self) -> ServerId {
        self.server
    }

    pub fn receiver(&self) -> &DeltaReceiver {
        &self.receiver
    }

    pub fn deletions_through(&self) -> Option<Timestamp> {
        self.deletions_through
    }

    pub fn last_heard(&self) -> Instant {
        self.last_heard
    }

    pub(crate) fn mark_heard(&mut self, now: &Instant) {
        self.last_heard = *now;
    }

    /// Returns false if the notice was already applied
    pub(crate) fn record_deletions(&mut self, through: Timestamp) -> bool {
        self.deletion_ack_pending = true;
        match self.deletions_through {
            Some(applied) if applied >= through => false,
            _ => {
                self.deletions_through = Some(through);
                true
            }
        }
    }

    pub(crate) fn take_deletion_ack(&mut self) -> bool {
        std::mem::take(&mut self.deletion_ack_pending)
    }
}
