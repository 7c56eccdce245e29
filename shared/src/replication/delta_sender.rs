use std::time::Duration;

use log::debug;

use crate::{
    backends::Instant,
    replication::DeltaBaseline,
    sequence_greater_than,
    sequence_list::SequenceList,
    types::{Generation, SequenceNumber},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutgoingDelta {
    pub sequence: SequenceNumber,
    pub baseline: DeltaBaseline,
    pub generation: Generation,
}

struct SentState {
    sent_at: Instant,
}

/// Numbers outgoing tree deltas and picks the baseline each one is computed
/// against. History is kept until acknowledged.
pub struct DeltaSender {
    next_sequence: SequenceNumber,
    history: SequenceList<SentState>,
    last_sent: Option<(SequenceNumber, Generation)>,
    last_acked: Option<SequenceNumber>,
    max_in_flight: usize,
    force_full: bool,
}

impl DeltaSender {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            next_sequence: 1,
            history: SequenceList::new(),
            last_sent: None,
            last_acked: None,
            max_in_flight: max_in_flight.max(1),
            force_full: false,
        }
    }

    /// Whether a packet is needed to bring the peer to `generation`
    pub fn has_changes(&self, generation: Generation) -> bool {
        match self.last_sent {
            None => true,
            Some((_, last_generation)) => self.force_full || last_generation != generation,
        }
    }

    pub fn prepare(&mut self, generation: Generation, now: &Instant) -> OutgoingDelta {
        let window_exhausted = self.history.len() >= self.max_in_flight;
        if window_exhausted {
            debug!(
                "{} deltas unacknowledged, falling back to a full baseline",
                self.history.len()
            );
            self.history.clear();
        }

        let baseline = match self.last_sent {
            Some((_, last_generation)) if !self.force_full && !window_exhausted => {
                DeltaBaseline::Since(last_generation)
            }
            _ => DeltaBaseline::Full,
        };

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        if let Err(err) = self.history.try_insert_scan_from_back(
            sequence,
            SentState { sent_at: *now },
        ) {
            debug!("delta history out of step: {}", err);
        }

        self.last_sent = Some((sequence, generation));
        self.force_full = false;

        OutgoingDelta {
            sequence,
            baseline,
            generation,
        }
    }

    /// Cumulative: acknowledges every delta up to and including `sequence`.
    pub fn on_ack(&mut self, sequence: SequenceNumber) {
        if let Some(last_acked) = self.last_acked {
            if !sequence_greater_than(sequence, last_acked) {
                return;
            }
        }
        match self.last_sent {
            Some((last_sent, _)) if !sequence_greater_than(sequence, last_sent) => {}
            _ => {
                debug!("ignoring ack for unsent delta {}", sequence);
                return;
            }
        }

        self.history.drain_through(sequence);
        self.last_acked = Some(sequence);
    }

    pub fn request_full_resync(&mut self) {
        self.force_full = true;
        self.history.clear();
    }

    pub fn in_flight(&self) -> usize {
        self.history.len()
    }

    pub fn last_acked(&self) -> Option<SequenceNumber> {
        self.last_acked
    }

    /// Age of the oldest unacknowledged delta
    pub fn oldest_unacked_age(&self, now: &Instant) -> Option<Duration> {
        self.history.front().map(|(_, state)| state.sent_at.elapsed(now))
    }

    pub fn reset(&mut self) {
        self.next_sequence = 1;
        self.history.clear();
        self.last_sent = None;
        self.last_acked = None;
        self.force_full = false;
    }
}
