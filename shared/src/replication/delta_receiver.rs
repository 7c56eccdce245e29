use std::time::Duration;

use log::{debug, warn};

use crate::{
    backends::{Instant, Timer},
    packet::ResyncRequest,
    replication::{DeltaBaseline, TreeStore},
    sequence_greater_than,
    sequence_list::SequenceList,
    spatial_address::SpatialAddress,
    types::{Generation, SequenceNumber},
};

pub struct IncomingDelta {
    pub baseline: DeltaBaseline,
    pub generation: Generation,
    pub payload: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// `applied` packets went into the tree, this one and any it unblocked
    Applied {
        applied: usize,
        affected: Vec<SpatialAddress>,
    },
    /// Already applied or already held
    Stale,
    /// Held until the gap before it closes
    Buffered,
    /// Cannot continue without a full baseline
    ResyncNeeded,
}

/// Puts sequenced deltas from one server back into order and applies them.
/// A delta is only applied on top of the generation it was computed against.
pub struct DeltaReceiver {
    last_applied: Option<SequenceNumber>,
    held_generation: Option<Generation>,
    holding: SequenceList<IncomingDelta>,
    gap_timer: Option<Timer>,
    hold_window: Duration,
    max_held: usize,
    awaiting_resync: bool,
    resync_timer: Timer,
    pending_ack: bool,
    resyncs_requested: u64,
}

impl DeltaReceiver {
    pub fn new(hold_window: Duration, max_held: usize) -> Self {
        Self {
            last_applied: None,
            held_generation: None,
            holding: SequenceList::new(),
            gap_timer: None,
            hold_window,
            max_held,
            awaiting_resync: false,
            resync_timer: Timer::new_ringing(hold_window),
            pending_ack: false,
            resyncs_requested: 0,
        }
    }

    pub fn last_applied(&self) -> Option<SequenceNumber> {
        self.last_applied
    }

    pub fn held_generation(&self) -> Option<Generation> {
        self.held_generation
    }

    pub fn held_count(&self) -> usize {
        self.holding.len()
    }

    pub fn is_awaiting_resync(&self) -> bool {
        self.awaiting_resync
    }

    pub fn resyncs_requested(&self) -> u64 {
        self.resyncs_requested
    }

    pub fn receive(
        &mut self,
        sequence: SequenceNumber,
        delta: IncomingDelta,
        now: &Instant,
        store: &mut dyn TreeStore,
    ) -> ReceiveOutcome {
        self.pending_ack = true;

        if let Some(last_applied) = self.last_applied {
            if !sequence_greater_than(sequence, last_applied) {
                debug!("discarding stale delta {}", sequence);
                return ReceiveOutcome::Stale;
            }
        }
        if self.holding.contains_scan_from_back(&sequence) {
            debug!("discarding duplicate delta {}", sequence);
            return ReceiveOutcome::Stale;
        }

        if delta.baseline == DeltaBaseline::Full {
            // anything held at or before a full baseline is superseded by it
            self.holding.drain_through(sequence);
            let mut affected = Vec::new();
            if !self.apply(sequence, delta, store, &mut affected) {
                return ReceiveOutcome::ResyncNeeded;
            }
            self.awaiting_resync = false;
            self.resync_timer.ring_manual();
            let applied = 1 + self.drain_consecutive(store, &mut affected);
            self.update_gap(now);
            return ReceiveOutcome::Applied { applied, affected };
        }

        let next_expected = self.last_applied.map(|last| last.wrapping_add(1));
        if next_expected == Some(sequence) {
            let DeltaBaseline::Since(baseline) = delta.baseline else {
                return ReceiveOutcome::ResyncNeeded;
            };
            if self.held_generation != Some(baseline) {
                warn!(
                    "delta {} builds on generation {} but replica holds {:?}, requesting resync",
                    sequence, baseline, self.held_generation
                );
                self.awaiting_resync = true;
                return ReceiveOutcome::ResyncNeeded;
            }

            let mut affected = Vec::new();
            if !self.apply(sequence, delta, store, &mut affected) {
                return ReceiveOutcome::ResyncNeeded;
            }
            let applied = 1 + self.drain_consecutive(store, &mut affected);
            self.update_gap(now);
            return ReceiveOutcome::Applied { applied, affected };
        }

        // ahead of what we can apply
        if self.holding.len() >= self.max_held {
            warn!(
                "holding area full at {} deltas, requesting resync",
                self.holding.len()
            );
            self.awaiting_resync = true;
            return ReceiveOutcome::ResyncNeeded;
        }
        if self.holding.try_insert_scan_from_back(sequence, delta).is_err() {
            return ReceiveOutcome::Stale;
        }
        if self.gap_timer.is_none() {
            self.gap_timer = Some(Timer::new(self.hold_window, now));
        }
        ReceiveOutcome::Buffered
    }

    /// Produces a resync request once a gap has outlived the hold window, and
    /// again every hold window until a full baseline arrives.
    pub fn take_resync_request(&mut self, now: &Instant) -> Option<ResyncRequest> {
        if !self.awaiting_resync {
            if let Some(gap_timer) = &self.gap_timer {
                if gap_timer.ringing(now) {
                    warn!(
                        "sequence gap after {:?} persisted for {:?}, requesting resync",
                        self.last_applied, self.hold_window
                    );
                    self.awaiting_resync = true;
                }
            }
        }

        if !self.awaiting_resync {
            return None;
        }
        if !self.resync_timer.ringing(now) {
            return None;
        }

        self.resync_timer.reset(now);
        self.resyncs_requested += 1;
        Some(ResyncRequest {
            last_applied: self.last_applied,
        })
    }

    /// The cumulative ack owed since the last call, if any
    pub fn take_ack(&mut self) -> Option<SequenceNumber> {
        if !self.pending_ack {
            return None;
        }
        self.pending_ack = false;
        self.last_applied
    }

    pub fn reset(&mut self) {
        self.last_applied = None;
        self.held_generation = None;
        self.holding.clear();
        self.gap_timer = None;
        self.awaiting_resync = false;
        self.resync_timer.ring_manual();
        self.pending_ack = false;
    }

    fn apply(
        &mut self,
        sequence: SequenceNumber,
        delta: IncomingDelta,
        store: &mut dyn TreeStore,
        affected: &mut Vec<SpatialAddress>,
    ) -> bool {
        match store.apply_delta(delta.baseline, &delta.payload) {
            Ok(applied) => {
                if applied.generation != delta.generation {
                    debug!(
                        "delta {} announced generation {} but tree reports {}",
                        sequence, delta.generation, applied.generation
                    );
                }
                self.last_applied = Some(sequence);
                self.held_generation = Some(delta.generation);
                affected.extend(applied.affected);
                true
            }
            Err(err) => {
                warn!("dropping delta {}: {}", sequence, err);
                self.awaiting_resync = true;
                false
            }
        }
    }

    fn drain_consecutive(
        &mut self,
        store: &mut dyn TreeStore,
        affected: &mut Vec<SpatialAddress>,
    ) -> usize {
        let mut applied = 0;
        loop {
            let Some(last_applied) = self.last_applied else {
                return applied;
            };
            let Some((front_sequence, _)) = self.holding.front() else {
                return applied;
            };
            let front_sequence = *front_sequence;

            if !sequence_greater_than(front_sequence, last_applied) {
                self.holding.pop_front();
                continue;
            }
            if front_sequence != last_applied.wrapping_add(1) {
                return applied;
            }
            let Some((sequence, delta)) = self.holding.pop_front() else {
                return applied;
            };

            let fits = match delta.baseline {
                DeltaBaseline::Full => true,
                DeltaBaseline::Since(baseline) => self.held_generation == Some(baseline),
            };
            if !fits {
                warn!("held delta {} does not build on the replica, requesting resync", sequence);
                self.awaiting_resync = true;
                return applied;
            }
            if !self.apply(sequence, delta, store, affected) {
                return applied;
            }
            applied += 1;
        }
    }

    fn update_gap(&mut self, now: &Instant) {
        if self.holding.is_empty() {
            self.gap_timer = None;
        } else {
            self.gap_timer = Some(Timer::new(self.hold_window, now));
        }
    }
}
