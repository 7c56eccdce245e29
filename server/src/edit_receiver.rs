use std::collections::HashMap;

use log::{debug, warn};

use voxnet_shared::{
    sequence_greater_than, wrapping_diff, Area, EditEntry, JurisdictionMap, SequenceNumber,
    Serde, SessionId,
};

const RECEIVED_WINDOW: i32 = 64;

/// Newest sequence seen from one sender, plus which of the 64 before it
/// have arrived. Bit `n` stands for `newest - 1 - n`.
struct ReceivedSequences {
    newest: SequenceNumber,
    earlier: u64,
}

enum Arrival {
    First,
    Newer { skipped: u32 },
    Late,
    Repeated,
    TooOld,
}

impl ReceivedSequences {
    fn new(sequence: SequenceNumber) -> Self {
        Self {
            newest: sequence,
            earlier: 0,
        }
    }

    fn record(&mut self, sequence: SequenceNumber) -> Arrival {
        if sequence == self.newest {
            return Arrival::Repeated;
        }
        if sequence_greater_than(sequence, self.newest) {
            let advance = wrapping_diff(self.newest, sequence);
            self.earlier = if advance >= RECEIVED_WINDOW {
                0
            } else {
                (self.earlier << advance) | (1u64 << (advance - 1))
            };
            self.newest = sequence;
            return Arrival::Newer {
                skipped: (advance - 1) as u32,
            };
        }

        let age = wrapping_diff(sequence, self.newest) - 1;
        if age >= RECEIVED_WINDOW {
            return Arrival::TooOld;
        }
        let bit = 1u64 << age;
        if self.earlier & bit != 0 {
            return Arrival::Repeated;
        }
        self.earlier |= bit;
        Arrival::Late
    }
}

/// Accepts decoded edit records, keeping those inside this server's
/// jurisdiction. Each sender's packet sequences are tracked to count loss
/// and to apply a repeated datagram at most once.
pub struct EditReceiver<R: Serde> {
    received: HashMap<SessionId, ReceivedSequences>,
    accepted: Vec<(SessionId, EditEntry<R>)>,
    packets_lost: u64,
    packets_out_of_order: u64,
    packets_discarded: u64,
    records_outside: u64,
}

impl<R: Serde> EditReceiver<R> {
    pub fn new() -> Self {
        Self {
            received: HashMap::new(),
            accepted: Vec::new(),
            packets_lost: 0,
            packets_out_of_order: 0,
            packets_discarded: 0,
            records_outside: 0,
        }
    }

    /// Returns the number of records accepted from this packet
    pub fn process(
        &mut self,
        from: SessionId,
        sequence: SequenceNumber,
        entries: Vec<EditEntry<R>>,
        jurisdiction: &JurisdictionMap,
    ) -> usize {
        let arrival = match self.received.get_mut(&from) {
            Some(received) => received.record(sequence),
            None => {
                self.received.insert(from, ReceivedSequences::new(sequence));
                Arrival::First
            }
        };
        match arrival {
            Arrival::First => {}
            Arrival::Newer { skipped } => {
                if skipped > 0 {
                    debug!("{} edit packets from {} never arrived", skipped, from);
                    self.packets_lost += skipped as u64;
                }
            }
            Arrival::Late => {
                self.packets_out_of_order += 1;
                // counted lost when the gap opened
                self.packets_lost = self.packets_lost.saturating_sub(1);
            }
            Arrival::Repeated => {
                debug!("edit packet {} from {} already applied, dropping", sequence, from);
                self.packets_discarded += 1;
                return 0;
            }
            Arrival::TooOld => {
                debug!("edit packet {} from {} is too old to place, dropping", sequence, from);
                self.packets_discarded += 1;
                return 0;
            }
        }

        let mut accepted = 0;
        for entry in entries {
            match jurisdiction.classify(&entry.address) {
                Area::Within => {
                    self.accepted.push((from, entry));
                    accepted += 1;
                }
                area => {
                    warn!(
                        "edit at {} from {} is {:?} this server's jurisdiction, dropping",
                        entry.address, from, area
                    );
                    self.records_outside += 1;
                }
            }
        }
        accepted
    }

    pub fn take_edits(&mut self) -> Vec<(SessionId, EditEntry<R>)> {
        std::mem::take(&mut self.accepted)
    }

    pub fn packets_lost(&self) -> u64 {
        self.packets_lost
    }

    pub fn packets_out_of_order(&self) -> u64 {
        self.packets_out_of_order
    }

    /// Repeated packets, and packets too far behind to tell
    pub fn packets_discarded(&self) -> u64 {
        self.packets_discarded
    }

    pub fn records_outside(&self) -> u64 {
        self.records_outside
    }

    pub fn forget_sender(&mut self, from: &SessionId) {
        self.received.remove(from);
    }

    pub fn reset(&mut self) {
        self.received.clear();
        self.accepted.clear();
    }
}

impl<R: Serde> Default for EditReceiver<R> {
    fn default() -> Self {
        Self::new()
    }
}
