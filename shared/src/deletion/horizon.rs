use std::time::Duration;

use crate::{backends::Instant, session::ServerId, types::Timestamp};

/// What one peer still needs from the deletion ledger.
#[derive(Clone, Copy, Debug)]
pub struct PeerDeletionCursor {
    pub peer: ServerId,
    /// Oldest deletion timestamp the peer has not acknowledged
    pub needs_from: Timestamp,
    pub last_heard: Instant,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Horizon {
    /// Records older than this are no longer needed by any reachable peer.
    /// `None` when no peer constrains pruning.
    pub horizon: Option<Timestamp>,
    /// Peers left out for being silent too long; they need a full resync
    pub excluded: Vec<ServerId>,
}

pub fn compute_horizon(
    cursors: &[PeerDeletionCursor],
    now: &Instant,
    unreachable_after: Duration,
) -> Horizon {
    let mut output = Horizon::default();
    for cursor in cursors {
        if cursor.last_heard.elapsed(now) > unreachable_after {
            output.excluded.push(cursor.peer);
            continue;
        }
        output.horizon = Some(match output.horizon {
            Some(horizon) => horizon.min(cursor.needs_from),
            None => cursor.needs_from,
        });
    }
    output
}
