mod horizon;
mod ledger;

pub use horizon::{compute_horizon, Horizon, PeerDeletionCursor};
pub use ledger::{DeletionLedger, DeletionRecord};
