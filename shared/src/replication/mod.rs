mod delta_receiver;
mod delta_sender;
mod tree;

pub use delta_receiver::{DeltaReceiver, IncomingDelta, ReceiveOutcome};
pub use delta_sender::{DeltaSender, OutgoingDelta};
pub use tree::{AppliedDelta, DeltaBaseline, TreeError, TreeObserver, TreeSource, TreeStore};
