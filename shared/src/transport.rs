use thiserror::Error;

use crate::session::SessionId;

/// Errors that can occur while handing a datagram to the transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("No route to session {destination}")]
    Unreachable { destination: SessionId },
    #[error("Outgoing queue is full, datagram of {size} bytes dropped")]
    QueueFull { size: usize },
    #[error("Transport failure: {0}")]
    Io(String),
}

/// Non-blocking datagram output, addressed by session.
pub trait PacketSender {
    fn send(&mut self, destination: &SessionId, payload: &[u8]) -> Result<(), TransportError>;
}

/// Non-blocking datagram input. `Ok(None)` means nothing is waiting.
pub trait PacketReceiver {
    fn receive(&mut self) -> Result<Option<(SessionId, Vec<u8>)>, TransportError>;
}
