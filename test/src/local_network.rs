/// In-memory datagram network for E2E testing.
/// Routes packets between sessions without network I/O, with optional
/// seeded packet loss.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use voxnet_shared::{PacketReceiver, PacketSender, SessionId, TransportError};

const DEFAULT_QUEUE_CAPACITY: usize = 4096;

#[derive(Clone, Debug)]
pub struct LinkConditionerConfig {
    /// Chance in 0.0..=1.0 that any datagram is dropped
    pub loss: f32,
    pub seed: u64,
}

impl LinkConditionerConfig {
    pub fn lossy(loss: f32, seed: u64) -> Self {
        Self { loss, seed }
    }
}

struct NetworkState {
    inboxes: HashMap<SessionId, VecDeque<(SessionId, Vec<u8>)>>,
    capacity: usize,
    conditioner: Option<(LinkConditionerConfig, fastrand::Rng)>,
    /// Datagrams still to be dropped, per destination
    drop_next: HashMap<SessionId, usize>,
    sent: u64,
    dropped: u64,
}

/// Shared medium all endpoints send through
#[derive(Clone)]
pub struct LocalNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(NetworkState {
                inboxes: HashMap::new(),
                capacity: DEFAULT_QUEUE_CAPACITY,
                conditioner: None,
                drop_next: HashMap::new(),
                sent: 0,
                dropped: 0,
            })),
        }
    }

    pub fn with_conditioner(config: LinkConditionerConfig) -> Self {
        let network = Self::new();
        {
            let mut state = network.state.lock().unwrap();
            let rng = fastrand::Rng::with_seed(config.seed);
            state.conditioner = Some((config, rng));
        }
        network
    }

    /// Changes the loss rate of a conditioned network
    pub fn set_loss(&self, loss: f32) {
        if let Some((config, _)) = self.state.lock().unwrap().conditioner.as_mut() {
            config.loss = loss;
        }
    }

    pub fn set_capacity(&self, capacity: usize) {
        self.state.lock().unwrap().capacity = capacity;
    }

    /// Registers `session` on the network and returns its socket
    pub fn endpoint(&self, session: SessionId) -> LocalEndpoint {
        self.state
            .lock()
            .unwrap()
            .inboxes
            .entry(session)
            .or_default();
        LocalEndpoint {
            session,
            network: self.clone(),
        }
    }

    pub fn remove_endpoint(&self, session: &SessionId) {
        self.state.lock().unwrap().inboxes.remove(session);
    }

    /// Drops the next `count` datagrams addressed to `destination`
    pub fn drop_next(&self, destination: SessionId, count: usize) {
        *self
            .state
            .lock()
            .unwrap()
            .drop_next
            .entry(destination)
            .or_insert(0) += count;
    }

    /// Takes everything queued for `destination`, oldest first
    pub fn drain_inbox(&self, destination: &SessionId) -> Vec<(SessionId, Vec<u8>)> {
        self.state
            .lock()
            .unwrap()
            .inboxes
            .get_mut(destination)
            .map(|inbox| inbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Puts a datagram straight into `destination`'s inbox
    pub fn deliver(&self, destination: SessionId, from: SessionId, payload: Vec<u8>) {
        if let Some(inbox) = self.state.lock().unwrap().inboxes.get_mut(&destination) {
            inbox.push_back((from, payload));
        }
    }

    pub fn pending_for(&self, destination: &SessionId) -> usize {
        self.state
            .lock()
            .unwrap()
            .inboxes
            .get(destination)
            .map_or(0, VecDeque::len)
    }

    pub fn sent_count(&self) -> u64 {
        self.state.lock().unwrap().sent
    }

    pub fn dropped_count(&self) -> u64 {
        self.state.lock().unwrap().dropped
    }

    fn send(
        &self,
        from: SessionId,
        destination: &SessionId,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let capacity = state.capacity;

        let Some(inbox) = state.inboxes.get_mut(destination) else {
            return Err(TransportError::Unreachable {
                destination: *destination,
            });
        };
        if inbox.len() >= capacity {
            return Err(TransportError::QueueFull {
                size: payload.len(),
            });
        }
        state.sent += 1;

        if let Some(remaining) = state.drop_next.get_mut(destination) {
            if *remaining > 0 {
                *remaining -= 1;
                state.dropped += 1;
                return Ok(());
            }
        }
        if let Some((config, rng)) = state.conditioner.as_mut() {
            if rng.f32() < config.loss {
                state.dropped += 1;
                return Ok(());
            }
        }

        inbox.push_back((from, payload.to_vec()));
        Ok(())
    }

    fn receive(&self, session: &SessionId) -> Option<(SessionId, Vec<u8>)> {
        self.state
            .lock()
            .unwrap()
            .inboxes
            .get_mut(session)
            .and_then(VecDeque::pop_front)
    }
}

impl Default for LocalNetwork {
    fn default() -> Self {
        Self::new()
    }
}

/// One session's socket on a LocalNetwork
#[derive(Clone)]
pub struct LocalEndpoint {
    session: SessionId,
    network: LocalNetwork,
}

impl LocalEndpoint {
    pub fn session(&self) -> SessionId {
        self.session
    }
}

impl PacketSender for LocalEndpoint {
    fn send(&mut self, destination: &SessionId, payload: &[u8]) -> Result<(), TransportError> {
        self.network.send(self.session, destination, payload)
    }
}

impl PacketReceiver for LocalEndpoint {
    fn receive(&mut self) -> Result<Option<(SessionId, Vec<u8>)>, TransportError> {
        Ok(self.network.receive(&self.session))
    }
}
