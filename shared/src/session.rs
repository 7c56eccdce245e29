use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use voxnet_serde::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr};

/// 128-bit identifier of one participant's session. Servers are addressed by
/// the session they announced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u128);

pub type ServerId = SessionId;

impl SessionId {
    pub const NULL: SessionId = SessionId(0);

    pub fn generate() -> Self {
        loop {
            let value = fastrand::u128(..);
            if value != 0 {
                return Self(value);
            }
        }
    }

    pub fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub fn to_u128(&self) -> u128 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u128> for SessionId {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Serde for SessionId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u128::de(reader)?))
    }

    fn bit_length(&self) -> u32 {
        <Self as ConstBitLength>::const_bit_length()
    }
}

impl ConstBitLength for SessionId {
    fn const_bit_length() -> u32 {
        <u128 as ConstBitLength>::const_bit_length()
    }
}

/// Owner of a session's lifetime. Work scheduled during the session holds a
/// `SessionTicket`; after `teardown` every outstanding ticket is invalid.
pub struct SessionScope {
    id: SessionId,
    epoch: Arc<AtomicU64>,
    current: u64,
}

impl SessionScope {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            epoch: Arc::new(AtomicU64::new(0)),
            current: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn ticket(&self) -> SessionTicket {
        SessionTicket {
            issued: self.current,
            epoch: self.epoch.clone(),
        }
    }

    /// Invalidates every ticket handed out so far.
    pub fn teardown(&mut self) {
        self.current = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
    }
}

#[derive(Clone)]
pub struct SessionTicket {
    issued: u64,
    epoch: Arc<AtomicU64>,
}

impl SessionTicket {
    pub fn is_valid(&self) -> bool {
        self.epoch.load(Ordering::Acquire) == self.issued
    }
}
