use std::{default::Default, time::Duration};

use voxnet_serde::MTU_SIZE_BYTES;

/// Contains Config properties shared by every replication participant
#[derive(Clone, Debug)]
pub struct ReplicationConfig {
    /// Upper bound on the size of any datagram this node produces
    pub max_packet_bytes: usize,
    pub edit: EditSenderConfig,
    pub jurisdiction: JurisdictionConfig,
    pub sequencer: SequencerConfig,
    pub deletion: DeletionConfig,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            max_packet_bytes: MTU_SIZE_BYTES,
            edit: EditSenderConfig::default(),
            jurisdiction: JurisdictionConfig::default(),
            sequencer: SequencerConfig::default(),
            deletion: DeletionConfig::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EditSenderConfig {
    /// Edit packets allowed per second while servers are known
    pub packets_per_second: u32,
    /// Rate used while no server of the role is known
    pub idle_poll_rate: u32,
}

impl Default for EditSenderConfig {
    fn default() -> Self {
        Self {
            packets_per_second: 60,
            idle_poll_rate: 60,
        }
    }
}

#[derive(Clone, Debug)]
pub struct JurisdictionConfig {
    /// How often to look for servers while none are known
    pub no_server_interval: Duration,
    /// Request interval while unsettled, divided across the known servers
    pub refresh_interval: Duration,
    /// Request interval once every known server has supplied a map
    pub steady_interval: Duration,
}

impl Default for JurisdictionConfig {
    fn default() -> Self {
        Self {
            no_server_interval: Duration::from_micros(16_667),
            refresh_interval: Duration::from_secs(1),
            steady_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SequencerConfig {
    /// Unacknowledged deltas kept before falling back to a full baseline
    pub max_in_flight: usize,
    /// How long a sequence gap may persist before a resync is requested
    pub hold_window: Duration,
    /// Out-of-order packets held at most
    pub max_held: usize,
    /// A delta unacknowledged for this long is followed by a full baseline
    pub ack_timeout: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 256,
            hold_window: Duration::from_millis(250),
            max_held: 64,
            ack_timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeletionConfig {
    /// Peers silent for longer no longer hold back ledger pruning
    pub peer_unreachable_after: Duration,
    /// Unacknowledged deletion notices are re-sent after this long
    pub notice_resend_interval: Duration,
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            peer_unreachable_after: Duration::from_secs(30),
            notice_resend_interval: Duration::from_millis(250),
        }
    }
}
