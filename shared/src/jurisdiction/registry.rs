use std::{collections::HashMap, time::Duration};

use log::{debug, error, info, warn};
use voxnet_serde::MTU_SIZE_BYTES;

use crate::{
    backends::{Instant, Timer},
    config::JurisdictionConfig,
    directory::NodeDirectory,
    jurisdiction::JurisdictionMap,
    packet::{JurisdictionRequest, PacketBuilder, PacketType, StandardHeader},
    session::{ServerId, SessionId},
    spatial_address::SpatialAddress,
    transport::PacketSender,
    types::NodeRole,
};

const MAX_BACKOFF_LEVEL: u32 = 16;

pub struct RegistryEntry {
    pub map: JurisdictionMap,
    /// Order in which servers first supplied a map
    pub first_seen: u64,
    pub last_updated: Instant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted,
    Refreshed,
    /// Sender is not a connected node
    UnknownServer,
    RoleMismatch,
    /// The map overlaps one already held for another server, which is kept
    Conflict { existing: ServerId },
}

/// Jurisdiction maps of every server of one role, refreshed on a schedule
/// that tightens while lookups fail and relaxes once all maps are in.
pub struct JurisdictionRegistry {
    role: NodeRole,
    config: JurisdictionConfig,
    entries: HashMap<ServerId, RegistryEntry>,
    conflicts: Vec<(ServerId, ServerId)>,
    next_order: u64,
    resolve_failed: bool,
    backoff_level: u32,
    ingested_since_broadcast: bool,
    refresh_timer: Timer,
    has_broadcast: bool,
}

impl JurisdictionRegistry {
    pub fn new(role: NodeRole, config: JurisdictionConfig) -> Self {
        let refresh_timer = Timer::new_ringing(config.steady_interval);
        Self {
            role,
            config,
            entries: HashMap::new(),
            conflicts: Vec::new(),
            next_order: 0,
            resolve_failed: false,
            backoff_level: 0,
            ingested_since_broadcast: false,
            refresh_timer,
            has_broadcast: false,
        }
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Sends a JurisdictionRequest to every connected server of the role.
    /// Returns how many were handed to the transport.
    pub fn request_maps_for_role(
        &mut self,
        directory: &dyn NodeDirectory,
        sender: &mut dyn PacketSender,
        session: SessionId,
        now: &Instant,
    ) -> usize {
        let mut sent = 0;
        for server in directory.nodes_by_role(self.role) {
            let header = StandardHeader::new(PacketType::JurisdictionRequest, session);
            let Ok(packet) =
                PacketBuilder::single(header, MTU_SIZE_BYTES, &JurisdictionRequest { role: self.role })
            else {
                continue;
            };
            match sender.send(&server, &packet) {
                Ok(()) => sent += 1,
                Err(err) => warn!("jurisdiction request to {} failed: {}", server, err),
            }
        }
        self.refresh_timer.reset(now);
        self.has_broadcast = true;
        self.resolve_failed = false;
        self.ingested_since_broadcast = false;
        sent
    }

    pub fn ingest(
        &mut self,
        directory: &dyn NodeDirectory,
        server: ServerId,
        map: JurisdictionMap,
        now: &Instant,
    ) -> IngestOutcome {
        if !directory.is_connected(&server) {
            warn!("ignoring jurisdiction from unknown server {}", server);
            return IngestOutcome::UnknownServer;
        }
        if map.role() != self.role {
            debug!(
                "ignoring {:?} jurisdiction from {}, registry tracks {:?}",
                map.role(),
                server,
                self.role
            );
            return IngestOutcome::RoleMismatch;
        }

        let mut overlapping: Vec<(&ServerId, &RegistryEntry)> = self
            .entries
            .iter()
            .filter(|(id, entry)| **id != server && entry.map.overlaps(&map))
            .collect();
        overlapping.sort_by_key(|(_, entry)| entry.first_seen);
        if let Some((existing, _)) = overlapping.first() {
            let existing = **existing;
            if self.conflicts.contains(&(existing, server)) {
                debug!("jurisdiction of {} still overlaps that of {}", server, existing);
            } else {
                error!(
                    "jurisdiction of {} overlaps that of {}, keeping the earlier map",
                    server, existing
                );
                self.conflicts.push((existing, server));
            }
            return IngestOutcome::Conflict { existing };
        }

        self.backoff_level = 0;
        self.ingested_since_broadcast = true;
        self.conflicts.retain(|(_, rejected)| *rejected != server);

        match self.entries.get_mut(&server) {
            Some(entry) => {
                entry.map = map;
                entry.last_updated = *now;
                IngestOutcome::Refreshed
            }
            None => {
                info!(
                    "{:?} {} has jurisdiction {:?}",
                    self.role,
                    server,
                    map.root().map(|root| root.to_string())
                );
                self.entries.insert(
                    server,
                    RegistryEntry {
                        map,
                        first_seen: self.next_order,
                        last_updated: *now,
                    },
                );
                self.next_order += 1;
                IngestOutcome::Inserted
            }
        }
    }

    /// The single server whose jurisdiction contains `addr`. A miss makes
    /// the next refresh come early.
    pub fn resolve(&mut self, addr: &SpatialAddress) -> Option<ServerId> {
        let owner = self.owner_of(addr);
        if owner.is_none() {
            self.resolve_failed = true;
        }
        owner
    }

    pub fn owner_of(&self, addr: &SpatialAddress) -> Option<ServerId> {
        let mut owners = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.map.contains(addr))
            .map(|(id, _)| *id);
        let owner = owners.next()?;
        if owners.next().is_some() {
            return None;
        }
        Some(owner)
    }

    pub fn on_server_removed(&mut self, server: &ServerId) {
        if self.entries.remove(server).is_some() {
            info!("{:?} {} removed from jurisdiction registry", self.role, server);
        }
        self.conflicts.retain(|(kept, rejected)| kept != server && rejected != server);
    }

    pub fn retain_connected(&mut self, directory: &dyn NodeDirectory) {
        let mut gone: Vec<ServerId> = self
            .entries
            .keys()
            .chain(self.conflicts.iter().map(|(_, rejected)| rejected))
            .filter(|id| !directory.is_connected(id))
            .copied()
            .collect();
        gone.sort();
        gone.dedup();
        for server in gone {
            self.on_server_removed(&server);
        }
    }

    /// Interval until the next broadcast, given the servers currently connected
    pub fn refresh_interval(&self, directory: &dyn NodeDirectory) -> Duration {
        let known = directory.nodes_by_role(self.role);
        if known.is_empty() {
            return self.config.no_server_interval;
        }

        if !self.is_unsettled(directory) {
            return self.config.steady_interval;
        }

        let base = self.config.refresh_interval / known.len() as u32;
        let scaled = base.saturating_mul(1u32 << self.backoff_level.min(MAX_BACKOFF_LEVEL));
        scaled.min(self.config.steady_interval)
    }

    /// A lookup failed since the last broadcast, or a connected server has
    /// not supplied its map yet. A server whose map was rejected as
    /// overlapping is not waited on.
    pub fn is_unsettled(&self, directory: &dyn NodeDirectory) -> bool {
        self.resolve_failed
            || directory
                .nodes_by_role(self.role)
                .iter()
                .any(|id| !self.entries.contains_key(id) && !self.is_rejected(id))
    }

    fn is_rejected(&self, server: &ServerId) -> bool {
        self.conflicts.iter().any(|(_, rejected)| rejected == server)
    }

    /// Purges departed servers and re-requests maps when due. Returns the
    /// number of requests sent.
    pub fn update(
        &mut self,
        now: &Instant,
        directory: &dyn NodeDirectory,
        sender: &mut dyn PacketSender,
        session: SessionId,
    ) -> usize {
        self.retain_connected(directory);

        let interval = self.refresh_interval(directory);
        self.refresh_timer.set_duration(interval);
        if !self.refresh_timer.ringing(now) {
            return 0;
        }
        if self.has_broadcast {
            let servers_known = !directory.nodes_by_role(self.role).is_empty();
            if servers_known && self.is_unsettled(directory) && !self.ingested_since_broadcast {
                self.backoff_level = (self.backoff_level + 1).min(MAX_BACKOFF_LEVEL);
            }
        }

        self.request_maps_for_role(directory, sender, session, now)
    }

    pub fn known_server_count(&self) -> usize {
        self.entries.len()
    }

    pub fn map_for(&self, server: &ServerId) -> Option<&JurisdictionMap> {
        self.entries.get(server).map(|entry| &entry.map)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ServerId, &RegistryEntry)> {
        self.entries.iter()
    }

    /// `(kept, rejected)` server pairs whose maps overlapped
    pub fn conflicts(&self) -> &[(ServerId, ServerId)] {
        &self.conflicts
    }

    pub fn backoff_level(&self) -> u32 {
        self.backoff_level
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.conflicts.clear();
        self.resolve_failed = false;
        self.backoff_level = 0;
        self.ingested_since_broadcast = false;
        self.refresh_timer.ring_manual();
        self.has_broadcast = false;
    }
}
