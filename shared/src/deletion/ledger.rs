use std::collections::VecDeque;

use crate::types::{Timestamp, TreeNodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeletionRecord {
    pub node_id: TreeNodeId,
    pub deleted_at: Timestamp,
}

/// Append-only log of deleted tree nodes, kept so that peers which missed
/// the deletions can be told about them later.
///
/// Timestamps are strictly increasing, pruned records included: a deletion
/// stamped at or before the newest stamp ever issued is moved to just after it.
#[derive(Default)]
pub struct DeletionLedger {
    records: VecDeque<DeletionRecord>,
    last_stamp: Option<Timestamp>,
}

impl DeletionLedger {
    pub fn new() -> Self {
        Self {
            records: VecDeque::new(),
            last_stamp: None,
        }
    }

    /// Returns the timestamp actually recorded
    pub fn record_deletion(&mut self, node_id: TreeNodeId, now: Timestamp) -> Timestamp {
        let deleted_at = match self.last_stamp {
            Some(last) if now <= last => last.saturating_add(1),
            _ => now,
        };
        self.records.push_back(DeletionRecord {
            node_id,
            deleted_at,
        });
        self.last_stamp = Some(deleted_at);
        deleted_at
    }

    /// Lowest stamp the next deletion can receive
    pub fn next_stamp(&self) -> Timestamp {
        self.last_stamp.map_or(0, |last| last.saturating_add(1))
    }

    /// Records with `deleted_at >= since`, oldest first
    pub fn records_since(&self, since: Timestamp) -> impl Iterator<Item = &DeletionRecord> {
        let start = self.records.partition_point(|record| record.deleted_at < since);
        self.records.range(start..)
    }

    pub fn deletions_since(&self, since: Timestamp) -> Vec<TreeNodeId> {
        self.records_since(since).map(|record| record.node_id).collect()
    }

    pub fn has_deletions_since(&self, since: Timestamp) -> bool {
        self.latest().is_some_and(|latest| latest >= since)
    }

    /// Drops every record older than `horizon`, returning how many went
    pub fn prune(&mut self, horizon: Timestamp) -> usize {
        let count = self.records.partition_point(|record| record.deleted_at < horizon);
        self.records.drain(..count);
        count
    }

    pub fn latest(&self) -> Option<Timestamp> {
        self.records.back().map(|record| record.deleted_at)
    }

    pub fn oldest(&self) -> Option<Timestamp> {
        self.records.front().map(|record| record.deleted_at)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.last_stamp = None;
    }
}
