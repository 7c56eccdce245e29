use std::collections::VecDeque;

use thiserror::Error;

use crate::{sequence_less_than, types::SequenceNumber};

/// Errors that can occur during SequenceList operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// Attempted to insert a duplicate ID into the sequence list
    #[error("Duplicate sequence ID {id} not allowed in SequenceList")]
    DuplicateId { id: SequenceNumber },
}

/// Items kept sorted by wrapping sequence number. Inserts are expected to be
/// mostly in order, so they scan from the back.
pub struct SequenceList<T> {
    list: VecDeque<(SequenceNumber, T)>,
}

impl<T> SequenceList<T> {
    pub fn new() -> Self {
        Self {
            list: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn front(&self) -> Option<&(SequenceNumber, T)> {
        self.list.front()
    }

    pub fn back(&self) -> Option<&(SequenceNumber, T)> {
        self.list.back()
    }

    pub fn pop_front(&mut self) -> Option<(SequenceNumber, T)> {
        self.list.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(SequenceNumber, T)> {
        self.list.iter()
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn contains_scan_from_back(&self, id: &SequenceNumber) -> bool {
        self.get_scan_from_back(id).is_some()
    }

    pub fn get_scan_from_back(&self, id: &SequenceNumber) -> Option<&T> {
        for (old_id, item) in self.list.iter().rev() {
            if *old_id == *id {
                return Some(item);
            }
            if sequence_less_than(*old_id, *id) {
                return None;
            }
        }
        None
    }

    /// Attempts to insert an item with the given ID, scanning from the back.
    /// Returns an error if the ID already exists.
    pub fn try_insert_scan_from_back(
        &mut self,
        id: SequenceNumber,
        item: T,
    ) -> Result<(), SequenceError> {
        let mut index = self.list.len();

        while index > 0 {
            let old_id = self.list[index - 1].0;
            if old_id == id {
                return Err(SequenceError::DuplicateId { id });
            }
            if sequence_less_than(old_id, id) {
                break;
            }
            index -= 1;
        }

        self.list.insert(index, (id, item));
        Ok(())
    }

    pub fn remove_scan_from_front(&mut self, id: &SequenceNumber) -> Option<T> {
        let index = self.list.iter().position(|(old_id, _)| *old_id == *id)?;
        self.list.remove(index).map(|(_, item)| item)
    }

    /// Removes and returns every item with an ID at or before `id`, oldest first.
    pub fn drain_through(&mut self, id: SequenceNumber) -> Vec<(SequenceNumber, T)> {
        let mut output = Vec::new();
        while let Some((front_id, _)) = self.list.front() {
            if sequence_less_than(id, *front_id) {
                break;
            }
            if let Some(entry) = self.list.pop_front() {
                output.push(entry);
            }
        }
        output
    }
}

impl<T> Default for SequenceList<T> {
    fn default() -> Self {
        Self::new()
    }
}
