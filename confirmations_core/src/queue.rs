//! Durable queue of confirmations awaiting resubmission.

use crate::confirmation::{Confirmation, ConfirmationId};

/// Ordered list of failed confirmations.
///
/// Appending never deduplicates: the same confirmation appended twice is
/// retried twice. Removal drops only the first entry with a matching id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryQueue {
    entries: Vec<Confirmation>,
    max_len: Option<usize>,
}

impl RetryQueue {
    /// Create an empty queue, optionally capped at `max_len` entries.
    #[must_use]
    pub const fn new(max_len: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            max_len,
        }
    }

    /// Append a confirmation.
    ///
    /// If the queue is capped and full, the oldest entry is evicted and returned.
    pub fn push(&mut self, confirmation: Confirmation) -> Option<Confirmation> {
        let evicted = match self.max_len {
            Some(0) => return Some(confirmation),
            Some(max) if self.entries.len() >= max => Some(self.entries.remove(0)),
            _ => None,
        };
        self.entries.push(confirmation);
        evicted
    }

    /// Remove the first entry whose id is `id`. Returns whether one was found.
    pub fn remove(&mut self, id: &ConfirmationId) -> bool {
        if let Some(pos) = self.entries.iter().position(|c| &c.id == id) {
            self.entries.remove(pos);
            true
        } else {
            false
        }
    }

    /// Keep only the entries for which `keep` returns `true`, preserving order.
    /// Returns how many were dropped.
    pub fn retain(&mut self, keep: impl FnMut(&Confirmation) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(keep);
        before - self.entries.len()
    }

    /// Replace every entry, applying the cap to the newest entries.
    pub fn replace(&mut self, entries: Vec<Confirmation>) {
        self.entries = entries;
        if let Some(max) = self.max_len {
            let excess = self.entries.len().saturating_sub(max);
            self.entries.drain(..excess);
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The queued confirmations, oldest first.
    #[must_use]
    pub fn as_slice(&self) -> &[Confirmation] {
        &self.entries
    }

    /// Number of queued confirmations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The configured cap, if any.
    #[must_use]
    pub const fn max_len(&self) -> Option<usize> {
        self.max_len
    }
}
