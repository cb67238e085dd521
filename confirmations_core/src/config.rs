//! Ledger configuration.

use crate::storage::LedgerKey;

/// Configuration for a [`ConfirmationLedger`](crate::ledger::ConfirmationLedger).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerConfig {
    /// The storage key the ledger document is persisted under.
    pub key: LedgerKey,

    /// Maximum number of failed confirmations to retain.
    ///
    /// When set and the queue is full, appending evicts the oldest entry.
    /// `None` (the default) keeps every entry.
    pub max_retry_queue_len: Option<usize>,
}

impl LedgerConfig {
    /// Use a different storage key.
    #[must_use]
    pub fn with_key(mut self, key: LedgerKey) -> Self {
        self.key = key;
        self
    }

    /// Cap the retry queue.
    #[must_use]
    pub const fn with_max_retry_queue_len(mut self, max: usize) -> Self {
        self.max_retry_queue_len = Some(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unbounded_and_uses_fixed_key() {
        let config = LedgerConfig::default();
        assert_eq!(config.key.as_str(), "confirmations.json");
        assert_eq!(config.max_retry_queue_len, None);
    }
}
