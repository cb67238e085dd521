//! Persistence capability for the ledger document.
//!
//! The ledger stores a single opaque byte string under a fixed
//! [`LedgerKey`]. Backends decide where the bytes live:
//!
//! - [`memory::MemoryStorage`] keeps them in process, for tests and tooling
//! - `confirmations_fs_storage::FsStorage` writes one file per key

pub mod memory;

use future_form::FutureForm;

/// The identifier a ledger document is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerKey(String);

impl LedgerKey {
    /// The key used when none is configured.
    pub const DEFAULT: &'static str = "confirmations.json";

    /// Create a key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LedgerKey {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl core::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Abstraction over storage for ledger documents.
///
/// A missing document is not an error: [`LedgerStorage::load`] returns
/// `Ok(None)`, which the ledger treats as a fresh install. Any `Err` is a
/// real backend failure.
pub trait LedgerStorage<K: FutureForm + ?Sized> {
    /// The error type for storage operations.
    type Error: core::error::Error;

    /// Load the document stored under `key`, if any.
    fn load(&self, key: LedgerKey) -> K::Future<'_, Result<Option<Vec<u8>>, Self::Error>>;

    /// Store `bytes` under `key`, replacing any previous document.
    fn save(&self, key: LedgerKey, bytes: Vec<u8>) -> K::Future<'_, Result<(), Self::Error>>;

    /// Delete the document stored under `key`. Deleting a missing key succeeds.
    fn delete(&self, key: LedgerKey) -> K::Future<'_, Result<(), Self::Error>>;
}
