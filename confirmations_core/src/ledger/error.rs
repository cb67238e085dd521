//! Error types for [`ConfirmationLedger`](super::ConfirmationLedger).

use thiserror::Error;

use super::LedgerState;
use crate::document::DocumentError;

/// The ledger has not finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("confirmation ledger is not ready (state: {state:?})")]
pub struct NotReady {
    /// The state the ledger was in.
    pub state: LedgerState,
}

/// An error loading the ledger from storage.
#[derive(Debug, Error)]
pub enum LoadError<E: core::error::Error> {
    /// The ledger has already been loaded.
    #[error("confirmation ledger is already initialized")]
    AlreadyInitialized,

    /// The storage backend failed.
    #[error("storage error while loading ledger: {0}")]
    Storage(#[source] E),

    /// The persisted document is structurally invalid.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// An error serializing the ledger.
#[derive(Debug, Error)]
pub enum ToJsonError {
    /// The ledger has not finished loading.
    #[error(transparent)]
    NotReady(#[from] NotReady),

    /// Serialization failed.
    #[error("failed to serialize ledger: {0}")]
    Json(#[from] serde_json::Error),
}
