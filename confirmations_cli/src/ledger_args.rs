//! Arguments shared by every subcommand.

use std::path::PathBuf;

use anyhow::Result;
use confirmations_core::{
    config::LedgerConfig,
    document::{DroppedRecords, LedgerDocument},
    ledger::ConfirmationLedger,
    storage::{LedgerKey, LedgerStorage},
};
use confirmations_fs_storage::FsStorage;
use future_form::Sendable;

/// Location of the ledger document.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct LedgerArgs {
    /// Data directory for filesystem storage
    #[arg(short, long, default_value = "./data")]
    pub(crate) data_dir: PathBuf,

    /// File name of the ledger document inside the data directory
    #[arg(short, long, default_value = LedgerKey::DEFAULT)]
    pub(crate) key: String,
}

impl LedgerArgs {
    pub(crate) fn storage(&self) -> Result<FsStorage> {
        Ok(FsStorage::new(self.data_dir.clone())?)
    }

    pub(crate) fn key(&self) -> LedgerKey {
        LedgerKey::new(self.key.clone())
    }

    /// Open and load the ledger. A missing document is created empty.
    pub(crate) async fn open(&self) -> Result<ConfirmationLedger<Sendable, FsStorage>> {
        let config = LedgerConfig::default().with_key(self.key());
        let mut ledger = ConfirmationLedger::with_config(self.storage()?, config);
        ledger.initialize().await?;
        Ok(ledger)
    }

    /// Read and parse the ledger document without loading a ledger.
    ///
    /// Returns `None` if there is no document. Never writes, and never
    /// creates the data directory.
    pub(crate) async fn read_document(&self) -> Result<Option<(LedgerDocument, DroppedRecords)>> {
        if !self.data_dir.exists() {
            return Ok(None);
        }
        let storage = self.storage()?;
        let Some(bytes) = LedgerStorage::<Sendable>::load(&storage, self.key()).await? else {
            return Ok(None);
        };
        Ok(Some(LedgerDocument::parse(&bytes)?))
    }

    /// Delete the ledger document, whatever it contains.
    pub(crate) async fn delete_document(&self) -> Result<()> {
        let storage = self.storage()?;
        LedgerStorage::<Sendable>::delete(&storage, self.key()).await?;
        Ok(())
    }
}
