//! Tests for running the confirmation ledger over the filesystem backend.

use confirmations_core::{
    ledger::{ConfirmationLedger, LedgerState, error::LoadError},
    storage::LedgerKey,
    test_utils::{confirmation_token, signed_confirmation},
};
use confirmations_fs_storage::FsStorage;
use future_form::Sendable;
use testresult::TestResult;

#[tokio::test]
async fn test_ledger_persists_across_restarts() -> TestResult {
    let dir = tempfile::tempdir()?;

    {
        let storage = FsStorage::new(dir.path().to_path_buf())?;
        let mut ledger: ConfirmationLedger<Sendable, _> = ConfirmationLedger::new(storage);
        ledger.initialize().await?;
        ledger.append_failed_confirmation(signed_confirmation(1)).await?;
        ledger.add_confirmation_tokens([confirmation_token(9)]).await?;
    }

    let storage = FsStorage::new(dir.path().to_path_buf())?;
    let mut ledger: ConfirmationLedger<Sendable, _> = ConfirmationLedger::new(storage);
    ledger.initialize().await?;

    assert_eq!(ledger.failed_confirmations()?, [signed_confirmation(1)]);
    assert!(ledger.confirmation_tokens()?.contains(&confirmation_token(9)));
    Ok(())
}

#[tokio::test]
async fn test_fresh_install_writes_document() -> TestResult {
    let dir = tempfile::tempdir()?;
    let storage = FsStorage::new(dir.path().to_path_buf())?;
    let path = storage.document_path(&LedgerKey::default())?;

    let mut ledger: ConfirmationLedger<Sendable, _> = ConfirmationLedger::new(storage);
    ledger.initialize().await?;

    let written: serde_json::Value = serde_json::from_slice(&std::fs::read(path)?)?;
    assert_eq!(written["confirmations"]["failed_confirmations"], serde_json::json!([]));
    Ok(())
}

#[tokio::test]
async fn test_corrupt_file_fails_load() -> TestResult {
    let dir = tempfile::tempdir()?;
    let storage = FsStorage::new(dir.path().to_path_buf())?;
    std::fs::write(storage.document_path(&LedgerKey::default())?, b"\x00garbage")?;

    let mut ledger: ConfirmationLedger<Sendable, _> = ConfirmationLedger::new(storage);
    assert!(matches!(
        ledger.initialize().await,
        Err(LoadError::Document(_))
    ));
    assert_eq!(ledger.state(), LedgerState::Uninitialized);
    Ok(())
}
