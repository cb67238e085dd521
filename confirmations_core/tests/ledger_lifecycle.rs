//! Tests for loading, persisting and resetting the confirmation ledger.

use confirmations_core::{
    config::LedgerConfig,
    confirmation::{AdType, wire::ConfirmationWire},
    document::LedgerDocument,
    issuer::{Issuer, Issuers},
    ledger::{
        ConfirmationLedger, LedgerState,
        error::{LoadError, NotReady},
    },
    storage::{LedgerKey, memory::MemoryStorage},
    test_utils::{
        FailingStorage, confirmation_token, confirmation_with_id, issuer_public_key,
        payment_token_pair, signed_confirmation,
    },
};
use future_form::Sendable;
use serde_json::json;
use testresult::TestResult;

type MemoryLedger = ConfirmationLedger<Sendable, MemoryStorage>;

fn seeded(document: &serde_json::Value) -> Result<MemoryStorage, serde_json::Error> {
    Ok(MemoryStorage::with_document(
        LedgerKey::default(),
        serde_json::to_vec(document)?,
    ))
}

fn issuers() -> Issuers {
    Issuers::new(
        Some("catalog-key".into()),
        vec![Issuer {
            name: "0.05BAT".into(),
            public_key: issuer_public_key().to_base64(),
        }],
    )
}

#[tokio::test]
async fn test_fresh_install_saves_exactly_once() -> TestResult {
    let storage = MemoryStorage::new();
    let mut ledger: MemoryLedger = ConfirmationLedger::new(storage.clone());

    ledger.initialize().await?;

    assert_eq!(ledger.state(), LedgerState::Ready);
    assert_eq!(storage.save_count(), 1);
    assert!(ledger.failed_confirmations()?.is_empty());

    let persisted = storage.get(&LedgerKey::default()).await;
    assert_eq!(
        persisted.as_deref().map(LedgerDocument::from_json).transpose()?,
        Some(LedgerDocument::default())
    );
    Ok(())
}

#[tokio::test]
async fn test_state_survives_reload() -> TestResult {
    let storage = MemoryStorage::new();

    let mut ledger: MemoryLedger = ConfirmationLedger::new(storage.clone());
    ledger.initialize().await?;
    ledger.set_issuers(issuers()).await?;
    ledger.append_failed_confirmation(signed_confirmation(1)).await?;
    ledger.append_failed_confirmation(signed_confirmation(2)).await?;
    ledger.add_confirmation_tokens([confirmation_token(3), confirmation_token(4)]).await?;
    ledger.add_payment_tokens([payment_token_pair(5)]).await?;

    let mut reloaded: MemoryLedger = ConfirmationLedger::new(storage);
    reloaded.initialize().await?;

    assert_eq!(reloaded.issuers()?, ledger.issuers()?);
    assert_eq!(reloaded.failed_confirmations()?, ledger.failed_confirmations()?);
    assert_eq!(reloaded.confirmation_tokens()?, ledger.confirmation_tokens()?);
    assert_eq!(reloaded.payment_tokens()?, ledger.payment_tokens()?);
    Ok(())
}

#[tokio::test]
async fn test_to_json_roundtrips_through_document() -> TestResult {
    let mut ledger: MemoryLedger = ConfirmationLedger::new(MemoryStorage::new());
    ledger.initialize().await?;
    ledger.set_issuers(issuers()).await?;
    ledger.append_failed_confirmation(signed_confirmation(1)).await?;

    let document = LedgerDocument::from_json(&ledger.to_json()?)?;
    assert_eq!(&document.issuers, ledger.issuers()?);
    assert_eq!(document.failed_confirmations, ledger.failed_confirmations()?);
    Ok(())
}

#[tokio::test]
async fn test_invalid_records_are_dropped_on_load() -> TestResult {
    let good_a = serde_json::to_value(ConfirmationWire::from(&signed_confirmation(1)))?;
    let good_b = serde_json::to_value(ConfirmationWire::from(&signed_confirmation(2)))?;
    let mut bad = good_a.clone();
    bad["creative_instance_id"] = json!(null);

    let storage = seeded(&json!({
        "confirmations": { "failed_confirmations": [good_a, bad, good_b] },
    }))?;
    let mut ledger: MemoryLedger = ConfirmationLedger::new(storage);
    ledger.initialize().await?;

    let ids: Vec<_> = ledger
        .failed_confirmations()?
        .iter()
        .map(|c| c.id.as_str().to_owned())
        .collect();
    assert_eq!(ids, ["confirmation-1", "confirmation-2"]);
    Ok(())
}

fn valid_record(seed: u8) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(ConfirmationWire::from(&signed_confirmation(seed)))
}

fn invalid_record(seed: u8) -> Result<serde_json::Value, serde_json::Error> {
    let mut record = valid_record(seed)?;
    record["type"] = json!("not-a-type");
    Ok(record)
}

async fn loaded_ids(records: Vec<serde_json::Value>) -> TestResult<Vec<String>> {
    let storage = seeded(&json!({
        "confirmations": { "failed_confirmations": records },
    }))?;
    let mut ledger: MemoryLedger = ConfirmationLedger::new(storage);
    ledger.initialize().await?;
    Ok(ledger
        .failed_confirmations()?
        .iter()
        .map(|c| c.id.as_str().to_owned())
        .collect())
}

#[tokio::test]
async fn test_invalid_records_first_are_dropped() -> TestResult {
    let ids = loaded_ids(vec![
        invalid_record(1)?,
        invalid_record(2)?,
        valid_record(3)?,
        valid_record(4)?,
    ])
    .await?;
    assert_eq!(ids, ["confirmation-3", "confirmation-4"]);
    Ok(())
}

#[tokio::test]
async fn test_invalid_records_last_are_dropped() -> TestResult {
    let ids = loaded_ids(vec![valid_record(1)?, valid_record(2)?, invalid_record(3)?]).await?;
    assert_eq!(ids, ["confirmation-1", "confirmation-2"]);
    Ok(())
}

#[tokio::test]
async fn test_interleaved_records_keep_relative_order() -> TestResult {
    let ids = loaded_ids(vec![
        valid_record(5)?,
        invalid_record(1)?,
        valid_record(2)?,
        json!("not a record"),
        invalid_record(7)?,
        valid_record(9)?,
        json!(null),
    ])
    .await?;
    assert_eq!(ids, ["confirmation-5", "confirmation-2", "confirmation-9"]);
    Ok(())
}

#[tokio::test]
async fn test_all_invalid_records_leave_ready_empty_queue() -> TestResult {
    let ids = loaded_ids(vec![invalid_record(1)?, json!(42), invalid_record(2)?]).await?;
    assert!(ids.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_structurally_invalid_document_fails_load() -> TestResult {
    let storage = seeded(&json!({ "unblinded_tokens": [] }))?;
    let mut ledger: MemoryLedger = ConfirmationLedger::new(storage.clone());

    let result = ledger.initialize().await;

    assert!(matches!(result, Err(LoadError::Document(_))));
    assert_eq!(ledger.state(), LedgerState::Uninitialized);
    assert_eq!(storage.save_count(), 0);
    assert_eq!(
        ledger.append_failed_confirmation(signed_confirmation(1)).await,
        Err(NotReady {
            state: LedgerState::Uninitialized
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_non_object_document_fails_load() -> TestResult {
    let storage = MemoryStorage::with_document(LedgerKey::default(), b"[1, 2, 3]".to_vec());
    let mut ledger: MemoryLedger = ConfirmationLedger::new(storage);
    assert!(matches!(
        ledger.initialize().await,
        Err(LoadError::Document(_))
    ));
    assert!(!ledger.is_ready());
    Ok(())
}

#[tokio::test]
async fn test_storage_failure_fails_load() {
    let mut ledger: ConfirmationLedger<Sendable, _> =
        ConfirmationLedger::new(FailingStorage::failing_loads());
    assert!(matches!(
        ledger.initialize().await,
        Err(LoadError::Storage(_))
    ));
    assert_eq!(ledger.state(), LedgerState::Uninitialized);
}

#[tokio::test]
async fn test_save_failure_is_not_surfaced() -> TestResult {
    let storage = FailingStorage::failing_saves();
    let mut ledger: ConfirmationLedger<Sendable, _> = ConfirmationLedger::new(storage.clone());
    ledger.initialize().await?;

    ledger.append_failed_confirmation(confirmation_with_id("a")).await?;
    assert!(!ledger.save().await);

    assert_eq!(ledger.failed_confirmations()?.len(), 1);
    assert_eq!(storage.save_attempts(), 3);
    Ok(())
}

#[tokio::test]
async fn test_legacy_records_are_migrated() -> TestResult {
    let mut legacy = serde_json::to_value(ConfirmationWire::from(&signed_confirmation(1)))?;
    if let Some(record) = legacy.as_object_mut() {
        record.remove("transaction_id");
        record.remove("ad_type");
    }

    let storage = seeded(&json!({
        "issuers": {},
        "confirmations": { "failed_confirmations": [legacy] },
        "unblinded_tokens": [],
        "unblinded_payment_tokens": [],
    }))?;
    let mut ledger: MemoryLedger = ConfirmationLedger::new(storage);
    ledger.initialize().await?;

    let migrated = ledger
        .failed_confirmations()?
        .first()
        .ok_or("legacy record was dropped")?;
    assert_eq!(migrated.ad_type, AdType::AdNotification);
    assert!(!migrated.transaction_id.as_str().is_empty());
    assert_ne!(migrated.transaction_id.as_str(), "transaction-1");
    Ok(())
}

#[tokio::test]
async fn test_duplicates_kept_and_removed_one_at_a_time() -> TestResult {
    let mut ledger: MemoryLedger = ConfirmationLedger::new(MemoryStorage::new());
    ledger.initialize().await?;

    let confirmation = confirmation_with_id("dup");
    ledger.append_failed_confirmation(confirmation.clone()).await?;
    ledger.append_failed_confirmation(confirmation.clone()).await?;
    assert_eq!(ledger.failed_confirmations()?.len(), 2);

    assert!(ledger.remove_failed_confirmation(&confirmation).await?);
    assert_eq!(ledger.failed_confirmations()?.len(), 1);

    assert!(ledger.remove_failed_confirmation(&confirmation).await?);
    assert!(!ledger.remove_failed_confirmation(&confirmation).await?);
    assert!(ledger.failed_confirmations()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_reset_clears_everything() -> TestResult {
    let storage = MemoryStorage::new();
    let mut ledger: MemoryLedger = ConfirmationLedger::new(storage.clone());
    ledger.initialize().await?;
    ledger.set_issuers(issuers()).await?;
    ledger.append_failed_confirmation(signed_confirmation(1)).await?;
    ledger.add_confirmation_tokens([confirmation_token(2)]).await?;

    ledger.reset().await?;

    assert!(ledger.failed_confirmations()?.is_empty());
    assert!(ledger.confirmation_tokens()?.is_empty());
    assert!(ledger.issuers()?.is_empty());

    let persisted = storage
        .get(&LedgerKey::default())
        .await
        .ok_or("reset did not persist a document")?;
    assert_eq!(
        LedgerDocument::from_json(&persisted)?,
        LedgerDocument::default()
    );
    Ok(())
}

#[tokio::test]
async fn test_custom_key_is_used() -> TestResult {
    let storage = MemoryStorage::new();
    let key = LedgerKey::new("profile/confirmations.json");
    let mut ledger: MemoryLedger = ConfirmationLedger::with_config(
        storage.clone(),
        LedgerConfig::default().with_key(key.clone()),
    );
    ledger.initialize().await?;

    assert!(storage.get(&key).await.is_some());
    assert!(storage.get(&LedgerKey::default()).await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_issuer_public_key_lookup() -> TestResult {
    let mut ledger: MemoryLedger = ConfirmationLedger::new(MemoryStorage::new());
    ledger.initialize().await?;
    assert!(!ledger.is_valid_issuer_public_key(&issuer_public_key())?);

    ledger.set_issuers(issuers()).await?;
    assert!(ledger.is_valid_issuer_public_key(&issuer_public_key())?);
    Ok(())
}
