//! Test utilities for confirmation ledger testing.
//!
//! Deterministic tokens, confirmations signed with the development crypto
//! backend, and a storage backend that fails on demand.
//!
//! Enable with the `test_utils` feature flag.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use confirmations_crypto::{
    memory::Blake3TokenCrypto,
    token::{BlindedToken, PublicKey, Token, UnblindedToken},
};
use future_form::{FutureForm, Local, Sendable, future_form};
use thiserror::Error;

use crate::{
    confirmation::{
        AdType, Confirmation, ConfirmationId, ConfirmationType, TransactionId, build_payload,
    },
    credential::Credential,
    inventory::{ConfirmationToken, PaymentTokenPair},
    storage::{LedgerKey, LedgerStorage, memory::MemoryStorage},
    timestamp::TimestampSeconds,
};

/// The issuer public key every fixture token is signed under.
#[must_use]
pub fn issuer_public_key() -> PublicKey {
    PublicKey::from_bytes(vec![0xAA; 32])
}

/// A confirmation token whose bytes are derived from `seed`.
#[must_use]
pub fn confirmation_token(seed: u8) -> ConfirmationToken {
    ConfirmationToken {
        unblinded_token: UnblindedToken::from_bytes(vec![seed; 96]),
        public_key: issuer_public_key(),
    }
}

/// A payment token pair whose bytes are derived from `seed`.
#[must_use]
pub fn payment_token_pair(seed: u8) -> PaymentTokenPair {
    PaymentTokenPair {
        payment_token: Token::from_bytes(vec![seed; 64]),
        blinded_payment_token: BlindedToken::from_bytes(vec![seed ^ 0xFF; 32]),
    }
}

/// A confirmation with fixed identifiers, signed with [`Blake3TokenCrypto`].
///
/// Calling this twice with the same seed yields equal confirmations.
#[must_use]
pub fn signed_confirmation(seed: u8) -> Confirmation {
    let token = confirmation_token(seed);
    let payment = payment_token_pair(seed);
    let creative_instance_id = format!("creative-{seed}");
    let confirmation_type = ConfirmationType::Viewed;

    let payload = build_payload(
        &payment.blinded_payment_token,
        &creative_instance_id,
        confirmation_type,
        None,
    );
    // Fixture tokens are never empty, so signing cannot fail
    let credential = Credential::sign(&Blake3TokenCrypto::new(), &token.unblinded_token, payload)
        .map(|c| c.encode())
        .unwrap_or_default();

    Confirmation {
        id: ConfirmationId::new(format!("confirmation-{seed}")),
        transaction_id: TransactionId::new(format!("transaction-{seed}")),
        creative_instance_id,
        confirmation_type,
        ad_type: AdType::AdNotification,
        token,
        payment_token: payment.payment_token,
        blinded_payment_token: payment.blinded_payment_token,
        credential,
        user_data: None,
        created_at: Some(TimestampSeconds::new(1_600_000_000 + u64::from(seed))),
        was_created: true,
    }
}

/// [`signed_confirmation`] with a different id.
#[must_use]
pub fn confirmation_with_id(id: &str) -> Confirmation {
    Confirmation {
        id: ConfirmationId::new(id),
        ..signed_confirmation(1)
    }
}

/// The error reported by [`FailingStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("injected storage failure during {0}")]
pub struct InjectedFailure(pub &'static str);

/// A storage backend that fails the operations it is told to.
///
/// Operations that are not failed are forwarded to an inner [`MemoryStorage`].
#[derive(Debug, Clone, Default)]
pub struct FailingStorage {
    inner: MemoryStorage,
    fail_loads: bool,
    fail_saves: bool,
    save_attempts: Arc<AtomicUsize>,
}

impl FailingStorage {
    /// A backend whose loads fail.
    #[must_use]
    pub fn failing_loads() -> Self {
        Self {
            fail_loads: true,
            ..Self::default()
        }
    }

    /// A backend whose saves fail.
    #[must_use]
    pub fn failing_saves() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    /// A backend whose saves fail, already holding `bytes` under `key`.
    #[must_use]
    pub fn failing_saves_with_document(key: LedgerKey, bytes: Vec<u8>) -> Self {
        Self {
            inner: MemoryStorage::with_document(key, bytes),
            fail_saves: true,
            ..Self::default()
        }
    }

    /// How many saves were attempted, failed or not.
    #[must_use]
    pub fn save_attempts(&self) -> usize {
        self.save_attempts.load(Ordering::Relaxed)
    }

    /// The wrapped backend.
    #[must_use]
    pub const fn inner(&self) -> &MemoryStorage {
        &self.inner
    }
}

#[future_form(Sendable, Local)]
impl<K: FutureForm> LedgerStorage<K> for FailingStorage {
    type Error = InjectedFailure;

    fn load(&self, key: LedgerKey) -> K::Future<'_, Result<Option<Vec<u8>>, Self::Error>> {
        K::from_future(async move {
            tracing::debug!(%key, "FailingStorage::load");
            if self.fail_loads {
                return Err(InjectedFailure("load"));
            }
            Ok(self.inner.get(&key).await)
        })
    }

    fn save(&self, key: LedgerKey, bytes: Vec<u8>) -> K::Future<'_, Result<(), Self::Error>> {
        K::from_future(async move {
            tracing::debug!(%key, "FailingStorage::save");
            self.save_attempts.fetch_add(1, Ordering::Relaxed);
            if self.fail_saves {
                return Err(InjectedFailure("save"));
            }
            self.inner.put(key, bytes).await;
            Ok(())
        })
    }

    fn delete(&self, key: LedgerKey) -> K::Future<'_, Result<(), Self::Error>> {
        K::from_future(async move {
            tracing::debug!(%key, "FailingStorage::delete");
            self.inner.remove(&key).await;
            Ok(())
        })
    }
}
