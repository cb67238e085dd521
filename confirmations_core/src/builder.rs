//! Construct signed confirmations from spent tokens.

use confirmations_crypto::capability::TokenCrypto;
use thiserror::Error;

use crate::{
    confirmation::{
        AdType, Confirmation, ConfirmationId, ConfirmationType, TransactionId, build_payload,
    },
    credential::Credential,
    inventory::{ConfirmationToken, PaymentTokenPair},
    timestamp::TimestampSeconds,
};

/// Errors building a [`Confirmation`].
#[derive(Debug, Error)]
pub enum BuildError<E: core::error::Error> {
    /// The creative instance identifier is empty.
    #[error("creative instance id is empty")]
    EmptyCreativeInstanceId,

    /// The token crypto backend rejected the token.
    #[error("token crypto error: {0}")]
    Crypto(#[source] E),
}

/// Signs confirmations with keys derived from spent confirmation tokens.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationBuilder<'a, C> {
    crypto: &'a C,
}

impl<'a, C: TokenCrypto> ConfirmationBuilder<'a, C> {
    /// Create a builder over a crypto backend.
    #[must_use]
    pub const fn new(crypto: &'a C) -> Self {
        Self { crypto }
    }

    /// Build a confirmation, consuming the spent tokens.
    ///
    /// The caller moves `token` out of its pool (see
    /// [`ConfirmationLedger::take_confirmation_token`]) before calling this,
    /// so a token can never be spent twice.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::EmptyCreativeInstanceId`] if the creative
    /// instance id is empty, or [`BuildError::Crypto`] if no key can be
    /// derived from `token`.
    ///
    /// [`ConfirmationLedger::take_confirmation_token`]: crate::ledger::ConfirmationLedger::take_confirmation_token
    pub fn build(
        &self,
        token: ConfirmationToken,
        payment: PaymentTokenPair,
        creative_instance_id: impl Into<String>,
        confirmation_type: ConfirmationType,
        ad_type: AdType,
        user_data: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Confirmation, BuildError<C::Error>> {
        let creative_instance_id = creative_instance_id.into();
        if creative_instance_id.is_empty() {
            return Err(BuildError::EmptyCreativeInstanceId);
        }

        let payload = build_payload(
            &payment.blinded_payment_token,
            &creative_instance_id,
            confirmation_type,
            user_data.as_ref(),
        );
        let credential = Credential::sign(self.crypto, &token.unblinded_token, payload)
            .map_err(BuildError::Crypto)?
            .encode();

        let confirmation = Confirmation {
            id: ConfirmationId::random(),
            transaction_id: TransactionId::random(),
            creative_instance_id,
            confirmation_type,
            ad_type,
            token,
            payment_token: payment.payment_token,
            blinded_payment_token: payment.blinded_payment_token,
            credential,
            user_data,
            created_at: Some(TimestampSeconds::now()),
            was_created: false,
        };

        tracing::debug!(
            id = %confirmation.id,
            %confirmation_type,
            %ad_type,
            "ConfirmationBuilder::build"
        );

        Ok(confirmation)
    }
}
