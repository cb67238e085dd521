//! Confirmation signature verification.

use confirmations_crypto::capability::TokenCrypto;

use crate::{confirmation::Confirmation, credential::Credential};

/// Checks that a confirmation's credential was signed with the key derived
/// from the confirmation's own token.
///
/// Stateless and side-effect free: verifying never touches the ledger, the
/// token pools or storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmationVerifier<C> {
    crypto: C,
}

impl<C: TokenCrypto> ConfirmationVerifier<C> {
    /// Create a verifier over a crypto backend.
    #[must_use]
    pub const fn new(crypto: C) -> Self {
        Self { crypto }
    }

    /// Whether `confirmation` carries a valid signature.
    ///
    /// Any failure along the way (an undecodable credential, a missing or
    /// malformed signature, a token no key can be derived from, or a
    /// signature over different bytes) yields `false`.
    #[must_use]
    pub fn verify(&self, confirmation: &Confirmation) -> bool {
        let passed = self.check(confirmation);

        #[cfg(feature = "metrics")]
        crate::metrics::verification(passed);

        passed
    }

    fn check(&self, confirmation: &Confirmation) -> bool {
        let credential = match Credential::decode(&confirmation.credential) {
            Ok(credential) => credential,
            Err(err) => {
                tracing::debug!(id = %confirmation.id, %err, "verification failed: bad credential");
                return false;
            }
        };

        let signature = match self.crypto.decode_signature(&credential.signature) {
            Ok(signature) => signature,
            Err(err) => {
                tracing::debug!(id = %confirmation.id, %err, "verification failed: bad signature");
                return false;
            }
        };

        let key = match self
            .crypto
            .derive_verification_key(&confirmation.token.unblinded_token)
        {
            Ok(key) => key,
            Err(err) => {
                tracing::debug!(id = %confirmation.id, %err, "verification failed: bad token");
                return false;
            }
        };

        let passed = self
            .crypto
            .verify(&key, &signature, &confirmation.payload());
        if !passed {
            tracing::debug!(id = %confirmation.id, "verification failed: signature mismatch");
        }
        passed
    }
}
