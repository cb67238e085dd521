//! Keyed-MAC token crypto for development and testing.
//!
//! Verification keys are BLAKE3 derived keys over the token bytes and
//! signatures are BLAKE3 keyed hashes. This mirrors the shape of the
//! production scheme (a MAC keyed by a token-derived key) without any of
//! its unlinkability guarantees.

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

use crate::{capability::TokenCrypto, token::UnblindedToken};

const VERIFICATION_KEY_CONTEXT: &str = "confirmations 2019-10-01 verification key";
const PREIMAGE_CONTEXT: &str = "confirmations 2019-10-01 token preimage";

/// Errors from [`Blake3TokenCrypto`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The signature is not valid base64.
    #[error("invalid base64 signature: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The signature has the wrong length.
    #[error("signature must be 32 bytes, got {0}")]
    SignatureLength(usize),

    /// The unblinded token has no bytes.
    #[error("unblinded token is empty")]
    EmptyToken,
}

/// A verification key derived from an unblinded token.
#[derive(Clone)]
pub struct MacKey([u8; 32]);

impl core::fmt::Debug for MacKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("MacKey").finish_non_exhaustive()
    }
}

/// A keyed-hash signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacSignature([u8; 32]);

impl MacSignature {
    /// The raw signature bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// BLAKE3 keyed-MAC implementation of [`TokenCrypto`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3TokenCrypto;

impl Blake3TokenCrypto {
    /// Create a new development crypto backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TokenCrypto for Blake3TokenCrypto {
    type VerificationKey = MacKey;
    type Signature = MacSignature;
    type Error = CryptoError;

    fn decode_signature(&self, encoded: &str) -> Result<MacSignature, CryptoError> {
        let bytes = STANDARD.decode(encoded)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::SignatureLength(bytes.len()))?;
        Ok(MacSignature(arr))
    }

    fn encode_signature(&self, signature: &MacSignature) -> String {
        STANDARD.encode(signature.0)
    }

    fn derive_verification_key(&self, token: &UnblindedToken) -> Result<MacKey, CryptoError> {
        if token.as_bytes().is_empty() {
            return Err(CryptoError::EmptyToken);
        }
        Ok(MacKey(blake3::derive_key(
            VERIFICATION_KEY_CONTEXT,
            token.as_bytes(),
        )))
    }

    fn preimage(&self, token: &UnblindedToken) -> Result<Vec<u8>, CryptoError> {
        if token.as_bytes().is_empty() {
            return Err(CryptoError::EmptyToken);
        }
        Ok(blake3::derive_key(PREIMAGE_CONTEXT, token.as_bytes()).to_vec())
    }

    fn sign(&self, key: &MacKey, message: &[u8]) -> MacSignature {
        MacSignature(*blake3::keyed_hash(&key.0, message).as_bytes())
    }

    fn verify(&self, key: &MacKey, signature: &MacSignature, message: &[u8]) -> bool {
        // `blake3::Hash` equality is constant time
        blake3::keyed_hash(&key.0, message) == blake3::Hash::from(signature.0)
    }
}
