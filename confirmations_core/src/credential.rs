//! The signed credential envelope attached to a confirmation.
//!
//! On the wire a credential is standard base64 over compact JSON:
//!
//! ```text
//! base64({"payload":"…","signature":"…","t":"…"})
//! ```

use base64::{Engine, engine::general_purpose::STANDARD};
use confirmations_crypto::{capability::TokenCrypto, token::UnblindedToken};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A decoded credential.
///
/// Only `signature` is required on decode. The verifier rebuilds the payload
/// from the confirmation itself, so `payload` and `t` are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The signed payload, as a JSON string.
    #[serde(default)]
    pub payload: String,

    /// Base64 signature over [`Self::payload`].
    pub signature: String,

    /// Base64 preimage of the token used to sign.
    #[serde(default)]
    pub t: String,
}

/// Errors decoding a [`Credential`].
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The credential is not valid base64.
    #[error("credential is not base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not a credential object.
    #[error("credential is not a JSON object with a signature: {0}")]
    Json(#[from] serde_json::Error),
}

impl Credential {
    /// Sign `payload` with the key derived from `token`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if no key or preimage can be derived from `token`.
    pub fn sign<C: TokenCrypto>(
        crypto: &C,
        token: &UnblindedToken,
        payload: String,
    ) -> Result<Self, C::Error> {
        let key = crypto.derive_verification_key(token)?;
        let preimage = crypto.preimage(token)?;
        let signature = crypto.sign(&key, payload.as_bytes());
        Ok(Self {
            payload,
            signature: crypto.encode_signature(&signature),
            t: STANDARD.encode(preimage),
        })
    }

    /// Encode to the base64 wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        let json = serde_json::json!({
            "payload": self.payload,
            "signature": self.signature,
            "t": self.t,
        });
        STANDARD.encode(json.to_string())
    }

    /// Decode from the base64 wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not base64, or does not decode to a
    /// JSON object carrying a string `signature` field.
    pub fn decode(encoded: &str) -> Result<Self, CredentialError> {
        let bytes = STANDARD.decode(encoded)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
