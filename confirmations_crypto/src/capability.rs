//! The cryptographic capability consumed by the ledger.
//!
//! The blind-signature scheme itself (blinding, unblinding, key derivation,
//! signature math) lives behind [`TokenCrypto`]. The ledger and verifier
//! only move opaque values through it.

use crate::token::UnblindedToken;

/// Operations on unblinded tokens and the verification keys derived from them.
///
/// This abstraction allows different backends:
/// - Keyed-MAC development backend via [`memory::Blake3TokenCrypto`]
/// - Bindings to a VOPRF / challenge-bypass implementation
///
/// Implementations must be deterministic: deriving a key from the same token
/// twice yields keys that verify the same signatures.
///
/// [`memory::Blake3TokenCrypto`]: crate::memory::Blake3TokenCrypto
pub trait TokenCrypto {
    /// A key derived from an unblinded token.
    type VerificationKey;

    /// A signature produced with a [`Self::VerificationKey`].
    type Signature;

    /// The error type for decoding and derivation.
    type Error: core::error::Error;

    /// Decode a signature from its base64 wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a well-formed signature.
    fn decode_signature(&self, encoded: &str) -> Result<Self::Signature, Self::Error>;

    /// Encode a signature to its base64 wire form.
    fn encode_signature(&self, signature: &Self::Signature) -> String;

    /// Derive the verification key bound to an unblinded token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a well-formed unblinded token.
    fn derive_verification_key(
        &self,
        token: &UnblindedToken,
    ) -> Result<Self::VerificationKey, Self::Error>;

    /// Extract the token preimage revealed alongside a signature.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a well-formed unblinded token.
    fn preimage(&self, token: &UnblindedToken) -> Result<Vec<u8>, Self::Error>;

    /// Sign a message with a verification key.
    fn sign(&self, key: &Self::VerificationKey, message: &[u8]) -> Self::Signature;

    /// Check that `signature` was produced over `message` with `key`.
    fn verify(&self, key: &Self::VerificationKey, signature: &Self::Signature, message: &[u8])
    -> bool;
}
