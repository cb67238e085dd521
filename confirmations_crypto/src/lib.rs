//! Cryptographic types for the confirmations ledger.
//!
//! This crate provides the token values stored by the ledger and the
//! capability through which the blind-signature primitives are consumed:
//!
//! - [`UnblindedToken`], [`Token`], [`BlindedToken`], [`PublicKey`]: Opaque
//!   token values, carried as raw bytes and exchanged as standard base64
//! - [`TokenCrypto`]: Capability for deriving verification keys and checking
//!   signatures made with them
//! - [`Blake3TokenCrypto`]: A keyed-MAC backend for development and testing
//!
//! # Signature Flow
//!
//! ```text
//! Create:  UnblindedToken ──derive_verification_key──► key ──sign(payload)──► signature
//! Verify:  UnblindedToken ──derive_verification_key──► key ──verify(signature, payload)──► bool
//! ```
//!
//! The ledger never looks inside a token. Everything beyond "these are bytes
//! that round-trip through base64" is the capability's business.
//!
//! [`UnblindedToken`]: token::UnblindedToken
//! [`Token`]: token::Token
//! [`BlindedToken`]: token::BlindedToken
//! [`PublicKey`]: token::PublicKey
//! [`TokenCrypto`]: capability::TokenCrypto
//! [`Blake3TokenCrypto`]: memory::Blake3TokenCrypto

#![forbid(unsafe_code)]

pub mod capability;
pub mod memory;
pub mod token;
