//! Token inventory.
//!
//! Two independent pools of spendable tokens:
//!
//! - [`ConfirmationTokenPool`]: unblinded tokens (plus issuer key), one spent per confirmation
//! - [`PaymentTokenPool`]: payment tokens paired with their blinded counterparts
//!
//! A pool only stores and hands out tokens. Deciding _when_ a token is spent
//! belongs to its caller. Tokens leave a pool by move ([`TokenPool::take_next`]),
//! so a token is never simultaneously pooled and bound to a confirmation.

use std::collections::VecDeque;

use confirmations_crypto::token::{
    BlindedToken, PublicKey, Token, TokenDecodeError, UnblindedToken,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

/// A value that can live in a [`TokenPool`].
pub trait PoolToken: Clone + PartialEq + Sized {
    /// Persisted form of one pool entry.
    type Wire: Serialize + DeserializeOwned;

    /// Convert to the persisted form.
    fn to_wire(&self) -> Self::Wire;

    /// Parse from the persisted form.
    ///
    /// # Errors
    ///
    /// Returns an error if any token value fails to decode.
    fn from_wire(wire: Self::Wire) -> Result<Self, TokenDecodeError>;
}

/// An error parsing a single pool entry.
#[derive(Debug, Error)]
pub enum TokenParseError {
    /// The entry does not have the expected shape.
    #[error("malformed token entry: {0}")]
    Shape(#[from] serde_json::Error),

    /// A token value failed to decode.
    #[error("undecodable token value: {0}")]
    Decode(#[from] TokenDecodeError),
}

/// An unblinded confirmation token and the issuer key it was signed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfirmationToken {
    /// The spendable token.
    pub unblinded_token: UnblindedToken,

    /// Public key of the issuer that signed it.
    pub public_key: PublicKey,
}

/// Persisted form of a [`ConfirmationToken`] (also the `token_info` of a confirmation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationTokenWire {
    /// Base64 unblinded token.
    pub unblinded_token: String,

    /// Base64 issuer public key.
    pub public_key: String,
}

impl PoolToken for ConfirmationToken {
    type Wire = ConfirmationTokenWire;

    fn to_wire(&self) -> ConfirmationTokenWire {
        ConfirmationTokenWire {
            unblinded_token: self.unblinded_token.to_base64(),
            public_key: self.public_key.to_base64(),
        }
    }

    fn from_wire(wire: ConfirmationTokenWire) -> Result<Self, TokenDecodeError> {
        Ok(Self {
            unblinded_token: UnblindedToken::from_base64(&wire.unblinded_token)?,
            public_key: PublicKey::from_base64(&wire.public_key)?,
        })
    }
}

/// A payment token and its blinded counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaymentTokenPair {
    /// The client-held payment token.
    pub payment_token: Token,

    /// The blinded token sent to the issuer.
    pub blinded_payment_token: BlindedToken,
}

/// Persisted form of a [`PaymentTokenPair`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTokenPairWire {
    /// Base64 payment token.
    pub payment_token: String,

    /// Base64 blinded payment token.
    pub blinded_payment_token: String,
}

impl PoolToken for PaymentTokenPair {
    type Wire = PaymentTokenPairWire;

    fn to_wire(&self) -> PaymentTokenPairWire {
        PaymentTokenPairWire {
            payment_token: self.payment_token.to_base64(),
            blinded_payment_token: self.blinded_payment_token.to_base64(),
        }
    }

    fn from_wire(wire: PaymentTokenPairWire) -> Result<Self, TokenDecodeError> {
        Ok(Self {
            payment_token: Token::from_base64(&wire.payment_token)?,
            blinded_payment_token: BlindedToken::from_base64(&wire.blinded_payment_token)?,
        })
    }
}

/// An ordered pool of spendable tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPool<T> {
    tokens: VecDeque<T>,
}

/// Pool of unblinded confirmation tokens.
pub type ConfirmationTokenPool = TokenPool<ConfirmationToken>;

/// Pool of payment token pairs.
pub type PaymentTokenPool = TokenPool<PaymentTokenPair>;

impl<T> Default for TokenPool<T> {
    fn default() -> Self {
        Self {
            tokens: VecDeque::new(),
        }
    }
}

impl<T: PoolToken> TokenPool<T> {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate over held tokens, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.tokens.iter()
    }

    /// Whether `token` is held.
    #[must_use]
    pub fn contains(&self, token: &T) -> bool {
        self.tokens.contains(token)
    }

    /// Add tokens, skipping any already held. Returns how many were added.
    pub fn add_tokens(&mut self, tokens: impl IntoIterator<Item = T>) -> usize {
        let mut added = 0;
        for token in tokens {
            if self.tokens.contains(&token) {
                continue;
            }
            self.tokens.push_back(token);
            added += 1;
        }
        added
    }

    /// Replace the pool contents.
    pub fn set_tokens(&mut self, tokens: impl IntoIterator<Item = T>) {
        self.tokens = tokens.into_iter().collect();
    }

    /// Move the oldest token out of the pool.
    pub fn take_next(&mut self) -> Option<T> {
        self.tokens.pop_front()
    }

    /// Remove a specific token. Returns whether it was held.
    pub fn remove(&mut self, token: &T) -> bool {
        if let Some(pos) = self.tokens.iter().position(|t| t == token) {
            self.tokens.remove(pos);
            true
        } else {
            false
        }
    }

    /// Drop every token.
    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    /// Every held token in persisted form.
    #[must_use]
    pub fn serialize(&self) -> Vec<T::Wire> {
        self.tokens.iter().map(T::to_wire).collect()
    }

    /// Replace the pool contents from persisted entries.
    ///
    /// Each entry is parsed on its own: malformed entries are dropped and
    /// their errors returned, well-formed entries are kept in order.
    pub fn deserialize(&mut self, entries: Vec<serde_json::Value>) -> Vec<TokenParseError> {
        let (tokens, errors): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .map(|entry| -> Result<T, TokenParseError> {
                let wire: T::Wire = serde_json::from_value(entry)?;
                Ok(T::from_wire(wire)?)
            })
            .partition(Result::is_ok);

        self.tokens = tokens.into_iter().filter_map(Result::ok).collect();
        errors.into_iter().filter_map(Result::err).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use testresult::TestResult;

    fn confirmation_token(seed: u8) -> ConfirmationToken {
        ConfirmationToken {
            unblinded_token: UnblindedToken::from_bytes(vec![seed; 96]),
            public_key: PublicKey::from_bytes(vec![0xAA; 32]),
        }
    }

    #[test]
    fn take_next_moves_oldest_token_out() {
        let mut pool = ConfirmationTokenPool::new();
        pool.add_tokens([confirmation_token(1), confirmation_token(2)]);

        let taken = pool.take_next();
        assert_eq!(taken, Some(confirmation_token(1)));
        assert!(!pool.contains(&confirmation_token(1)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn add_tokens_skips_duplicates() {
        let mut pool = ConfirmationTokenPool::new();
        assert_eq!(pool.add_tokens([confirmation_token(1)]), 1);
        assert_eq!(
            pool.add_tokens([confirmation_token(1), confirmation_token(2)]),
            1
        );
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn remove_reports_membership() {
        let mut pool = ConfirmationTokenPool::new();
        pool.add_tokens([confirmation_token(1)]);
        assert!(pool.remove(&confirmation_token(1)));
        assert!(!pool.remove(&confirmation_token(1)));
        assert!(pool.is_empty());
    }

    #[test]
    fn deserialize_keeps_well_formed_entries() -> TestResult {
        let good_a = serde_json::to_value(confirmation_token(1).to_wire())?;
        let good_b = serde_json::to_value(confirmation_token(2).to_wire())?;

        let mut pool = ConfirmationTokenPool::new();
        pool.add_tokens([confirmation_token(9)]);

        let errors = pool.deserialize(vec![
            good_a,
            json!({"unblinded_token": "%%%", "public_key": "qg=="}),
            json!("not an object"),
            json!({"public_key": "qg=="}),
            good_b,
        ]);

        assert_eq!(errors.len(), 3);
        assert_eq!(
            pool.iter().cloned().collect::<Vec<_>>(),
            vec![confirmation_token(1), confirmation_token(2)]
        );
        Ok(())
    }

    #[test]
    fn payment_pool_serializes_both_halves() {
        let pair = PaymentTokenPair {
            payment_token: Token::from_bytes(vec![1; 64]),
            blinded_payment_token: BlindedToken::from_bytes(vec![2; 32]),
        };
        let mut pool = PaymentTokenPool::new();
        pool.add_tokens([pair.clone()]);

        let wire = pool.serialize();
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].payment_token, pair.payment_token.to_base64());
        assert_eq!(
            wire[0].blinded_payment_token,
            pair.blinded_payment_token.to_base64()
        );
    }
}
