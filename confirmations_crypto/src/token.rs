//! Opaque token values.

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

/// An error decoding a token value from its base64 form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenDecodeError {
    /// The value is not valid standard base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The value decoded to zero bytes.
    #[error("token value is empty")]
    Empty,
}

macro_rules! token_value {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Wrap raw bytes.
            #[must_use]
            pub const fn from_bytes(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }

            /// Decode from standard base64.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is not base64 or decodes to nothing.
            pub fn from_base64(encoded: &str) -> Result<Self, TokenDecodeError> {
                let bytes = STANDARD.decode(encoded)?;
                if bytes.is_empty() {
                    return Err(TokenDecodeError::Empty);
                }
                Ok(Self(bytes))
            }

            /// Encode as standard base64.
            #[must_use]
            pub fn to_base64(&self) -> String {
                STANDARD.encode(&self.0)
            }

            /// The raw bytes.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl core::str::FromStr for $name {
            type Err = TokenDecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_base64(s)
            }
        }
    };
}

token_value! {
    /// A token the issuer has signed and the client has unblinded.
    ///
    /// Spendable exactly once: a verification key derived from it signs
    /// one confirmation.
    UnblindedToken
}

token_value! {
    /// A random payment token, kept client side until redemption.
    Token
}

token_value! {
    /// The blinded counterpart of a [`Token`], sent to the issuer for signing.
    BlindedToken
}

token_value! {
    /// An issuer public key.
    PublicKey
}

// Unblinded and payment tokens are spendable secrets.

impl core::fmt::Debug for UnblindedToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("UnblindedToken").finish_non_exhaustive()
    }
}

impl core::fmt::Debug for Token {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Token").finish_non_exhaustive()
    }
}

impl core::fmt::Debug for BlindedToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "BlindedToken({})", self.to_base64())
    }
}

impl core::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn base64_roundtrip() -> TestResult {
        let token = UnblindedToken::from_bytes(vec![1, 2, 3, 4]);
        let decoded = UnblindedToken::from_base64(&token.to_base64())?;
        assert_eq!(decoded, token);
        Ok(())
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(
            PublicKey::from_base64("not base64!"),
            Err(TokenDecodeError::Base64(_))
        ));
    }

    #[test]
    fn rejects_empty_value() {
        assert_eq!(BlindedToken::from_base64(""), Err(TokenDecodeError::Empty));
    }

    #[test]
    fn debug_does_not_leak_secret_tokens() {
        let token = UnblindedToken::from_bytes(vec![42; 32]);
        let debug_str = format!("{token:?}");
        assert!(debug_str.contains("UnblindedToken"));
        assert!(!debug_str.contains(&token.to_base64()));

        let payment = Token::from_bytes(vec![42; 32]);
        assert!(!format!("{payment:?}").contains(&payment.to_base64()));
    }

    #[test]
    fn debug_shows_public_values() {
        let key = PublicKey::from_bytes(vec![7; 32]);
        assert!(format!("{key:?}").contains(&key.to_base64()));
    }
}
