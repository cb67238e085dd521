//! Persisted form of a [`Confirmation`].
//!
//! Every field is optional on the wire so that a record missing a required
//! field surfaces as a [`RecordParseError`] naming that field, rather than
//! as an opaque deserialization failure. Records written before
//! `transaction_id` and `ad_type` existed are migrated on parse.

use core::num::ParseIntError;

use confirmations_crypto::token::{BlindedToken, Token, TokenDecodeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{AdType, Confirmation, ConfirmationId, ConfirmationType, TransactionId, UnknownTag};
use crate::{
    inventory::{ConfirmationToken, ConfirmationTokenWire, PoolToken},
    timestamp::TimestampSeconds,
};

/// One entry of `confirmations.failed_confirmations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationWire {
    /// Unique identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Ledger transaction identifier. Absent in legacy records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    /// Creative instance identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_instance_id: Option<String>,

    /// Confirmation type tag.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub confirmation_type: Option<String>,

    /// Ad type tag. Absent in legacy records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_type: Option<String>,

    /// The spent confirmation token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_info: Option<ConfirmationTokenWire>,

    /// Base64 payment token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_token: Option<String>,

    /// Base64 blinded payment token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blinded_payment_token: Option<String>,

    /// Base64 credential envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,

    /// Opaque extra data. Must be an object when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,

    /// Creation time as a decimal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_in_seconds: Option<String>,

    /// Whether the server accepted the confirmation. Defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

/// Why a single persisted confirmation record was rejected.
#[derive(Debug, Error)]
pub enum RecordParseError {
    /// The record is not an object, or a field has the wrong JSON type.
    #[error("malformed confirmation record: {0}")]
    Shape(#[from] serde_json::Error),

    /// A required field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A token field failed to decode.
    #[error("undecodable `{field}`: {source}")]
    Token {
        /// The offending field.
        field: &'static str,

        /// The underlying decode error.
        #[source]
        source: TokenDecodeError,
    },

    /// The `type` or `ad_type` tag is not recognised.
    #[error(transparent)]
    UnknownTag(#[from] UnknownTag),

    /// `timestamp_in_seconds` is not a decimal number.
    #[error("invalid timestamp_in_seconds: {0}")]
    InvalidTimestamp(#[source] ParseIntError),

    /// `user_data` is present but not an object.
    #[error("user_data must be an object")]
    InvalidUserData,
}

impl ConfirmationWire {
    /// Parse one record from an arbitrary JSON value.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordParseError`] if the value is not a valid record.
    pub fn parse_value(value: serde_json::Value) -> Result<Confirmation, RecordParseError> {
        let wire: Self = serde_json::from_value(value)?;
        Confirmation::try_from(wire)
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, RecordParseError> {
    value.ok_or(RecordParseError::MissingField(field))
}

fn decode<T>(
    value: Option<String>,
    field: &'static str,
    f: impl FnOnce(&str) -> Result<T, TokenDecodeError>,
) -> Result<T, RecordParseError> {
    let encoded = required(value, field)?;
    f(&encoded).map_err(|source| RecordParseError::Token { field, source })
}

impl TryFrom<ConfirmationWire> for Confirmation {
    type Error = RecordParseError;

    fn try_from(wire: ConfirmationWire) -> Result<Self, Self::Error> {
        let id = ConfirmationId::new(required(wire.id, "id")?);

        let transaction_id = match wire.transaction_id {
            Some(id) => TransactionId::new(id),
            None => {
                let generated = TransactionId::random();
                tracing::debug!(%id, %generated, "migrating record without transaction_id");
                generated
            }
        };

        let creative_instance_id = required(wire.creative_instance_id, "creative_instance_id")?;
        let confirmation_type: ConfirmationType = required(wire.confirmation_type, "type")?.parse()?;

        let ad_type = match wire.ad_type {
            Some(tag) => tag.parse()?,
            None => AdType::LEGACY_DEFAULT,
        };

        let token_info = required(wire.token_info, "token_info")?;
        let token = ConfirmationToken::from_wire(token_info).map_err(|source| {
            RecordParseError::Token {
                field: "token_info",
                source,
            }
        })?;

        let payment_token = decode(wire.payment_token, "payment_token", Token::from_base64)?;
        let blinded_payment_token = decode(
            wire.blinded_payment_token,
            "blinded_payment_token",
            BlindedToken::from_base64,
        )?;

        let credential = required(wire.credential, "credential")?;

        let user_data = match wire.user_data {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Object(map)) => Some(map),
            Some(_) => return Err(RecordParseError::InvalidUserData),
        };

        let created_at = wire
            .timestamp_in_seconds
            .map(|s| s.parse::<TimestampSeconds>())
            .transpose()
            .map_err(RecordParseError::InvalidTimestamp)?;

        Ok(Self {
            id,
            transaction_id,
            creative_instance_id,
            confirmation_type,
            ad_type,
            token,
            payment_token,
            blinded_payment_token,
            credential,
            user_data,
            created_at,
            was_created: wire.created.unwrap_or(true),
        })
    }
}

impl From<&Confirmation> for ConfirmationWire {
    fn from(confirmation: &Confirmation) -> Self {
        Self {
            id: Some(confirmation.id.as_str().to_owned()),
            transaction_id: Some(confirmation.transaction_id.as_str().to_owned()),
            creative_instance_id: Some(confirmation.creative_instance_id.clone()),
            confirmation_type: Some(confirmation.confirmation_type.as_str().to_owned()),
            ad_type: Some(confirmation.ad_type.as_str().to_owned()),
            token_info: Some(confirmation.token.to_wire()),
            payment_token: Some(confirmation.payment_token.to_base64()),
            blinded_payment_token: Some(confirmation.blinded_payment_token.to_base64()),
            credential: Some(confirmation.credential.clone()),
            user_data: confirmation
                .user_data
                .clone()
                .map(serde_json::Value::Object),
            timestamp_in_seconds: confirmation.created_at.map(|ts| ts.to_string()),
            created: Some(confirmation.was_created),
        }
    }
}
