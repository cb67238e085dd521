//! Confirmation records.
//!
//! A [`Confirmation`] asserts that one ad event happened. It is bound to one
//! spent [`ConfirmationToken`] and one [`PaymentTokenPair`], and carries a
//! credential signed with a key derived from that token.
//!
//! A `Confirmation` value is always valid: every required field has been
//! decoded. Persisted records that fail to decode never become a
//! `Confirmation` (see [`wire`]).

pub mod wire;

use core::str::FromStr;

use confirmations_crypto::token::{BlindedToken, Token};
use thiserror::Error;

use crate::{
    inventory::{ConfirmationToken, PaymentTokenPair},
    timestamp::TimestampSeconds,
};

/// Globally unique confirmation identifier. Removal from the retry queue is keyed on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfirmationId(String);

impl ConfirmationId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random (v4 UUID) identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ConfirmationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the ledger transaction a confirmation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random (v4 UUID) identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An unrecognised tag for an enum persisted as a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported {kind} tag: {tag:?}")]
pub struct UnknownTag {
    kind: &'static str,
    tag: String,
}

/// The ad event a confirmation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfirmationType {
    /// The ad was served.
    Served,
    /// The ad was viewed.
    Viewed,
    /// The ad was clicked.
    Clicked,
    /// The ad was dismissed.
    Dismissed,
    /// The user landed on the advertiser's page.
    Landed,
    /// The ad was flagged as inappropriate.
    Flagged,
    /// The ad was upvoted.
    Upvoted,
    /// The ad was downvoted.
    Downvoted,
    /// The ad led to a conversion.
    Conversion,
}

impl ConfirmationType {
    /// Every supported confirmation type.
    pub const ALL: [Self; 9] = [
        Self::Served,
        Self::Viewed,
        Self::Clicked,
        Self::Dismissed,
        Self::Landed,
        Self::Flagged,
        Self::Upvoted,
        Self::Downvoted,
        Self::Conversion,
    ];

    /// The persisted tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Served => "served",
            Self::Viewed => "view",
            Self::Clicked => "click",
            Self::Dismissed => "dismiss",
            Self::Landed => "landed",
            Self::Flagged => "flag",
            Self::Upvoted => "upvote",
            Self::Downvoted => "downvote",
            Self::Conversion => "conversion",
        }
    }
}

impl FromStr for ConfirmationType {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTag {
                kind: "confirmation type",
                tag: s.to_owned(),
            })
    }
}

impl core::fmt::Display for ConfirmationType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of ad a confirmation is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdType {
    /// Notification ad. Records persisted before `ad_type` existed are all of this kind.
    #[default]
    AdNotification,
    /// New tab page sponsored image.
    NewTabPageAd,
    /// Promoted content ad.
    PromotedContentAd,
    /// Inline content ad.
    InlineContentAd,
    /// Search result ad.
    SearchResultAd,
}

impl AdType {
    /// Every supported ad type.
    pub const ALL: [Self; 5] = [
        Self::AdNotification,
        Self::NewTabPageAd,
        Self::PromotedContentAd,
        Self::InlineContentAd,
        Self::SearchResultAd,
    ];

    /// Assumed for persisted records that predate the `ad_type` field.
    pub const LEGACY_DEFAULT: Self = Self::AdNotification;

    /// The persisted tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AdNotification => "ad_notification",
            Self::NewTabPageAd => "new_tab_page_ad",
            Self::PromotedContentAd => "promoted_content_ad",
            Self::InlineContentAd => "inline_content_ad",
            Self::SearchResultAd => "search_result_ad",
        }
    }
}

impl FromStr for AdType {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTag {
                kind: "ad type",
                tag: s.to_owned(),
            })
    }
}

impl core::fmt::Display for AdType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confirmation of one ad event.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    /// Unique identifier.
    pub id: ConfirmationId,

    /// Ledger transaction identifier.
    pub transaction_id: TransactionId,

    /// The creative instance the event happened on.
    pub creative_instance_id: String,

    /// The reported event.
    pub confirmation_type: ConfirmationType,

    /// The kind of ad.
    pub ad_type: AdType,

    /// The spent confirmation token.
    pub token: ConfirmationToken,

    /// Payment token redeemed for this confirmation.
    pub payment_token: Token,

    /// Blinded counterpart of [`Self::payment_token`].
    pub blinded_payment_token: BlindedToken,

    /// Base64 signed credential.
    pub credential: String,

    /// Opaque extra data, preserved verbatim.
    pub user_data: Option<serde_json::Map<String, serde_json::Value>>,

    /// When the confirmation was created.
    pub created_at: Option<TimestampSeconds>,

    /// Whether the confirmation was accepted by the server at least once.
    pub was_created: bool,
}

impl Confirmation {
    /// The payment token pair bound to this confirmation.
    #[must_use]
    pub fn payment_token_pair(&self) -> PaymentTokenPair {
        PaymentTokenPair {
            payment_token: self.payment_token.clone(),
            blinded_payment_token: self.blinded_payment_token.clone(),
        }
    }

    /// The exact bytes signed into the credential.
    ///
    /// A compact JSON object of the confirmation's public attributes, keys in
    /// lexicographic order:
    ///
    /// ```text
    /// {"blindedPaymentToken":"…","creativeInstanceId":"…","payload":{…},"type":"view"}
    /// ```
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        build_payload(
            &self.blinded_payment_token,
            &self.creative_instance_id,
            self.confirmation_type,
            self.user_data.as_ref(),
        )
        .into_bytes()
    }
}

/// Build the signed payload from its parts.
///
/// Keys are inserted in sorted order so the output is identical whether or
/// not `serde_json` preserves insertion order.
pub(crate) fn build_payload(
    blinded_payment_token: &BlindedToken,
    creative_instance_id: &str,
    confirmation_type: ConfirmationType,
    user_data: Option<&serde_json::Map<String, serde_json::Value>>,
) -> String {
    use serde_json::Value;

    let mut object = serde_json::Map::new();
    object.insert(
        "blindedPaymentToken".into(),
        Value::String(blinded_payment_token.to_base64()),
    );
    object.insert(
        "creativeInstanceId".into(),
        Value::String(creative_instance_id.to_owned()),
    );
    object.insert(
        "payload".into(),
        Value::Object(user_data.cloned().unwrap_or_default()),
    );
    object.insert(
        "type".into(),
        Value::String(confirmation_type.as_str().to_owned()),
    );

    Value::Object(object).to_string()
}
