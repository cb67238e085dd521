//! The persisted ledger document.
//!
//! ```json
//! {
//!   "issuers": { "public_key": "…", "issuers": [{ "name": "…", "public_key": "…" }] },
//!   "confirmations": { "failed_confirmations": [ … ] },
//!   "unblinded_tokens": [{ "unblinded_token": "…", "public_key": "…" }],
//!   "unblinded_payment_tokens": [{ "payment_token": "…", "blinded_payment_token": "…" }]
//! }
//! ```
//!
//! Parsing is strict about the document's structure and lenient about its
//! contents. A document that is not an object, or that lacks the
//! `confirmations` section, fails as a whole. A single bad confirmation record
//! or token entry is dropped and logged while its neighbours survive.
//!
//! Top-level sections the ledger does not interpret (for example
//! `transaction_history`) are kept in [`LedgerDocument::extra`] and written
//! back unchanged.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    confirmation::{
        Confirmation,
        wire::{ConfirmationWire, RecordParseError},
    },
    inventory::{
        ConfirmationTokenPool, ConfirmationTokenWire, PaymentTokenPairWire, PaymentTokenPool,
    },
    issuer::Issuers,
};

const ISSUERS: &str = "issuers";
const CONFIRMATIONS: &str = "confirmations";
const FAILED_CONFIRMATIONS: &str = "failed_confirmations";
const UNBLINDED_TOKENS: &str = "unblinded_tokens";
const UNBLINDED_PAYMENT_TOKENS: &str = "unblinded_payment_tokens";

const KNOWN_SECTIONS: [&str; 4] = [
    ISSUERS,
    CONFIRMATIONS,
    UNBLINDED_TOKENS,
    UNBLINDED_PAYMENT_TOKENS,
];

/// A document-level parse failure. The whole document is rejected.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The bytes are not JSON.
    #[error("ledger document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top level is not an object.
    #[error("ledger document is not a JSON object")]
    NotAnObject,

    /// A required section is absent.
    #[error("ledger document is missing `{0}`")]
    MissingSection(&'static str),

    /// A section is present with the wrong JSON type.
    #[error("ledger section `{section}` must be {expected}")]
    InvalidSection {
        /// The offending section.
        section: &'static str,

        /// The JSON type it must have.
        expected: &'static str,
    },

    /// The issuers section does not have the issuer shape.
    #[error("malformed issuers section: {0}")]
    Issuers(#[source] serde_json::Error),
}

/// How many entries were dropped from each section while parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DroppedRecords {
    /// Failed confirmation records.
    pub confirmations: usize,

    /// Unblinded confirmation tokens.
    pub confirmation_tokens: usize,

    /// Unblinded payment tokens.
    pub payment_tokens: usize,
}

impl DroppedRecords {
    /// Total entries dropped across all sections.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.confirmations + self.confirmation_tokens + self.payment_tokens
    }
}

/// The full contents of a ledger, as persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerDocument {
    /// Token issuers.
    pub issuers: Issuers,

    /// The retry queue, oldest first.
    pub failed_confirmations: Vec<Confirmation>,

    /// Spendable confirmation tokens.
    pub confirmation_tokens: ConfirmationTokenPool,

    /// Spendable payment tokens.
    pub payment_tokens: PaymentTokenPool,

    /// Top-level sections the ledger does not interpret, kept verbatim.
    pub extra: Map<String, Value>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    issuers: &'a Issuers,
    confirmations: ConfirmationsRef,
    unblinded_tokens: Vec<ConfirmationTokenWire>,
    unblinded_payment_tokens: Vec<PaymentTokenPairWire>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Serialize)]
struct ConfirmationsRef {
    failed_confirmations: Vec<ConfirmationWire>,
}

impl LedgerDocument {
    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `serde_json` fails to serialize a value.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        encode(
            &self.issuers,
            &self.failed_confirmations,
            &self.confirmation_tokens,
            &self.payment_tokens,
            &self.extra,
        )
    }

    /// Parse a document, discarding the drop report.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] if the document structure is invalid.
    pub fn from_json(bytes: &[u8]) -> Result<Self, DocumentError> {
        Self::parse(bytes).map(|(document, _)| document)
    }

    /// Parse a document, reporting how many entries were dropped.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] if the document structure is invalid.
    /// Invalid individual records are not errors.
    pub fn parse(bytes: &[u8]) -> Result<(Self, DroppedRecords), DocumentError> {
        let Value::Object(mut root) = serde_json::from_slice::<Value>(bytes)? else {
            return Err(DocumentError::NotAnObject);
        };

        let mut dropped = DroppedRecords::default();

        let failed_confirmations = {
            let section = root
                .remove(CONFIRMATIONS)
                .ok_or(DocumentError::MissingSection(CONFIRMATIONS))?;
            let Value::Object(mut section) = section else {
                return Err(DocumentError::InvalidSection {
                    section: CONFIRMATIONS,
                    expected: "an object",
                });
            };
            let records = section
                .remove(FAILED_CONFIRMATIONS)
                .ok_or(DocumentError::MissingSection(FAILED_CONFIRMATIONS))?;
            let Value::Array(records) = records else {
                return Err(DocumentError::InvalidSection {
                    section: FAILED_CONFIRMATIONS,
                    expected: "a list",
                });
            };

            let mut confirmations = Vec::with_capacity(records.len());
            for (index, record) in records.into_iter().enumerate() {
                match ConfirmationWire::parse_value(record) {
                    Ok(confirmation) => confirmations.push(confirmation),
                    Err(err) => {
                        log_dropped_record(index, &err);
                        dropped.confirmations += 1;
                    }
                }
            }
            confirmations
        };

        let issuers = match root.remove(ISSUERS) {
            Some(value) => serde_json::from_value(value).map_err(DocumentError::Issuers)?,
            None => {
                tracing::warn!(section = ISSUERS, "ledger section missing, using default");
                Issuers::default()
            }
        };

        let mut confirmation_tokens = ConfirmationTokenPool::new();
        if let Some(entries) = token_list(&mut root, UNBLINDED_TOKENS)? {
            let errors = confirmation_tokens.deserialize(entries);
            for err in &errors {
                tracing::warn!(section = UNBLINDED_TOKENS, %err, "dropping token entry");
            }
            dropped.confirmation_tokens = errors.len();
        }

        let mut payment_tokens = PaymentTokenPool::new();
        if let Some(entries) = token_list(&mut root, UNBLINDED_PAYMENT_TOKENS)? {
            let errors = payment_tokens.deserialize(entries);
            for err in &errors {
                tracing::warn!(section = UNBLINDED_PAYMENT_TOKENS, %err, "dropping token entry");
            }
            dropped.payment_tokens = errors.len();
        }

        if !root.is_empty() {
            tracing::debug!(
                sections = ?root.keys().collect::<Vec<_>>(),
                "keeping unrecognized ledger sections"
            );
        }

        #[cfg(feature = "metrics")]
        {
            crate::metrics::records_dropped(FAILED_CONFIRMATIONS, dropped.confirmations);
            crate::metrics::records_dropped(UNBLINDED_TOKENS, dropped.confirmation_tokens);
            crate::metrics::records_dropped(UNBLINDED_PAYMENT_TOKENS, dropped.payment_tokens);
        }

        Ok((
            Self {
                issuers,
                failed_confirmations,
                confirmation_tokens,
                payment_tokens,
                extra: root,
            },
            dropped,
        ))
    }
}

/// Serialize ledger contents without first collecting them into a [`LedgerDocument`].
pub(crate) fn encode(
    issuers: &Issuers,
    failed_confirmations: &[Confirmation],
    confirmation_tokens: &ConfirmationTokenPool,
    payment_tokens: &PaymentTokenPool,
    extra: &Map<String, Value>,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&DocumentRef {
        issuers,
        confirmations: ConfirmationsRef {
            failed_confirmations: failed_confirmations
                .iter()
                .map(ConfirmationWire::from)
                .collect(),
        },
        unblinded_tokens: confirmation_tokens.serialize(),
        unblinded_payment_tokens: payment_tokens.serialize(),
        extra: extra
            .iter()
            .filter(|(section, _)| !KNOWN_SECTIONS.contains(&section.as_str()))
            .map(|(section, value)| (section.clone(), value.clone()))
            .collect(),
    })
}

fn token_list(
    root: &mut serde_json::Map<String, Value>,
    section: &'static str,
) -> Result<Option<Vec<Value>>, DocumentError> {
    match root.remove(section) {
        Some(Value::Array(entries)) => Ok(Some(entries)),
        Some(_) => Err(DocumentError::InvalidSection {
            section,
            expected: "a list",
        }),
        None => {
            tracing::warn!(section, "ledger section missing, using default");
            Ok(None)
        }
    }
}

fn log_dropped_record(index: usize, err: &RecordParseError) {
    tracing::warn!(index, %err, "dropping invalid failed confirmation");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{confirmation_token, payment_token_pair, signed_confirmation};
    use serde_json::json;
    use testresult::TestResult;

    #[test]
    fn empty_document_roundtrips() -> TestResult {
        let bytes = LedgerDocument::default().to_json()?;
        assert_eq!(LedgerDocument::from_json(&bytes)?, LedgerDocument::default());
        Ok(())
    }

    #[test]
    fn populated_document_roundtrips() -> TestResult {
        let mut document = LedgerDocument::default();
        document.failed_confirmations = vec![signed_confirmation(1), signed_confirmation(2)];
        document.confirmation_tokens.add_tokens([confirmation_token(7)]);
        document.payment_tokens.add_tokens([payment_token_pair(7)]);

        let parsed = LedgerDocument::from_json(&document.to_json()?)?;
        assert_eq!(parsed, document);
        Ok(())
    }

    #[test]
    fn top_level_list_is_rejected() {
        assert!(matches!(
            LedgerDocument::from_json(b"[]"),
            Err(DocumentError::NotAnObject)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            LedgerDocument::from_json(b"{not json"),
            Err(DocumentError::Json(_))
        ));
    }

    #[test]
    fn missing_confirmations_is_rejected() -> TestResult {
        let bytes = serde_json::to_vec(&json!({ "unblinded_tokens": [] }))?;
        assert!(matches!(
            LedgerDocument::from_json(&bytes),
            Err(DocumentError::MissingSection("confirmations"))
        ));
        Ok(())
    }

    #[test]
    fn confirmations_of_wrong_type_is_rejected() -> TestResult {
        let bytes = serde_json::to_vec(&json!({ "confirmations": [] }))?;
        assert!(matches!(
            LedgerDocument::from_json(&bytes),
            Err(DocumentError::InvalidSection {
                section: "confirmations",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn token_section_of_wrong_type_is_rejected() -> TestResult {
        let bytes = serde_json::to_vec(&json!({
            "confirmations": { "failed_confirmations": [] },
            "unblinded_tokens": "nope",
        }))?;
        assert!(matches!(
            LedgerDocument::from_json(&bytes),
            Err(DocumentError::InvalidSection {
                section: "unblinded_tokens",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn optional_sections_default() -> TestResult {
        let bytes = serde_json::to_vec(&json!({
            "confirmations": { "failed_confirmations": [] }
        }))?;
        assert_eq!(LedgerDocument::from_json(&bytes)?, LedgerDocument::default());
        Ok(())
    }

    #[test]
    fn bad_entries_are_dropped_and_counted() -> TestResult {
        let good = serde_json::to_value(ConfirmationWire::from(&signed_confirmation(1)))?;
        let bytes = serde_json::to_vec(&json!({
            "confirmations": { "failed_confirmations": [good, { "id": "x" }, 42] },
            "unblinded_tokens": [{ "unblinded_token": "" , "public_key": "qg==" }],
            "unblinded_payment_tokens": [],
        }))?;

        let (document, dropped) = LedgerDocument::parse(&bytes)?;
        assert_eq!(document.failed_confirmations, vec![signed_confirmation(1)]);
        assert!(document.confirmation_tokens.is_empty());
        assert_eq!(
            dropped,
            DroppedRecords {
                confirmations: 2,
                confirmation_tokens: 1,
                payment_tokens: 0,
            }
        );
        assert_eq!(dropped.total(), 3);
        Ok(())
    }

    #[test]
    fn unrecognized_sections_survive_a_roundtrip() -> TestResult {
        let bytes = serde_json::to_vec(&json!({
            "confirmations": { "failed_confirmations": [] },
            "next_token_redemption_date_in_seconds": "1600000000",
            "transaction_history": { "transactions": [{ "estimated_redemption_value": 0.05 }] },
            "ads_rewards": { "payments": [] },
        }))?;

        let document = LedgerDocument::from_json(&bytes)?;
        assert_eq!(document.extra.len(), 3);

        let resaved: Value = serde_json::from_slice(&document.to_json()?)?;
        assert_eq!(resaved["next_token_redemption_date_in_seconds"], "1600000000");
        assert_eq!(
            resaved["transaction_history"],
            json!({ "transactions": [{ "estimated_redemption_value": 0.05 }] })
        );
        assert_eq!(resaved["ads_rewards"], json!({ "payments": [] }));
        Ok(())
    }

    #[test]
    fn extra_cannot_shadow_known_sections() -> TestResult {
        let mut document = LedgerDocument::default();
        document.extra.insert("unblinded_tokens".into(), json!("shadowed"));
        document.failed_confirmations = vec![signed_confirmation(1)];

        let reparsed = LedgerDocument::from_json(&document.to_json()?)?;
        assert_eq!(reparsed.failed_confirmations, vec![signed_confirmation(1)]);
        assert!(reparsed.confirmation_tokens.is_empty());
        assert!(reparsed.extra.is_empty());
        Ok(())
    }
}
