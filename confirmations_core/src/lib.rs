//! # Confirmations
//!
//! The anonymous ad-confirmation token ledger.
//!
//! A client proves it showed (or a user clicked, dismissed, …) an ad by
//! spending one anonymous token per event. This crate holds those tokens,
//! remembers confirmations that could not be submitted so they can be
//! retried, and checks that a confirmation was signed by a token the ledger
//! actually owned.
//!
//! - [`ledger::ConfirmationLedger`]: Owns issuers, token pools and the retry
//!   queue; persists them through a [`storage::LedgerStorage`] backend
//! - [`inventory::TokenPool`]: Ordered pool of spendable tokens
//! - [`confirmation::Confirmation`]: One confirmed ad event
//! - [`builder::ConfirmationBuilder`]: Signs a new confirmation with a spent token
//! - [`verifier::ConfirmationVerifier`]: Checks a confirmation's signature
//!
//! # Lifecycle
//!
//! ```text
//! ConfirmationLedger::new(storage) ──initialize()──► Ready
//!
//! take_confirmation_token() ──► ConfirmationBuilder::build() ──► Confirmation
//!                                                                   │
//!                                  submit fails ◄───────────────────┘
//!                                       │
//!                     append_failed_confirmation() ──► retry ──► remove_failed_confirmation()
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod builder;
pub mod config;
pub mod confirmation;
pub mod credential;
pub mod document;
pub mod inventory;
pub mod issuer;
pub mod ledger;
pub mod queue;
pub mod storage;
pub mod timestamp;
pub mod verifier;

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use ledger::ConfirmationLedger;
