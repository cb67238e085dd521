//! The confirmation ledger.
//!
//! A [`ConfirmationLedger`] owns the issuer set, both token pools and the
//! retry queue, and persists all of them as one [`LedgerDocument`] through a
//! [`LedgerStorage`] backend.
//!
//! ```text
//!            initialize()
//! Uninitialized ──────────► Loading ──┬── not found ─────► Ready (+1 save)
//!       ▲                             ├── valid doc ─────► Ready
//!       └─────────────────────────────┴── bad doc / I/O ─► Uninitialized
//! ```
//!
//! Every mutator saves the whole document before returning. A failed save is
//! logged and otherwise ignored; the next mutation saves again.
//!
//! [`LedgerDocument`]: crate::document::LedgerDocument

pub mod error;

use core::marker::PhantomData;

use confirmations_crypto::token::PublicKey;
use future_form::FutureForm;

use self::error::{LoadError, NotReady, ToJsonError};
use crate::{
    config::LedgerConfig,
    confirmation::Confirmation,
    document::{self, LedgerDocument},
    inventory::{ConfirmationToken, ConfirmationTokenPool, PaymentTokenPair, PaymentTokenPool},
    issuer::Issuers,
    queue::RetryQueue,
    storage::LedgerStorage,
};

/// Lifecycle of a [`ConfirmationLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerState {
    /// Not loaded. Only [`ConfirmationLedger::initialize`] is permitted.
    Uninitialized,

    /// A load is in progress.
    Loading,

    /// Loaded. Every operation is permitted.
    Ready,
}

/// The persistent store of issuers, tokens and failed confirmations.
pub struct ConfirmationLedger<K: FutureForm, S: LedgerStorage<K>> {
    config: LedgerConfig,
    storage: S,
    state: LedgerState,

    issuers: Issuers,
    retry_queue: RetryQueue,
    confirmation_tokens: ConfirmationTokenPool,
    payment_tokens: PaymentTokenPool,
    extra: serde_json::Map<String, serde_json::Value>,

    _phantom: PhantomData<K>,
}

impl<K: FutureForm, S: LedgerStorage<K> + core::fmt::Debug> core::fmt::Debug
    for ConfirmationLedger<K, S>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfirmationLedger")
            .field("config", &self.config)
            .field("storage", &self.storage)
            .field("state", &self.state)
            .field("failed_confirmations", &self.retry_queue.len())
            .field("confirmation_tokens", &self.confirmation_tokens.len())
            .field("payment_tokens", &self.payment_tokens.len())
            .finish_non_exhaustive()
    }
}

impl<K: FutureForm, S: LedgerStorage<K>> ConfirmationLedger<K, S> {
    /// Create an uninitialized ledger over `storage` with the default configuration.
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, LedgerConfig::default())
    }

    /// Create an uninitialized ledger over `storage`.
    #[must_use]
    pub fn with_config(storage: S, config: LedgerConfig) -> Self {
        let retry_queue = RetryQueue::new(config.max_retry_queue_len);
        Self {
            config,
            storage,
            state: LedgerState::Uninitialized,
            issuers: Issuers::default(),
            retry_queue,
            confirmation_tokens: ConfirmationTokenPool::new(),
            payment_tokens: PaymentTokenPool::new(),
            extra: serde_json::Map::new(),
            _phantom: PhantomData,
        }
    }

    /// The current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LedgerState {
        self.state
    }

    /// Whether the ledger has loaded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == LedgerState::Ready
    }

    /// The storage backend.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// The configuration.
    pub const fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Load the ledger from storage.
    ///
    /// # Errors
    ///
    /// * [`LoadError::AlreadyInitialized`] if the ledger is already loaded.
    /// * Otherwise, any error from [`Self::load`].
    pub async fn initialize(&mut self) -> Result<(), LoadError<S::Error>> {
        if self.state == LedgerState::Ready {
            tracing::error!("confirmation ledger already initialized");
            return Err(LoadError::AlreadyInitialized);
        }
        self.load().await
    }

    /// Read the persisted document and replace the ledger's contents with it.
    ///
    /// A missing document is a fresh install: the ledger becomes ready with
    /// empty contents and saves once. Invalid individual records are dropped
    /// and logged; only a structurally invalid document fails the load.
    ///
    /// # Errors
    ///
    /// * [`LoadError::Storage`] if the backend fails.
    /// * [`LoadError::Document`] if the document cannot be parsed.
    ///
    /// Calling this on a ready ledger reloads it, discarding unsaved
    /// in-memory state in favour of what storage holds.
    ///
    /// On error the ledger is left [`LedgerState::Uninitialized`] with empty
    /// contents, whatever it held before.
    pub async fn load(&mut self) -> Result<(), LoadError<S::Error>> {
        tracing::info!(key = %self.config.key, "loading confirmation ledger");
        self.state = LedgerState::Loading;

        let bytes = match self.storage.load(self.config.key.clone()).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(%err, "failed to load confirmation ledger");
                self.unload();
                return Err(LoadError::Storage(err));
            }
        };

        let Some(bytes) = bytes else {
            tracing::info!("no confirmation ledger found, starting fresh");
            self.install(LedgerDocument::default());
            self.save().await;
            return Ok(());
        };

        match LedgerDocument::parse(&bytes) {
            Ok((document, dropped)) => {
                self.install(document);
                tracing::info!(
                    failed_confirmations = self.retry_queue.len(),
                    confirmation_tokens = self.confirmation_tokens.len(),
                    payment_tokens = self.payment_tokens.len(),
                    dropped = dropped.total(),
                    "loaded confirmation ledger"
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(%err, "failed to parse confirmation ledger");
                self.unload();
                Err(LoadError::Document(err))
            }
        }
    }

    fn install(&mut self, document: LedgerDocument) {
        self.issuers = document.issuers;
        self.retry_queue.replace(document.failed_confirmations);
        self.confirmation_tokens = document.confirmation_tokens;
        self.payment_tokens = document.payment_tokens;
        self.extra = document.extra;
        self.state = LedgerState::Ready;
        self.record_gauges();
    }

    fn clear_contents(&mut self) {
        self.issuers = Issuers::default();
        self.retry_queue.clear();
        self.confirmation_tokens.clear();
        self.payment_tokens.clear();
        self.extra.clear();
        self.record_gauges();
    }

    fn unload(&mut self) {
        self.clear_contents();
        self.state = LedgerState::Uninitialized;
    }

    /// Persist the ledger.
    ///
    /// Does nothing unless the ledger is ready. Returns whether the document
    /// was persisted; failures are logged, not returned.
    pub async fn save(&self) -> bool {
        if self.state != LedgerState::Ready {
            tracing::debug!(state = ?self.state, "skipping save of unready ledger");
            return false;
        }

        let bytes = match self.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(%err, "failed to serialize confirmation ledger");
                #[cfg(feature = "metrics")]
                crate::metrics::save_failed();
                return false;
            }
        };

        match self.storage.save(self.config.key.clone(), bytes).await {
            Ok(()) => {
                tracing::debug!("saved confirmation ledger");
                #[cfg(feature = "metrics")]
                crate::metrics::save_succeeded();
                true
            }
            Err(err) => {
                tracing::error!(%err, "failed to save confirmation ledger");
                #[cfg(feature = "metrics")]
                crate::metrics::save_failed();
                false
            }
        }
    }

    /// Serialize the ledger document.
    ///
    /// # Errors
    ///
    /// Returns [`ToJsonError::NotReady`] unless the ledger is ready.
    pub fn to_json(&self) -> Result<Vec<u8>, ToJsonError> {
        self.ensure_ready()?;
        Ok(self.encode()?)
    }

    fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        document::encode(
            &self.issuers,
            self.retry_queue.as_slice(),
            &self.confirmation_tokens,
            &self.payment_tokens,
            &self.extra,
        )
    }

    /***************
     * RETRY QUEUE *
     ***************/

    /// Queue a confirmation that could not be submitted, then save.
    ///
    /// The same confirmation appended twice is queued twice.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub async fn append_failed_confirmation(
        &mut self,
        confirmation: Confirmation,
    ) -> Result<(), NotReady> {
        self.ensure_ready()?;

        tracing::debug!(id = %confirmation.id, "appending failed confirmation");
        if let Some(evicted) = self.retry_queue.push(confirmation) {
            tracing::warn!(id = %evicted.id, "retry queue full, evicted oldest confirmation");
            #[cfg(feature = "metrics")]
            crate::metrics::confirmation_evicted();
        }

        #[cfg(feature = "metrics")]
        crate::metrics::confirmation_appended();
        self.record_gauges();

        self.save().await;
        Ok(())
    }

    /// Remove the first queued confirmation with the same id as `confirmation`.
    ///
    /// Saves only if something was removed. Returns whether an entry was found.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub async fn remove_failed_confirmation(
        &mut self,
        confirmation: &Confirmation,
    ) -> Result<bool, NotReady> {
        self.ensure_ready()?;

        if !self.retry_queue.remove(&confirmation.id) {
            tracing::debug!(id = %confirmation.id, "failed confirmation not queued");
            return Ok(false);
        }

        tracing::debug!(id = %confirmation.id, "removed failed confirmation");
        #[cfg(feature = "metrics")]
        crate::metrics::confirmation_removed();
        self.record_gauges();

        self.save().await;
        Ok(true)
    }

    /// Keep only the queued confirmations for which `keep` returns `true`,
    /// then save once if anything was dropped. Returns how many were dropped.
    ///
    /// Unlike [`Self::remove_failed_confirmation`] this judges each entry on
    /// its own, so of two entries sharing an id only the rejected one goes.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub async fn retain_failed_confirmations(
        &mut self,
        keep: impl FnMut(&Confirmation) -> bool,
    ) -> Result<usize, NotReady> {
        self.ensure_ready()?;

        let dropped = self.retry_queue.retain(keep);
        if dropped == 0 {
            return Ok(0);
        }

        tracing::debug!(dropped, "dropped failed confirmations");
        #[cfg(feature = "metrics")]
        crate::metrics::confirmations_removed(dropped);
        self.record_gauges();

        self.save().await;
        Ok(dropped)
    }

    /// The queued confirmations, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub fn failed_confirmations(&self) -> Result<&[Confirmation], NotReady> {
        self.ensure_ready()?;
        Ok(self.retry_queue.as_slice())
    }

    /***********
     * ISSUERS *
     ***********/

    /// Replace the issuer set, then save.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub async fn set_issuers(&mut self, issuers: Issuers) -> Result<(), NotReady> {
        self.ensure_ready()?;
        tracing::debug!(count = issuers.len(), "setting issuers");
        self.issuers = issuers;
        self.save().await;
        Ok(())
    }

    /// The issuer set.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub fn issuers(&self) -> Result<&Issuers, NotReady> {
        self.ensure_ready()?;
        Ok(&self.issuers)
    }

    /// Whether any issuer publishes `public_key`.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub fn is_valid_issuer_public_key(&self, public_key: &PublicKey) -> Result<bool, NotReady> {
        self.ensure_ready()?;
        Ok(self.issuers.is_valid_public_key(&public_key.to_base64()))
    }

    /**********
     * TOKENS *
     **********/

    /// The unblinded confirmation tokens.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub fn confirmation_tokens(&self) -> Result<&ConfirmationTokenPool, NotReady> {
        self.ensure_ready()?;
        Ok(&self.confirmation_tokens)
    }

    /// The payment token pairs.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub fn payment_tokens(&self) -> Result<&PaymentTokenPool, NotReady> {
        self.ensure_ready()?;
        Ok(&self.payment_tokens)
    }

    /// Add confirmation tokens, skipping any already held, then save.
    /// Returns how many were added.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub async fn add_confirmation_tokens(
        &mut self,
        tokens: impl IntoIterator<Item = ConfirmationToken>,
    ) -> Result<usize, NotReady> {
        self.ensure_ready()?;
        let added = self.confirmation_tokens.add_tokens(tokens);
        tracing::debug!(added, total = self.confirmation_tokens.len(), "added confirmation tokens");
        if added > 0 {
            self.record_gauges();
            self.save().await;
        }
        Ok(added)
    }

    /// Add payment token pairs, skipping any already held, then save.
    /// Returns how many were added.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub async fn add_payment_tokens(
        &mut self,
        tokens: impl IntoIterator<Item = PaymentTokenPair>,
    ) -> Result<usize, NotReady> {
        self.ensure_ready()?;
        let added = self.payment_tokens.add_tokens(tokens);
        tracing::debug!(added, total = self.payment_tokens.len(), "added payment tokens");
        if added > 0 {
            self.record_gauges();
            self.save().await;
        }
        Ok(added)
    }

    /// Move the oldest confirmation token out of the pool, then save.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub async fn take_confirmation_token(&mut self) -> Result<Option<ConfirmationToken>, NotReady> {
        self.ensure_ready()?;
        let token = self.confirmation_tokens.take_next();
        if token.is_some() {
            self.record_gauges();
            self.save().await;
        } else {
            tracing::warn!("no confirmation tokens left");
        }
        Ok(token)
    }

    /// Move the oldest payment token pair out of the pool, then save.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub async fn take_payment_token(&mut self) -> Result<Option<PaymentTokenPair>, NotReady> {
        self.ensure_ready()?;
        let pair = self.payment_tokens.take_next();
        if pair.is_some() {
            self.record_gauges();
            self.save().await;
        } else {
            tracing::warn!("no payment tokens left");
        }
        Ok(pair)
    }

    /*********
     * RESET *
     *********/

    /// Clear every section, delete the persisted document, and save the empty default.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] unless the ledger is ready.
    pub async fn reset(&mut self) -> Result<(), NotReady> {
        self.ensure_ready()?;
        tracing::info!(key = %self.config.key, "resetting confirmation ledger");

        self.clear_contents();

        if let Err(err) = self.storage.delete(self.config.key.clone()).await {
            tracing::error!(%err, "failed to delete confirmation ledger");
        }

        self.save().await;
        Ok(())
    }

    const fn ensure_ready(&self) -> Result<(), NotReady> {
        match self.state {
            LedgerState::Ready => Ok(()),
            state => Err(NotReady { state }),
        }
    }

    #[allow(clippy::unused_self)]
    fn record_gauges(&self) {
        #[cfg(feature = "metrics")]
        {
            crate::metrics::set_retry_queue_length(self.retry_queue.len());
            crate::metrics::set_token_counts(
                self.confirmation_tokens.len(),
                self.payment_tokens.len(),
            );
        }
    }
}
