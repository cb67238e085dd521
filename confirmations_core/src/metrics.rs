//! Prometheus metrics instrumentation for the confirmation ledger.
//!
//! This module is only available when the `metrics` feature is enabled.

/// Metric names used throughout the crate.
pub mod names {
    /// Number of confirmations currently in the retry queue.
    pub const RETRY_QUEUE_LENGTH: &str = "confirmations_retry_queue_length";
    /// Total confirmations appended to the retry queue.
    pub const CONFIRMATIONS_APPENDED: &str = "confirmations_appended_total";
    /// Total confirmations removed from the retry queue.
    pub const CONFIRMATIONS_REMOVED: &str = "confirmations_removed_total";
    /// Total confirmations evicted from a capped retry queue.
    pub const CONFIRMATIONS_EVICTED: &str = "confirmations_evicted_total";

    /// Number of unblinded confirmation tokens held.
    pub const CONFIRMATION_TOKENS: &str = "confirmations_confirmation_tokens";
    /// Number of payment token pairs held.
    pub const PAYMENT_TOKENS: &str = "confirmations_payment_tokens";

    // Persistence
    /// Total successful ledger saves.
    pub const SAVES_SUCCEEDED: &str = "confirmations_saves_succeeded_total";
    /// Total failed ledger saves.
    pub const SAVES_FAILED: &str = "confirmations_saves_failed_total";
    /// Total records dropped while loading, labeled by `section`.
    pub const RECORDS_DROPPED: &str = "confirmations_records_dropped_total";

    // Verification
    /// Total confirmations verified, labeled by `outcome`.
    pub const VERIFICATIONS: &str = "confirmations_verifications_total";
}

/// Record the current retry queue length.
#[inline]
pub fn set_retry_queue_length(len: usize) {
    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(names::RETRY_QUEUE_LENGTH).set(len as f64);
}

/// Record a confirmation appended to the retry queue.
#[inline]
pub fn confirmation_appended() {
    metrics::counter!(names::CONFIRMATIONS_APPENDED).increment(1);
}

/// Record a confirmation removed from the retry queue.
#[inline]
pub fn confirmation_removed() {
    confirmations_removed(1);
}

/// Record `count` confirmations removed from the retry queue at once.
#[inline]
pub fn confirmations_removed(count: usize) {
    metrics::counter!(names::CONFIRMATIONS_REMOVED).increment(count as u64);
}

/// Record a confirmation evicted from a full retry queue.
#[inline]
pub fn confirmation_evicted() {
    metrics::counter!(names::CONFIRMATIONS_EVICTED).increment(1);
}

/// Record the sizes of both token pools.
#[inline]
pub fn set_token_counts(confirmation_tokens: usize, payment_tokens: usize) {
    #[allow(clippy::cast_precision_loss)]
    {
        metrics::gauge!(names::CONFIRMATION_TOKENS).set(confirmation_tokens as f64);
        metrics::gauge!(names::PAYMENT_TOKENS).set(payment_tokens as f64);
    }
}

/// Record a successful save.
#[inline]
pub fn save_succeeded() {
    metrics::counter!(names::SAVES_SUCCEEDED).increment(1);
}

/// Record a failed save.
#[inline]
pub fn save_failed() {
    metrics::counter!(names::SAVES_FAILED).increment(1);
}

/// Record records dropped from one section of a loaded document.
#[inline]
pub fn records_dropped(section: &'static str, count: usize) {
    if count > 0 {
        metrics::counter!(names::RECORDS_DROPPED, "section" => section).increment(count as u64);
    }
}

/// Record the outcome of a verification.
#[inline]
pub fn verification(passed: bool) {
    let outcome = if passed { "passed" } else { "failed" };
    metrics::counter!(names::VERIFICATIONS, "outcome" => outcome).increment(1);
}
