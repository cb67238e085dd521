//! Timestamps

use core::{num::ParseIntError, str::FromStr};

/// A timestamp represented as non-leap seconds since the Unix epoch.
///
/// Persisted as a decimal string (`"1587379631"`), matching the ledger
/// document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimestampSeconds(u64);

impl TimestampSeconds {
    /// Create a new timestamp from seconds since Unix epoch.
    #[must_use]
    pub const fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current timestamp.
    ///
    /// A clock set before the Unix epoch reads as the epoch itself.
    #[must_use]
    pub fn now() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self(secs)
    }

    /// Get the raw seconds value.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0
    }
}

impl FromStr for TimestampSeconds {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl core::fmt::Display for TimestampSeconds {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
