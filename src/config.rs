//! Settings shared by the page handlers.
//!
//! [`StatusConfig`] starts from sensible defaults and is adjusted with
//! chained `with_*` calls:
//!
//! ```rust
//! use torstatus_rs::config::{StatusConfig, TieBreak};
//! use chrono::Duration;
//!
//! let config = StatusConfig::default()
//!     .with_lookback(Duration::hours(12))
//!     .with_tie_break(TieBreak::LastRetrieved)
//!     .with_policy_cache_max_entries(500);
//!
//! assert_eq!(config.default_destination_port, 80);
//! assert_eq!(config.lookback, Duration::hours(12));
//! ```

use std::time::Duration as StdDuration;

use chrono::Duration;

/// Default window, counted back from the newest status entry, in which a
/// relay counts as having used an address.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

/// Port assumed when a destination address is given without a port.
pub const DEFAULT_DESTINATION_PORT: u16 = 80;

/// Default time a parsed exit policy stays cached.
pub const DEFAULT_POLICY_CACHE_TTL: StdDuration = StdDuration::from_secs(24 * 3600);

/// Default maximum number of cached exit policies.
pub const DEFAULT_POLICY_CACHE_MAX_ENTRIES: usize = 5000;

/// How to choose between status entries of one relay that carry the same
/// timestamp.
///
/// Storage backends rarely promise an order for such rows, so the choice is
/// explicit rather than accidental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Keep the entry the store returned first.
    #[default]
    FirstRetrieved,
    /// Keep the entry the store returned last.
    LastRetrieved,
}

/// Configuration for [`StatusPages`](crate::pages::StatusPages) and
/// [`lookup`](crate::lookup::lookup).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusConfig {
    /// How far back from the newest status entry the relay lookup searches.
    pub lookback: Duration,
    /// Port used when a destination address is given without one.
    pub default_destination_port: u16,
    /// Tie-break rule for status entries with equal timestamps.
    pub tie_break: TieBreak,
    /// How long a parsed exit policy stays in the cache.
    pub policy_cache_ttl: StdDuration,
    /// Maximum number of parsed exit policies kept in the cache.
    pub policy_cache_max_entries: usize,
    /// Executable run by [`SystemWhois`](crate::whois::SystemWhois).
    pub whois_command: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::hours(DEFAULT_LOOKBACK_HOURS),
            default_destination_port: DEFAULT_DESTINATION_PORT,
            tie_break: TieBreak::default(),
            policy_cache_ttl: DEFAULT_POLICY_CACHE_TTL,
            policy_cache_max_entries: DEFAULT_POLICY_CACHE_MAX_ENTRIES,
            whois_command: "whois".to_string(),
        }
    }
}

impl StatusConfig {
    /// Sets the lookback window of the relay lookup.
    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    /// Sets the port assumed when none is given. Zero is ignored.
    pub fn with_default_destination_port(mut self, port: u16) -> Self {
        if port > 0 {
            self.default_destination_port = port;
        }
        self
    }

    /// Sets the tie-break rule for equal timestamps.
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Sets the TTL of cached exit policies.
    pub fn with_policy_cache_ttl(mut self, ttl: StdDuration) -> Self {
        self.policy_cache_ttl = ttl;
        self
    }

    /// Sets the capacity of the exit policy cache.
    pub fn with_policy_cache_max_entries(mut self, max: usize) -> Self {
        self.policy_cache_max_entries = max;
        self
    }

    /// Sets the WHOIS executable.
    pub fn with_whois_command(mut self, command: impl Into<String>) -> Self {
        self.whois_command = command.into();
        self
    }
}
