//! Access to stored relay status entries.
//!
//! The dashboard does not own its data. Status entries are written by a
//! separate ingestion process, and this crate only reads them through the
//! [`StatusStore`] trait. [`MemoryStore`] is a complete in-memory
//! implementation used by tests and small deployments.
//!
//! # Example
//!
//! ```rust
//! use torstatus_rs::store::{MemoryStore, RelaySnapshot, StatusStore, TimeWindow};
//! use chrono::{Duration, Utc};
//!
//! let now = Utc::now();
//! let mut store = MemoryStore::new();
//! store.insert(RelaySnapshot::new(
//!     "9695DFC35FFEB861329B9F1AB04C46397020CE31",
//!     "moria1",
//!     "128.31.0.34".parse().unwrap(),
//!     now,
//! ));
//!
//! let window = TimeWindow::new(now - Duration::hours(24), now);
//! let fingerprints = store
//!     .fingerprints_at_address("128.31.0.34".parse().unwrap(), &window)
//!     .unwrap();
//! assert_eq!(fingerprints, vec!["9695DFC35FFEB861329B9F1AB04C46397020CE31"]);
//! ```

use std::collections::HashSet;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};

use crate::descriptor;
use crate::{Error, Flag};

/// One status entry of one relay, as of one consensus.
///
/// Only `fingerprint`, `nickname`, `address`, `published` and
/// `raw_exit_policy` are needed by the relay lookup. The remaining fields feed
/// the relay list and the details page and are `None`/empty when the store
/// doesn't know them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySnapshot {
    /// Relay identity fingerprint (40 hex characters).
    pub fingerprint: String,
    /// Relay nickname. Not unique.
    pub nickname: String,
    /// Address the relay used in this consensus.
    pub address: Ipv4Addr,
    /// Valid-after time of the consensus this entry belongs to.
    pub published: DateTime<Utc>,
    /// Exit policy lines from the relay's descriptor, one rule per line.
    pub raw_exit_policy: String,
    /// OR port.
    pub or_port: u16,
    /// Directory port, if the relay serves directory information.
    pub dir_port: Option<u16>,
    /// Flags assigned in this consensus.
    pub flags: Vec<Flag>,
    /// Observed bandwidth in bytes per second.
    pub bandwidth: Option<u64>,
    /// Uptime in seconds as reported in the descriptor.
    pub uptime: Option<u64>,
    /// Platform line of the descriptor, e.g. `Tor 0.4.8.9 on Linux`.
    pub platform: Option<String>,
    /// Contact line of the descriptor.
    pub contact: Option<String>,
    /// Reverse DNS name of `address`.
    pub hostname: Option<String>,
    /// Two letter country code supplied by the store.
    pub country_code: Option<String>,
    /// When the descriptor referenced by this entry was published.
    pub descriptor_published: Option<DateTime<Utc>>,
}

impl RelaySnapshot {
    /// Creates an entry with the required fields; everything else is empty.
    pub fn new(
        fingerprint: impl Into<String>,
        nickname: impl Into<String>,
        address: Ipv4Addr,
        published: DateTime<Utc>,
    ) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            nickname: nickname.into(),
            address,
            published,
            raw_exit_policy: String::new(),
            or_port: 0,
            dir_port: None,
            flags: Vec::new(),
            bandwidth: None,
            uptime: None,
            platform: None,
            contact: None,
            hostname: None,
            country_code: None,
            descriptor_published: None,
        }
    }

    /// Sets the raw exit policy text.
    pub fn with_raw_exit_policy(mut self, raw: impl Into<String>) -> Self {
        self.raw_exit_policy = raw.into();
        self
    }

    /// Sets the raw exit policy from the full text of a server descriptor.
    pub fn with_raw_descriptor(mut self, raw_descriptor: &str) -> Self {
        self.raw_exit_policy = descriptor::exit_policy_text(raw_descriptor);
        self
    }

    /// Sets the relay flags.
    pub fn with_flags(mut self, flags: impl IntoIterator<Item = Flag>) -> Self {
        self.flags = flags.into_iter().collect();
        self
    }

    /// Checks if the relay carries `flag` in this entry.
    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }
}

/// An inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Oldest accepted timestamp.
    pub start: DateTime<Utc>,
    /// Newest accepted timestamp.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a window from `start` to `end`, both inclusive.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Checks if `t` lies inside the window.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Read access to relay status entries.
///
/// Implementations return entries in a stable order of their choosing; callers
/// preserve that order in what they display.
pub trait StatusStore {
    /// Timestamp of the newest status entry, or `None` for an empty store.
    fn latest_published(&self) -> Result<Option<DateTime<Utc>>, Error>;

    /// Every entry of the consensus published at `published`.
    fn consensus(&self, published: DateTime<Utc>) -> Result<Vec<RelaySnapshot>, Error>;

    /// The newest entry of `fingerprint`, optionally no newer than
    /// `at_or_before`.
    fn latest_snapshot(
        &self,
        fingerprint: &str,
        at_or_before: Option<DateTime<Utc>>,
    ) -> Result<Option<RelaySnapshot>, Error>;

    /// Distinct fingerprints of relays that used `address` inside `window`.
    fn fingerprints_at_address(
        &self,
        address: Ipv4Addr,
        window: &TimeWindow,
    ) -> Result<Vec<String>, Error>;

    /// Every entry of `fingerprint` inside `window`.
    fn snapshots_for(
        &self,
        fingerprint: &str,
        window: &TimeWindow,
    ) -> Result<Vec<RelaySnapshot>, Error>;
}

impl<T: StatusStore + ?Sized> StatusStore for &T {
    fn latest_published(&self) -> Result<Option<DateTime<Utc>>, Error> {
        (**self).latest_published()
    }

    fn consensus(&self, published: DateTime<Utc>) -> Result<Vec<RelaySnapshot>, Error> {
        (**self).consensus(published)
    }

    fn latest_snapshot(
        &self,
        fingerprint: &str,
        at_or_before: Option<DateTime<Utc>>,
    ) -> Result<Option<RelaySnapshot>, Error> {
        (**self).latest_snapshot(fingerprint, at_or_before)
    }

    fn fingerprints_at_address(
        &self,
        address: Ipv4Addr,
        window: &TimeWindow,
    ) -> Result<Vec<String>, Error> {
        (**self).fingerprints_at_address(address, window)
    }

    fn snapshots_for(
        &self,
        fingerprint: &str,
        window: &TimeWindow,
    ) -> Result<Vec<RelaySnapshot>, Error> {
        (**self).snapshots_for(fingerprint, window)
    }
}

/// A [`StatusStore`] holding entries in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<RelaySnapshot>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn insert(&mut self, snapshot: RelaySnapshot) {
        self.entries.push(snapshot);
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<RelaySnapshot> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = RelaySnapshot>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl StatusStore for MemoryStore {
    fn latest_published(&self) -> Result<Option<DateTime<Utc>>, Error> {
        Ok(self.entries.iter().map(|e| e.published).max())
    }

    fn consensus(&self, published: DateTime<Utc>) -> Result<Vec<RelaySnapshot>, Error> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.published == published)
            .cloned()
            .collect())
    }

    fn latest_snapshot(
        &self,
        fingerprint: &str,
        at_or_before: Option<DateTime<Utc>>,
    ) -> Result<Option<RelaySnapshot>, Error> {
        let mut latest: Option<&RelaySnapshot> = None;
        for entry in &self.entries {
            if entry.fingerprint != fingerprint {
                continue;
            }
            if at_or_before.is_some_and(|t| entry.published > t) {
                continue;
            }
            if latest.map_or(true, |l| entry.published > l.published) {
                latest = Some(entry);
            }
        }
        Ok(latest.cloned())
    }

    fn fingerprints_at_address(
        &self,
        address: Ipv4Addr,
        window: &TimeWindow,
    ) -> Result<Vec<String>, Error> {
        let mut seen = HashSet::new();
        let mut fingerprints = Vec::new();
        for entry in &self.entries {
            if entry.address == address
                && window.contains(entry.published)
                && seen.insert(entry.fingerprint.as_str())
            {
                fingerprints.push(entry.fingerprint.clone());
            }
        }
        Ok(fingerprints)
    }

    fn snapshots_for(
        &self,
        fingerprint: &str,
        window: &TimeWindow,
    ) -> Result<Vec<RelaySnapshot>, Error> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.fingerprint == fingerprint && window.contains(e.published))
            .cloned()
            .collect())
    }
}
