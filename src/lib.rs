//! # torstatus-rs
//!
//! The controller layer of a Tor relay status dashboard.
//!
//! # Overview
//!
//! torstatus-rs answers the questions a relay status page is asked:
//!
//! - Which relays were in the latest consensus, filtered and sorted the way
//!   the visitor asked for?
//! - What does the most recent status entry of a given relay look like?
//! - Is a given IP address a Tor relay, and would that relay let traffic exit
//!   to a given destination and port?
//! - Who owns a given IP address (WHOIS passthrough)?
//!
//! Storage, session persistence, HTML rendering and HTTP transport are external
//! collaborators. The crate consumes storage through the
//! [`store::StatusStore`] trait and produces plain page structs from
//! [`pages`] that a renderer turns into HTML.
//!
//! # Exit Policy Engine
//!
//! The core of the crate is [`exit_policy`]: a parser for the exit policy
//! lines found in relay descriptors, pure address/port matchers, and a
//! first-match-wins evaluator.
//!
//! ```rust
//! use torstatus_rs::exit_policy::{ExitPolicy, Verdict};
//! use std::net::Ipv4Addr;
//!
//! let policy = ExitPolicy::parse("reject *:25\naccept *:*").unwrap();
//! let dns = Ipv4Addr::new(8, 8, 8, 8);
//!
//! assert_eq!(policy.verdict_for(dns, 25), Verdict::Reject);
//! assert_eq!(policy.verdict_for(dns, 443), Verdict::Accept);
//! ```
//!
//! # Relay Lookup
//!
//! [`lookup`] finds every relay that used a source address within the last
//! day and optionally evaluates each relay's exit policy against a
//! destination:
//!
//! ```rust
//! use torstatus_rs::cache::PolicyCache;
//! use torstatus_rs::config::StatusConfig;
//! use torstatus_rs::lookup::{lookup, ExitNodeQuery};
//! use torstatus_rs::store::{MemoryStore, RelaySnapshot};
//! use chrono::Utc;
//!
//! let mut store = MemoryStore::new();
//! store.insert(RelaySnapshot::new(
//!     "9695DFC35FFEB861329B9F1AB04C46397020CE31",
//!     "moria1",
//!     "128.31.0.34".parse().unwrap(),
//!     Utc::now(),
//! ).with_raw_exit_policy("reject *:25\naccept *:*"));
//!
//! let query = ExitNodeQuery::new("128.31.0.34", "8.8.8.8", "");
//! let report = lookup(&store, &PolicyCache::new(), &StatusConfig::default(), &query).unwrap();
//!
//! assert!(report.is_router);
//! assert_eq!(report.destination_port, "80");
//! assert_eq!(report.relays[0].exit_possible, Some(true));
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, Error>`]. Invalid visitor input
//! never aborts a page: it is recorded in the page data next to the raw text
//! the visitor typed.

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod exit_policy;
pub mod lookup;
pub mod pages;
pub mod preferences;
pub mod query;
pub mod session;
pub mod store;
pub mod util;
pub mod whois;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Request parameters as decoded by the HTTP layer (`GET` query string).
pub type Params = HashMap<String, String>;

/// Errors that can occur during torstatus-rs operations.
///
/// # Error Categories
///
/// | Error | Caused by | Page behaviour |
/// |-------|-----------|----------------|
/// | [`MalformedPolicy`](Error::MalformedPolicy) | Corrupt stored policy text | Relay flagged, lookup continues |
/// | [`InvalidInput`](Error::InvalidInput) | Visitor typed a bad address or port | Input echoed back |
/// | [`NotFound`](Error::NotFound) | Unknown fingerprint | Returned to the caller |
/// | [`Storage`](Error::Storage) | Storage collaborator failure | Propagated as-is |
/// | [`Io`](Error::Io) / [`Whois`](Error::Whois) | WHOIS subprocess failure | Returned to the caller |
#[derive(Debug, Error)]
pub enum Error {
    /// An exit policy line could not be decomposed into
    /// `accept|reject <address>[/<mask>]:<port>`.
    ///
    /// Parsing never skips a bad line, since a missing rule can change the
    /// verdict of every rule after it.
    #[error("malformed exit policy line {line:?}: {reason}")]
    MalformedPolicy {
        /// The offending line, trimmed.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Visitor supplied input that is not a valid address or port.
    #[error("invalid input {input:?}: {reason}")]
    InvalidInput {
        /// The raw text as supplied.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The requested relay is not known to the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The WHOIS client reported a failure.
    #[error("whois failed: {0}")]
    Whois(String),

    /// I/O error while running an external process.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Error::MalformedPolicy {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_input(input: &str, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Flags assigned to relays by the directory authorities, as shown on the
/// dashboard.
///
/// # Example
///
/// ```rust
/// use torstatus_rs::Flag;
///
/// let flag: Flag = "BadExit".parse().unwrap();
/// assert_eq!(flag, Flag::BadExit);
/// assert_eq!(flag.query_key(), "isbadexit");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Flag {
    /// Relay is a directory authority.
    Authority,
    /// Relay shouldn't be used for directory information.
    BadDirectory,
    /// Relay shouldn't be used as an exit.
    BadExit,
    /// Relay's exit policy makes it useful as an exit node.
    Exit,
    /// Relay is suitable for high-bandwidth circuits.
    Fast,
    /// Relay is suitable as an entry guard.
    Guard,
    /// Relay is hibernating because it ran out of bandwidth.
    Hibernating,
    /// Relay's nickname is bound to its key.
    Named,
    /// Relay is currently usable.
    Running,
    /// Relay is suitable for long-lived circuits.
    Stable,
    /// Relay has been validated.
    Valid,
    /// Relay supports the v2 directory protocol.
    V2Dir,
}

impl Flag {
    /// Every flag, in dashboard column order.
    pub const ALL: [Flag; 12] = [
        Flag::Authority,
        Flag::BadDirectory,
        Flag::BadExit,
        Flag::Exit,
        Flag::Fast,
        Flag::Guard,
        Flag::Hibernating,
        Flag::Named,
        Flag::Running,
        Flag::Stable,
        Flag::Valid,
        Flag::V2Dir,
    ];

    /// The request parameter naming this flag (`isauthority`, `isbadexit`, ...).
    pub fn query_key(&self) -> &'static str {
        match self {
            Flag::Authority => "isauthority",
            Flag::BadDirectory => "isbaddirectory",
            Flag::BadExit => "isbadexit",
            Flag::Exit => "isexit",
            Flag::Fast => "isfast",
            Flag::Guard => "isguard",
            Flag::Hibernating => "ishibernating",
            Flag::Named => "isnamed",
            Flag::Running => "isrunning",
            Flag::Stable => "isstable",
            Flag::Valid => "isvalid",
            Flag::V2Dir => "isv2dir",
        }
    }

    /// Looks a flag up by its request parameter name.
    pub fn from_query_key(key: &str) -> Option<Flag> {
        Flag::ALL.into_iter().find(|flag| flag.query_key() == key)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Authority => write!(f, "Authority"),
            Flag::BadDirectory => write!(f, "BadDirectory"),
            Flag::BadExit => write!(f, "BadExit"),
            Flag::Exit => write!(f, "Exit"),
            Flag::Fast => write!(f, "Fast"),
            Flag::Guard => write!(f, "Guard"),
            Flag::Hibernating => write!(f, "Hibernating"),
            Flag::Named => write!(f, "Named"),
            Flag::Running => write!(f, "Running"),
            Flag::Stable => write!(f, "Stable"),
            Flag::Valid => write!(f, "Valid"),
            Flag::V2Dir => write!(f, "V2Dir"),
        }
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Flag::ALL
            .into_iter()
            .find(|flag| flag.to_string() == s)
            .ok_or_else(|| Error::invalid_input(s, "unknown relay flag"))
    }
}
