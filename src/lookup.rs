//! Source-address relay lookup.
//!
//! Answers "is this IP address a Tor relay, and would it let traffic exit to
//! that destination?". The lookup searches the status entries of the last day
//! (counted back from the newest entry in the store, not from the wall clock),
//! collects every relay that used the source address, and evaluates the exit
//! policy of each relay's most recent entry against the destination.
//!
//! Visitor input is never trusted and never fatal. Each of the three inputs is
//! validated on its own, echoed back in the [`NodeQueryReport`] along with a
//! validity flag, and invalid ones are collected in
//! [`NodeQueryReport::invalid_inputs`].
//!
//! # Example
//!
//! ```rust
//! use torstatus_rs::cache::PolicyCache;
//! use torstatus_rs::config::StatusConfig;
//! use torstatus_rs::lookup::{lookup, ExitNodeQuery};
//! use torstatus_rs::store::{MemoryStore, RelaySnapshot};
//! use chrono::Utc;
//!
//! let store: MemoryStore = [RelaySnapshot::new(
//!     "9695DFC35FFEB861329B9F1AB04C46397020CE31",
//!     "moria1",
//!     "128.31.0.34".parse().unwrap(),
//!     Utc::now(),
//! )
//! .with_raw_exit_policy("reject *:25\naccept *:*")]
//! .into_iter()
//! .collect();
//!
//! let query = ExitNodeQuery::new("128.31.0.34", "8.8.8.8", "25");
//! let report = lookup(&store, &PolicyCache::new(), &StatusConfig::default(), &query).unwrap();
//! assert_eq!(report.relays[0].nickname, "moria1");
//! assert_eq!(report.relays[0].exit_possible, Some(false));
//! ```

use std::cmp::Ordering;
use std::net::Ipv4Addr;

use tracing::{debug, warn};

use crate::cache::{PolicyCache, PolicyKey};
use crate::config::{StatusConfig, TieBreak};
use crate::store::{RelaySnapshot, StatusStore, TimeWindow};
use crate::util::{parse_ipv4_address, parse_port};
use crate::{Error, Params};

/// Request parameter carrying the address to look up.
pub const PARAM_SOURCE: &str = "queryAddress";
/// Request parameter carrying the destination address.
pub const PARAM_DESTINATION_ADDRESS: &str = "destinationAddress";
/// Request parameter carrying the destination port.
pub const PARAM_DESTINATION_PORT: &str = "destinationPort";

/// Raw visitor input of an exit node query. Absent fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitNodeQuery {
    /// Address that may belong to a relay.
    pub source: String,
    /// Destination the relay would exit to.
    pub destination_address: String,
    /// Destination port. Empty means the configured default.
    pub destination_port: String,
}

impl ExitNodeQuery {
    /// Creates a query from raw strings.
    pub fn new(
        source: impl Into<String>,
        destination_address: impl Into<String>,
        destination_port: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination_address: destination_address.into(),
            destination_port: destination_port.into(),
        }
    }

    /// Reads `queryAddress`, `destinationAddress` and `destinationPort`.
    pub fn from_params(params: &Params) -> Self {
        let get = |key: &str| params.get(key).cloned().unwrap_or_default();
        Self {
            source: get(PARAM_SOURCE),
            destination_address: get(PARAM_DESTINATION_ADDRESS),
            destination_port: get(PARAM_DESTINATION_PORT),
        }
    }
}

/// One relay that used the source address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMatch {
    /// Nickname from the relay's most recent entry in the window.
    pub nickname: String,
    /// Relay fingerprint.
    pub fingerprint: String,
    /// Whether the relay would exit to the destination. `None` when no valid
    /// destination was asked about.
    pub exit_possible: Option<bool>,
    /// Set when the stored exit policy could not be parsed.
    pub integrity_warning: Option<String>,
}

impl RelayMatch {
    /// Returns `true` only if the exit policy was evaluated and accepted.
    pub fn can_exit(&self) -> bool {
        self.exit_possible == Some(true)
    }
}

/// Result of an exit node query, echoing the visitor's input.
#[derive(Debug, Default)]
pub struct NodeQueryReport {
    /// Source address as typed.
    pub source: String,
    /// Whether `source` is a valid IPv4 address.
    pub source_valid: bool,
    /// Destination address as typed.
    pub destination_address: String,
    /// Whether `destination_address` is a valid IPv4 address.
    pub destination_address_valid: bool,
    /// Destination port as typed, or the default port when it was left empty
    /// next to a valid destination address.
    pub destination_port: String,
    /// Whether `destination_port` is usable.
    pub destination_port_valid: bool,
    /// Whether at least one relay used the source address.
    pub is_router: bool,
    /// Relays that used the source address, in store order.
    pub relays: Vec<RelayMatch>,
    /// Every [`Error::InvalidInput`] found while validating the query.
    pub invalid_inputs: Vec<Error>,
}

/// Looks up the relays that used `query.source` within the configured
/// lookback window and evaluates their exit policies.
///
/// # Errors
///
/// Only storage failures are returned. Invalid input and corrupt stored
/// policies are reported inside the [`NodeQueryReport`].
pub fn lookup<S: StatusStore + ?Sized>(
    store: &S,
    cache: &PolicyCache,
    config: &StatusConfig,
    query: &ExitNodeQuery,
) -> Result<NodeQueryReport, Error> {
    let mut report = NodeQueryReport {
        source: query.source.clone(),
        destination_address: query.destination_address.clone(),
        destination_port: query.destination_port.clone(),
        ..Default::default()
    };

    let source = validate(&query.source, parse_ipv4_address, &mut report.invalid_inputs);
    report.source_valid = source.is_some();

    let destination = validate(
        &query.destination_address,
        parse_ipv4_address,
        &mut report.invalid_inputs,
    );
    report.destination_address_valid = destination.is_some();

    let port = if query.destination_port.is_empty() && destination.is_some() {
        report.destination_port = config.default_destination_port.to_string();
        Some(config.default_destination_port)
    } else {
        validate(&query.destination_port, parse_port, &mut report.invalid_inputs)
    };
    report.destination_port_valid = port.is_some();

    let Some(source) = source else {
        return Ok(report);
    };
    let Some(latest) = store.latest_published()? else {
        debug!("status store is empty, nothing to look up");
        return Ok(report);
    };

    let window = TimeWindow::new(latest - config.lookback, latest);
    let target = destination.zip(port);

    for fingerprint in store.fingerprints_at_address(source, &window)? {
        let snapshots = store.snapshots_for(&fingerprint, &window)?;
        let Some(snapshot) = most_recent(snapshots, config.tie_break) else {
            continue;
        };

        let relay = match target {
            Some((address, port)) => check_exit(cache, &snapshot, address, port),
            None => RelayMatch {
                nickname: snapshot.nickname,
                fingerprint: snapshot.fingerprint,
                exit_possible: None,
                integrity_warning: None,
            },
        };
        report.relays.push(relay);
    }

    report.is_router = !report.relays.is_empty();
    debug!(
        "exit node query for {} found {} relays",
        source,
        report.relays.len()
    );
    Ok(report)
}

/// Picks the entry with the newest timestamp, resolving equal timestamps by
/// `tie_break`.
pub fn most_recent(snapshots: Vec<RelaySnapshot>, tie_break: TieBreak) -> Option<RelaySnapshot> {
    snapshots
        .into_iter()
        .reduce(|best, next| match next.published.cmp(&best.published) {
            Ordering::Greater => next,
            Ordering::Less => best,
            Ordering::Equal => match tie_break {
                TieBreak::FirstRetrieved => best,
                TieBreak::LastRetrieved => next,
            },
        })
}

fn validate<T>(
    raw: &str,
    parse: impl Fn(&str) -> Result<T, Error>,
    invalid: &mut Vec<Error>,
) -> Option<T> {
    if raw.is_empty() {
        return None;
    }
    match parse(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            invalid.push(e);
            None
        }
    }
}

fn check_exit(
    cache: &PolicyCache,
    snapshot: &RelaySnapshot,
    address: Ipv4Addr,
    port: u16,
) -> RelayMatch {
    let key = PolicyKey::for_snapshot(snapshot);
    let (exit_possible, integrity_warning) =
        match cache.get_or_parse(&key, &snapshot.raw_exit_policy) {
            Ok(policy) => (Some(policy.can_exit_to(address, port)), None),
            Err(e) => {
                warn!(
                    "exit policy of {} ({}) is corrupt: {}",
                    snapshot.nickname, snapshot.fingerprint, e
                );
                (Some(false), Some(e.to_string()))
            }
        };

    RelayMatch {
        nickname: snapshot.nickname.clone(),
        fingerprint: snapshot.fingerprint.clone(),
        exit_possible,
        integrity_warning,
    }
}
