//! Integration tests for the source-address relay lookup.

use chrono::Duration;
use torstatus_rs::cache::PolicyCache;
use torstatus_rs::config::{StatusConfig, TieBreak};
use torstatus_rs::lookup::{lookup, ExitNodeQuery, NodeQueryReport};
use torstatus_rs::store::{MemoryStore, RelaySnapshot};
use torstatus_rs::Error;

use crate::{address, consensus_time, create_test_store, CAERSIDI, MORIA1, SHARED_ADDRESS, TOR26};

fn run(store: &MemoryStore, config: &StatusConfig, query: ExitNodeQuery) -> NodeQueryReport {
    lookup(store, &PolicyCache::new(), config, &query).expect("lookup failed")
}

#[test]
fn test_relays_sharing_an_address() {
    let store = create_test_store();
    let report = run(
        &store,
        &StatusConfig::default(),
        ExitNodeQuery::new(SHARED_ADDRESS, "8.8.8.8", "443"),
    );

    assert!(report.is_router);
    let fingerprints: Vec<_> = report.relays.iter().map(|r| r.fingerprint.as_str()).collect();
    assert_eq!(fingerprints, vec![MORIA1, TOR26]);

    let moria1 = &report.relays[0];
    assert_eq!(moria1.exit_possible, Some(true));
    assert!(moria1.integrity_warning.is_none());

    let tor26 = &report.relays[1];
    assert_eq!(tor26.exit_possible, Some(false));
    assert!(tor26.integrity_warning.is_some());
}

#[test]
fn test_smtp_blocked() {
    let store = create_test_store();
    let report = run(
        &store,
        &StatusConfig::default(),
        ExitNodeQuery::new(SHARED_ADDRESS, "8.8.8.8", "25"),
    );
    assert_eq!(report.relays[0].exit_possible, Some(false));
}

#[test]
fn test_port_defaults_to_80() {
    let store = create_test_store();
    let report = run(
        &store,
        &StatusConfig::default(),
        ExitNodeQuery::new(SHARED_ADDRESS, "10.1.1.1", ""),
    );

    assert_eq!(report.destination_port, "80");
    assert!(report.destination_port_valid);
    assert_eq!(report.relays[0].exit_possible, Some(false));
}

#[test]
fn test_configured_default_port() {
    let store = create_test_store();
    let config = StatusConfig::default().with_default_destination_port(25);
    let report = run(&store, &config, ExitNodeQuery::new(SHARED_ADDRESS, "8.8.8.8", ""));

    assert_eq!(report.destination_port, "25");
    assert_eq!(report.relays[0].exit_possible, Some(false));
}

#[test]
fn test_invalid_inputs_are_echoed() {
    let store = create_test_store();
    let report = run(
        &store,
        &StatusConfig::default(),
        ExitNodeQuery::new("128.31.0", "example.com", "70000"),
    );

    assert_eq!(report.source, "128.31.0");
    assert_eq!(report.destination_address, "example.com");
    assert_eq!(report.destination_port, "70000");
    assert!(!report.source_valid);
    assert!(!report.destination_address_valid);
    assert!(!report.destination_port_valid);
    assert!(!report.is_router);
    assert_eq!(report.invalid_inputs.len(), 3);
    assert!(report
        .invalid_inputs
        .iter()
        .all(|e| matches!(e, Error::InvalidInput { .. })));
}

#[test]
fn test_old_entries_outside_window() {
    let store = create_test_store();

    let report = run(
        &store,
        &StatusConfig::default(),
        ExitNodeQuery::new("71.35.133.197", "", ""),
    );
    assert_eq!(report.relays.len(), 1);
    assert_eq!(report.relays[0].fingerprint, CAERSIDI);

    let config = StatusConfig::default().with_lookback(Duration::hours(6));
    let report = run(&store, &config, ExitNodeQuery::new("71.35.133.197", "", ""));
    assert!(!report.is_router);
}

#[test]
fn test_tie_break_is_configurable() {
    let shared = address(SHARED_ADDRESS);
    let store: MemoryStore = [
        RelaySnapshot::new(MORIA1, "first", shared, consensus_time(0))
            .with_raw_exit_policy("accept *:*"),
        RelaySnapshot::new(MORIA1, "second", shared, consensus_time(0))
            .with_raw_exit_policy("reject *:*"),
    ]
    .into_iter()
    .collect();
    let query = || ExitNodeQuery::new(SHARED_ADDRESS, "8.8.8.8", "443");

    let report = run(&store, &StatusConfig::default(), query());
    assert_eq!(report.relays[0].nickname, "first");
    assert!(report.relays[0].can_exit());

    let config = StatusConfig::default().with_tie_break(TieBreak::LastRetrieved);
    let report = run(&store, &config, query());
    assert_eq!(report.relays[0].nickname, "second");
    assert!(!report.relays[0].can_exit());
}

#[test]
fn test_policies_are_cached() {
    let store = create_test_store();
    let cache = PolicyCache::new();
    let query = ExitNodeQuery::new(SHARED_ADDRESS, "8.8.8.8", "443");

    lookup(&store, &cache, &StatusConfig::default(), &query).unwrap();
    lookup(&store, &cache, &StatusConfig::default(), &query).unwrap();

    // the corrupt policy of tor26 is never cached
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn test_newest_entry_wins_even_after_moving() {
    let store: MemoryStore = [
        RelaySnapshot::new(MORIA1, "moria1", address(SHARED_ADDRESS), consensus_time(0))
            .with_raw_exit_policy("accept *:*"),
        RelaySnapshot::new(MORIA1, "moria1moved", address("198.51.100.7"), consensus_time(6))
            .with_raw_exit_policy("reject *:*"),
    ]
    .into_iter()
    .collect();

    let report = run(
        &store,
        &StatusConfig::default(),
        ExitNodeQuery::new(SHARED_ADDRESS, "8.8.8.8", "443"),
    );

    assert!(report.is_router);
    assert_eq!(report.relays.len(), 1);
    assert_eq!(report.relays[0].nickname, "moria1moved");
    assert_eq!(report.relays[0].exit_possible, Some(false));
}
