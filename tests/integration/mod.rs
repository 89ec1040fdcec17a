//! Integration tests for torstatus-rs against an in-memory status store.

mod exit_policy_tests;
mod lookup_tests;
mod pages_tests;

use std::net::Ipv4Addr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use torstatus_rs::store::{MemoryStore, RelaySnapshot};
use torstatus_rs::Flag;

pub const MORIA1: &str = "9695DFC35FFEB861329B9F1AB04C46397020CE31";
pub const TOR26: &str = "847B1F850344D7876491A54892F904934E4EB85D";
pub const CAERSIDI: &str = "A7569A83B5706AB1B1A9CB52EFF7D2D32E4553EB";

pub const SHARED_ADDRESS: &str = "128.31.0.34";

/// Valid-after time of the consensus `hours` after the first one.
pub fn consensus_time(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
}

pub fn address(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

/// A store with two consensuses, 12 hours apart.
///
/// moria1 and tor26 share an address; caerSidi lives elsewhere and only
/// appears in the older consensus. tor26 carries a corrupt exit policy.
pub fn create_test_store() -> MemoryStore {
    let shared = address(SHARED_ADDRESS);
    let mut store = MemoryStore::new();

    for hours in [0, 12] {
        let published = consensus_time(hours);
        store.insert(
            RelaySnapshot::new(MORIA1, "moria1", shared, published)
                .with_flags([Flag::Authority, Flag::Running, Flag::Valid])
                .with_raw_exit_policy("reject *:25\nreject 10.0.0.0/8:*\naccept *:*"),
        );
        store.insert(
            RelaySnapshot::new(TOR26, "tor26", shared, published)
                .with_flags([Flag::Exit, Flag::Fast, Flag::Running])
                .with_raw_exit_policy("accept *:80\naccept weird"),
        );
    }

    store.insert(
        RelaySnapshot::new(CAERSIDI, "caerSidi", address("71.35.133.197"), consensus_time(0))
            .with_flags([Flag::Exit, Flag::Guard])
            .with_raw_descriptor(
                "router caerSidi 71.35.133.197 9001 0 0\nreject *:*\nrouter-signature\n",
            ),
    );

    store
}
