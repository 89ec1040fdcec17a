//! Integration tests for the page handlers.

use std::net::Ipv4Addr;

use async_trait::async_trait;
use torstatus_rs::config::StatusConfig;
use torstatus_rs::pages::StatusPages;
use torstatus_rs::preferences::Column;
use torstatus_rs::session::Session;
use torstatus_rs::store::MemoryStore;
use torstatus_rs::whois::{WhoisClient, UNPARSABLE_ADDRESS};
use torstatus_rs::{Error, Params};

use crate::{create_test_store, CAERSIDI, MORIA1, SHARED_ADDRESS, TOR26};

struct StaticWhois;

#[async_trait]
impl WhoisClient for StaticWhois {
    async fn query(&self, address: Ipv4Addr) -> Result<String, Error> {
        Ok(format!("inetnum: {}\nnetname: TEST-NET", address))
    }
}

fn create_pages() -> StatusPages<MemoryStore, StaticWhois> {
    StatusPages::new(create_test_store(), StaticWhois, StatusConfig::default())
}

fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_index_shows_latest_consensus() {
    let pages = create_pages();
    let page = pages.index(&Params::new(), &mut Session::new()).unwrap();

    assert_eq!(page.num_routers, 2);
    let names: Vec<_> = page.relays.iter().map(|r| r.nickname.as_str()).collect();
    assert_eq!(names, vec!["moria1", "tor26"]);
}

#[test]
fn test_index_search_and_sort() {
    let pages = create_pages();
    let mut session = Session::new();
    let page = pages
        .index(
            &params(&[
                ("isrunning", "yes"),
                ("searchValue", "o"),
                ("criteria", "nickname"),
                ("boolLogic", "contains"),
                ("sortListings", "isexit"),
                ("sortOrder", "descending"),
            ]),
            &mut session,
        )
        .unwrap();

    assert_eq!(page.in_query, 2);
    assert_eq!(page.relays[0].fingerprint, TOR26);
    assert!(session.query_options.is_some());
}

#[test]
fn test_details_page() {
    let pages = create_pages();

    let page = pages.details(MORIA1).unwrap();
    assert_eq!(page.relay.address.to_string(), SHARED_ADDRESS);
    assert_eq!(page.exit_policy.unwrap().len(), 3);

    let page = pages.details(TOR26).unwrap();
    assert!(page.policy_error.unwrap().contains("accept weird"));

    let page = pages.details(CAERSIDI).unwrap();
    assert!(!page.exit_policy.unwrap().can_exit_to("8.8.8.8".parse().unwrap(), 80));
}

#[test]
fn test_details_unknown_relay() {
    let pages = create_pages();
    assert!(matches!(
        pages.details("0000000000000000000000000000000000000000"),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_exit_node_query_page() {
    let pages = create_pages();
    let report = pages
        .exit_node_query(&params(&[
            ("queryAddress", SHARED_ADDRESS),
            ("destinationAddress", "8.8.8.8"),
            ("destinationPort", "25"),
        ]))
        .unwrap();

    assert!(report.is_router);
    assert_eq!(report.relays.len(), 2);
    assert_eq!(report.relays[0].exit_possible, Some(false));
}

#[test]
fn test_column_preferences_persist_in_session() {
    let pages = create_pages();
    let mut session = Session::new();

    pages.column_preferences(
        &params(&[("addColumn", ""), ("selected_addColumn", "Fingerprint")]),
        &mut session,
    );
    let page = pages.index(&Params::new(), &mut session).unwrap();
    assert_eq!(page.current_columns.last(), Some(&Column::Fingerprint));

    let page = pages.column_preferences(
        &params(&[("downButton", ""), ("selected_removeColumn", "Country Code")]),
        &mut session,
    );
    assert_eq!(page.selected, Some(Column::CountryCode));
    assert_eq!(page.current_columns[1], Column::CountryCode);
}

#[tokio::test]
async fn test_whois_page() {
    let pages = create_pages();

    let report = pages.whois(SHARED_ADDRESS).await.unwrap();
    assert!(report.whois.contains("TEST-NET"));

    let report = pages.whois("128.31.0.34 && id").await.unwrap();
    assert_eq!(report.whois, UNPARSABLE_ADDRESS);
}
