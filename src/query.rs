//! Filtering and sorting of the relay list.
//!
//! The index page form submits its settings as plain request parameters:
//!
//! | Parameter | Values |
//! |-----------|--------|
//! | `isauthority` ... `isv2dir` | `yes`, `no`, empty |
//! | `searchValue` | free text, empty disables the search |
//! | `criteria` | `nickname`, `fingerprint`, `geoip`, `bandwidth`, `uptime`, `published`, `hostname`, `address`, `orport`, `dirport`, `platform`, `contact` |
//! | `boolLogic` | `equals`, `contains`, `less`, `greater` |
//! | `sortListings` | any search criterion or flag parameter |
//! | `sortOrder` | `ascending`, `descending` |
//!
//! Unknown parameters and values are ignored.
//!
//! # Example
//!
//! ```rust
//! use torstatus_rs::query::QueryOptions;
//! use torstatus_rs::store::RelaySnapshot;
//! use torstatus_rs::{Flag, Params};
//! use chrono::Utc;
//!
//! let mut params = Params::new();
//! params.insert("isexit".into(), "yes".into());
//! params.insert("sortListings".into(), "nickname".into());
//! params.insert("sortOrder".into(), "descending".into());
//!
//! let relay = |name: &str, flags: Vec<Flag>| {
//!     RelaySnapshot::new("A".repeat(40), name, "192.0.2.1".parse().unwrap(), Utc::now())
//!         .with_flags(flags)
//! };
//! let relays = vec![
//!     relay("alpha", vec![Flag::Exit]),
//!     relay("beta", vec![Flag::Guard]),
//!     relay("gamma", vec![Flag::Exit]),
//! ];
//!
//! let shown = QueryOptions::from_params(&params).apply(relays);
//! let names: Vec<_> = shown.iter().map(|r| r.nickname.as_str()).collect();
//! assert_eq!(names, vec!["gamma", "alpha"]);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv4Addr;

use crate::store::RelaySnapshot;
use crate::{Flag, Params};

/// Flags the relay list can be filtered by.
///
/// Hibernation is only known from descriptors, so it can be sorted by but not
/// filtered on.
pub const FILTER_FLAGS: [Flag; 11] = [
    Flag::Authority,
    Flag::BadDirectory,
    Flag::BadExit,
    Flag::Exit,
    Flag::Fast,
    Flag::Guard,
    Flag::Named,
    Flag::Stable,
    Flag::Running,
    Flag::Valid,
    Flag::V2Dir,
];

/// Relay attributes that can be searched and sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    /// Relay nickname.
    Nickname,
    /// Relay fingerprint.
    Fingerprint,
    /// Country code of the relay address.
    Geoip,
    /// Observed bandwidth.
    Bandwidth,
    /// Uptime in seconds.
    Uptime,
    /// Timestamp of the status entry.
    Published,
    /// Reverse DNS name.
    Hostname,
    /// IPv4 address.
    Address,
    /// OR port.
    OrPort,
    /// Directory port.
    DirPort,
    /// Platform string.
    Platform,
    /// Contact line.
    Contact,
}

impl SearchField {
    /// Every field, in form order.
    pub const ALL: [SearchField; 12] = [
        SearchField::Nickname,
        SearchField::Fingerprint,
        SearchField::Geoip,
        SearchField::Bandwidth,
        SearchField::Uptime,
        SearchField::Published,
        SearchField::Hostname,
        SearchField::Address,
        SearchField::OrPort,
        SearchField::DirPort,
        SearchField::Platform,
        SearchField::Contact,
    ];

    /// The form value naming this field.
    pub fn key(&self) -> &'static str {
        match self {
            SearchField::Nickname => "nickname",
            SearchField::Fingerprint => "fingerprint",
            SearchField::Geoip => "geoip",
            SearchField::Bandwidth => "bandwidth",
            SearchField::Uptime => "uptime",
            SearchField::Published => "published",
            SearchField::Hostname => "hostname",
            SearchField::Address => "address",
            SearchField::OrPort => "orport",
            SearchField::DirPort => "dirport",
            SearchField::Platform => "platform",
            SearchField::Contact => "contact",
        }
    }

    /// Looks a field up by its form value.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    fn value_of(&self, relay: &RelaySnapshot) -> Option<FieldValue> {
        match self {
            SearchField::Nickname => Some(FieldValue::Text(relay.nickname.clone())),
            SearchField::Fingerprint => Some(FieldValue::Text(relay.fingerprint.clone())),
            SearchField::Geoip => relay.country_code.clone().map(FieldValue::Text),
            SearchField::Bandwidth => relay.bandwidth.map(FieldValue::Number),
            SearchField::Uptime => relay.uptime.map(FieldValue::Number),
            SearchField::Published => Some(FieldValue::Text(
                relay.published.format("%Y-%m-%d %H:%M:%S").to_string(),
            )),
            SearchField::Hostname => relay.hostname.clone().map(FieldValue::Text),
            SearchField::Address => Some(FieldValue::Address(relay.address)),
            SearchField::OrPort => Some(FieldValue::Number(u64::from(relay.or_port))),
            SearchField::DirPort => relay.dir_port.map(|p| FieldValue::Number(u64::from(p))),
            SearchField::Platform => relay.platform.clone().map(FieldValue::Text),
            SearchField::Contact => relay.contact.clone().map(FieldValue::Text),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// How a search value is compared with a relay attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoolLogic {
    /// Attribute equals the value.
    #[default]
    Equals,
    /// Attribute contains the value as a substring.
    Contains,
    /// Attribute is less than the value.
    Less,
    /// Attribute is greater than the value.
    Greater,
}

impl BoolLogic {
    /// Looks a comparison up by its form value.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "equals" => Some(BoolLogic::Equals),
            "contains" => Some(BoolLogic::Contains),
            "less" => Some(BoolLogic::Less),
            "greater" => Some(BoolLogic::Greater),
            _ => None,
        }
    }
}

/// A relay attribute the list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// One of the searchable attributes.
    Field(SearchField),
    /// Presence of a flag.
    Flag(Flag),
}

impl SortField {
    /// Looks a sort key up by its form value.
    pub fn from_key(key: &str) -> Option<Self> {
        SearchField::from_key(key)
            .map(SortField::Field)
            .or_else(|| Flag::from_query_key(key).map(SortField::Flag))
    }

    fn value_of(&self, relay: &RelaySnapshot) -> Option<FieldValue> {
        match self {
            SortField::Field(field) => field.value_of(relay),
            SortField::Flag(flag) => Some(FieldValue::Number(u64::from(relay.has_flag(*flag)))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortOrder {
    /// Looks a direction up by its form value.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ascending" => Some(SortOrder::Ascending),
            "descending" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// A search over one relay attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    /// Text to compare with.
    pub value: String,
    /// Attribute to compare.
    pub field: SearchField,
    /// Comparison to apply.
    pub logic: BoolLogic,
}

impl Search {
    /// Checks if `relay` satisfies the search.
    ///
    /// Relays missing the attribute never match. On numeric attributes a
    /// value that isn't a number matches nothing, except for `contains`,
    /// which works on the displayed text.
    pub fn matches(&self, relay: &RelaySnapshot) -> bool {
        let Some(attribute) = self.field.value_of(relay) else {
            return false;
        };

        if self.logic == BoolLogic::Contains {
            return attribute.to_string().contains(&self.value);
        }

        let ordering = match &attribute {
            FieldValue::Text(text) => Some(text.as_str().cmp(self.value.as_str())),
            FieldValue::Number(n) => self.value.parse::<u64>().ok().map(|v| n.cmp(&v)),
            FieldValue::Address(addr) => self
                .value
                .parse::<Ipv4Addr>()
                .ok()
                .map(|v| addr.cmp(&v)),
        };

        matches!(
            (self.logic, ordering),
            (BoolLogic::Equals, Some(Ordering::Equal))
                | (BoolLogic::Less, Some(Ordering::Less))
                | (BoolLogic::Greater, Some(Ordering::Greater))
        )
    }
}

/// Filtering and sorting settings of the relay list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Required presence (`true`) or absence (`false`) of flags.
    pub flag_filters: Vec<(Flag, bool)>,
    /// Attribute search, if any.
    pub search: Option<Search>,
    /// Sort key and direction, if any.
    pub sort: Option<(SortField, SortOrder)>,
}

impl QueryOptions {
    /// Reads the settings from request parameters, ignoring anything unknown.
    pub fn from_params(params: &Params) -> Self {
        let get = |key: &str| params.get(key).map(String::as_str).unwrap_or("");

        let flag_filters = FILTER_FLAGS
            .into_iter()
            .filter_map(|flag| match get(flag.query_key()) {
                "yes" => Some((flag, true)),
                "no" => Some((flag, false)),
                _ => None,
            })
            .collect();

        let search = match (get("searchValue"), SearchField::from_key(get("criteria"))) {
            ("", _) | (_, None) => None,
            (value, Some(field)) => Some(Search {
                value: value.to_string(),
                field,
                logic: BoolLogic::from_key(get("boolLogic")).unwrap_or_default(),
            }),
        };

        let sort = SortField::from_key(get("sortListings"))
            .zip(SortOrder::from_key(get("sortOrder")));

        Self {
            flag_filters,
            search,
            sort,
        }
    }

    /// Returns `true` if the options change nothing.
    pub fn is_empty(&self) -> bool {
        self.flag_filters.is_empty() && self.search.is_none() && self.sort.is_none()
    }

    /// Checks if `relay` passes the flag filters and the search.
    pub fn matches(&self, relay: &RelaySnapshot) -> bool {
        self.flag_filters
            .iter()
            .all(|(flag, wanted)| relay.has_flag(*flag) == *wanted)
            && self.search.as_ref().map_or(true, |s| s.matches(relay))
    }

    /// Filters `relays`, then sorts them. Equal keys keep their order.
    pub fn apply(&self, relays: Vec<RelaySnapshot>) -> Vec<RelaySnapshot> {
        let mut relays: Vec<RelaySnapshot> =
            relays.into_iter().filter(|r| self.matches(r)).collect();

        if let Some((field, order)) = self.sort {
            relays.sort_by(|a, b| {
                let ordering = field.value_of(a).cmp(&field.value_of(b));
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }

        relays
    }
}

// Every field yields a single variant, so the derived ordering only ever
// compares like with like.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum FieldValue {
    Text(String),
    Number(u64),
    Address(Ipv4Addr),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => write!(f, "{}", text),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Address(addr) => write!(f, "{}", addr),
        }
    }
}
