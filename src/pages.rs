//! Page handlers of the status dashboard.
//!
//! [`StatusPages`] ties the store, the WHOIS client, the policy cache and the
//! configuration together and produces one data struct per page. Rendering
//! those structs is left to the caller.
//!
//! | Handler | Page |
//! |---------|------|
//! | [`index`](StatusPages::index) | Relay list of the latest consensus |
//! | [`details`](StatusPages::details) | One relay |
//! | [`whois`](StatusPages::whois) | WHOIS record of an address |
//! | [`exit_node_query`](StatusPages::exit_node_query) | Relay lookup by address |
//! | [`column_preferences`](StatusPages::column_preferences) | Column editor |
//!
//! # Example
//!
//! ```rust
//! use torstatus_rs::config::StatusConfig;
//! use torstatus_rs::pages::StatusPages;
//! use torstatus_rs::session::Session;
//! use torstatus_rs::store::{MemoryStore, RelaySnapshot};
//! use torstatus_rs::whois::SystemWhois;
//! use torstatus_rs::Params;
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let store: MemoryStore = ["zeta", "alpha"]
//!     .into_iter()
//!     .map(|name| RelaySnapshot::new("A".repeat(40), name, "192.0.2.1".parse().unwrap(), now))
//!     .collect();
//!
//! let pages = StatusPages::new(store, SystemWhois::default(), StatusConfig::default());
//! let mut session = Session::new();
//! let page = pages.index(&Params::new(), &mut session).unwrap();
//!
//! assert_eq!(page.num_routers, 2);
//! assert_eq!(page.relays[0].nickname, "alpha");
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::cache::{PolicyCache, PolicyKey};
use crate::config::StatusConfig;
use crate::exit_policy::ExitPolicy;
use crate::lookup::{self, ExitNodeQuery, NodeQueryReport};
use crate::preferences::{Column, ColumnAction};
use crate::query::QueryOptions;
use crate::session::Session;
use crate::store::{RelaySnapshot, StatusStore};
use crate::util::is_valid_fingerprint;
use crate::whois::{self, WhoisClient, WhoisReport};
use crate::{Error, Params};

/// Request parameter that clears the stored query options.
pub const PARAM_RESET_QUERY: &str = "resetQuery";
/// Request parameter that restores the default columns.
pub const PARAM_RESET_PREFERENCES: &str = "resetPreferences";

/// Data of the relay list.
#[derive(Debug, Clone)]
pub struct IndexPage {
    /// Relays of the latest consensus that pass the query, in display order.
    pub relays: Vec<RelaySnapshot>,
    /// Number of relays in the latest consensus.
    pub num_routers: usize,
    /// Number of relays that pass the query.
    pub in_query: usize,
    /// Columns to render.
    pub current_columns: Vec<Column>,
    /// Query that was applied, for refilling the form.
    pub query_options: QueryOptions,
}

/// Data of the relay details page.
#[derive(Debug, Clone)]
pub struct DetailsPage {
    /// Most recent status entry of the relay.
    pub relay: RelaySnapshot,
    /// Parsed exit policy, unless it is corrupt.
    pub exit_policy: Option<Arc<ExitPolicy>>,
    /// Why the exit policy could not be parsed.
    pub policy_error: Option<String>,
}

/// Data of the column preferences page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPreferencesPage {
    /// Shown columns, in order.
    pub current_columns: Vec<Column>,
    /// Columns that can be added.
    pub available_columns: Vec<Column>,
    /// Column the last action applied to, to keep it selected.
    pub selected: Option<Column>,
}

/// The page handlers of the dashboard.
#[derive(Debug)]
pub struct StatusPages<S, W> {
    store: S,
    whois: W,
    cache: PolicyCache,
    config: StatusConfig,
}

impl<S: StatusStore, W: WhoisClient> StatusPages<S, W> {
    /// Creates the handlers with a policy cache sized by `config`.
    pub fn new(store: S, whois: W, config: StatusConfig) -> Self {
        Self {
            store,
            whois,
            cache: PolicyCache::from_config(&config),
            config,
        }
    }

    /// Replaces the policy cache, e.g. with one shared between instances.
    pub fn with_cache(mut self, cache: PolicyCache) -> Self {
        self.cache = cache;
        self
    }

    /// The status store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The policy cache.
    pub fn cache(&self) -> &PolicyCache {
        &self.cache
    }

    /// The configuration.
    pub fn config(&self) -> &StatusConfig {
        &self.config
    }

    /// Builds the relay list.
    ///
    /// Relays of the latest consensus are listed by nickname. Non-empty
    /// `params` replace the query remembered in `session`, unless they carry
    /// `resetQuery`, which forgets it. Empty `params` reuse the remembered
    /// query.
    pub fn index(&self, params: &Params, session: &mut Session) -> Result<IndexPage, Error> {
        let mut relays = match self.store.latest_published()? {
            Some(latest) => self.store.consensus(latest)?,
            None => Vec::new(),
        };
        relays.sort_by(|a, b| a.nickname.cmp(&b.nickname));
        let num_routers = relays.len();

        let current_columns = session.columns_or_default().current().to_vec();

        if params.contains_key(PARAM_RESET_QUERY) {
            session.reset_query();
        } else if !params.is_empty() {
            session.query_options = Some(QueryOptions::from_params(params));
        }
        let query_options = session.query_options.clone().unwrap_or_default();

        let relays = query_options.apply(relays);
        let in_query = relays.len();
        debug!("relay list shows {} of {} relays", in_query, num_routers);

        Ok(IndexPage {
            relays,
            num_routers,
            in_query,
            current_columns,
            query_options,
        })
    }

    /// Builds the details page of `fingerprint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `fingerprint` isn't 40 hex
    /// characters, and [`Error::NotFound`] if the store has no entry for the
    /// relay.
    pub fn details(&self, fingerprint: &str) -> Result<DetailsPage, Error> {
        if !is_valid_fingerprint(fingerprint) {
            return Err(Error::invalid_input(
                fingerprint,
                "fingerprint must be 40 hex characters",
            ));
        }

        let relay = self
            .store
            .latest_snapshot(fingerprint, None)?
            .ok_or_else(|| Error::NotFound(format!("relay {}", fingerprint)))?;

        let key = PolicyKey::for_snapshot(&relay);
        let (exit_policy, policy_error) =
            match self.cache.get_or_parse(&key, &relay.raw_exit_policy) {
                Ok(policy) => (Some(policy), None),
                Err(e) => (None, Some(e.to_string())),
            };

        Ok(DetailsPage {
            relay,
            exit_policy,
            policy_error,
        })
    }

    /// Looks up the WHOIS record of `address`.
    pub async fn whois(&self, address: &str) -> Result<WhoisReport, Error> {
        whois::lookup(&self.whois, address).await
    }

    /// Runs the relay lookup with `queryAddress`, `destinationAddress` and
    /// `destinationPort` from `params`.
    pub fn exit_node_query(&self, params: &Params) -> Result<NodeQueryReport, Error> {
        let query = ExitNodeQuery::from_params(params);
        lookup::lookup(&self.store, &self.cache, &self.config, &query)
    }

    /// Applies the column change requested in `params` to `session`.
    pub fn column_preferences(
        &self,
        params: &Params,
        session: &mut Session,
    ) -> ColumnPreferencesPage {
        if params.contains_key(PARAM_RESET_PREFERENCES) {
            session.reset_columns();
        }

        let columns = session.columns_or_default();
        let selected = ColumnAction::from_params(params).and_then(|action| columns.apply(action));

        ColumnPreferencesPage {
            current_columns: columns.current().to_vec(),
            available_columns: columns.available().to_vec(),
            selected,
        }
    }
}
