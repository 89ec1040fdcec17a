//! Per-visitor state kept between requests.
//!
//! Persisting a [`Session`] is the HTTP layer's job; the page handlers only
//! read and update it.

use crate::preferences::ColumnPreferences;
use crate::query::QueryOptions;

/// State remembered for one visitor.
///
/// Both fields start out unset. Column preferences are filled in with the
/// defaults the first time a page needs them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Column layout of the relay list.
    pub columns: Option<ColumnPreferences>,
    /// Last filter and sort settings of the relay list.
    pub query_options: Option<QueryOptions>,
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the column preferences, storing the defaults on first use.
    pub fn columns_or_default(&mut self) -> &mut ColumnPreferences {
        self.columns.get_or_insert_with(ColumnPreferences::default)
    }

    /// Forgets the column preferences.
    pub fn reset_columns(&mut self) {
        self.columns = None;
    }

    /// Forgets the filter and sort settings.
    pub fn reset_query(&mut self) {
        self.query_options = None;
    }
}
