//! Column preferences of the relay list.
//!
//! Every visitor has two ordered lists of [`Column`]s: the columns shown on
//! the index page and the columns that could be added. The preferences page
//! moves columns between the lists and reorders the shown ones.
//!
//! Flag columns and the platform/hibernation icons render as a fixed block at
//! the end of the table, so they can be removed and re-added but not moved
//! up or down.
//!
//! # Example
//!
//! ```rust
//! use torstatus_rs::preferences::{Column, ColumnAction, ColumnPreferences};
//!
//! let mut prefs = ColumnPreferences::default();
//! assert_eq!(prefs.apply(ColumnAction::Up(Column::Bandwidth)), Some(Column::Bandwidth));
//! assert_eq!(prefs.current()[1], Column::Bandwidth);
//!
//! assert_eq!(prefs.apply(ColumnAction::Up(Column::Exit)), None);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::{Error, Params};

/// A column of the relay list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    CountryCode,
    RouterName,
    Bandwidth,
    Uptime,
    Ip,
    Hostname,
    Icons,
    OrPort,
    DirPort,
    BadExit,
    Named,
    Exit,
    Authority,
    Fast,
    Guard,
    Stable,
    Running,
    Valid,
    V2Dir,
    Platform,
    Hibernating,
    Fingerprint,
    LastDescriptorPublished,
    Contact,
    BadDir,
}

impl Column {
    /// Columns shown to a new visitor, in order.
    pub const DEFAULT_CURRENT: [Column; 21] = [
        Column::CountryCode,
        Column::RouterName,
        Column::Bandwidth,
        Column::Uptime,
        Column::Ip,
        Column::Hostname,
        Column::Icons,
        Column::OrPort,
        Column::DirPort,
        Column::BadExit,
        Column::Named,
        Column::Exit,
        Column::Authority,
        Column::Fast,
        Column::Guard,
        Column::Stable,
        Column::Running,
        Column::Valid,
        Column::V2Dir,
        Column::Platform,
        Column::Hibernating,
    ];

    /// Columns a new visitor can add, in order.
    pub const DEFAULT_AVAILABLE: [Column; 4] = [
        Column::Fingerprint,
        Column::LastDescriptorPublished,
        Column::Contact,
        Column::BadDir,
    ];

    /// Columns that keep their position.
    pub const NOT_MOVABLE: [Column; 11] = [
        Column::Named,
        Column::Exit,
        Column::Authority,
        Column::Fast,
        Column::Guard,
        Column::Stable,
        Column::Running,
        Column::Valid,
        Column::V2Dir,
        Column::Platform,
        Column::Hibernating,
    ];

    /// Heading shown on the page, also used as the form value.
    pub fn name(&self) -> &'static str {
        match self {
            Column::CountryCode => "Country Code",
            Column::RouterName => "Router Name",
            Column::Bandwidth => "Bandwidth",
            Column::Uptime => "Uptime",
            Column::Ip => "IP",
            Column::Hostname => "Hostname",
            Column::Icons => "Icons",
            Column::OrPort => "ORPort",
            Column::DirPort => "DirPort",
            Column::BadExit => "BadExit",
            Column::Named => "Named",
            Column::Exit => "Exit",
            Column::Authority => "Authority",
            Column::Fast => "Fast",
            Column::Guard => "Guard",
            Column::Stable => "Stable",
            Column::Running => "Running",
            Column::Valid => "Valid",
            Column::V2Dir => "V2Dir",
            Column::Platform => "Platform",
            Column::Hibernating => "Hibernating",
            Column::Fingerprint => "Fingerprint",
            Column::LastDescriptorPublished => "LastDescriptorPublished",
            Column::Contact => "Contact",
            Column::BadDir => "BadDir",
        }
    }

    /// Returns `true` unless the column is pinned in place.
    pub fn is_movable(&self) -> bool {
        !Self::NOT_MOVABLE.contains(self)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Column {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::DEFAULT_CURRENT
            .into_iter()
            .chain(Self::DEFAULT_AVAILABLE)
            .find(|column| column.name() == s)
            .ok_or_else(|| Error::invalid_input(s, "unknown column"))
    }
}

/// A change requested on the preferences page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAction {
    /// Hide a shown column.
    Remove(Column),
    /// Show a hidden column.
    Add(Column),
    /// Move a shown column one place to the left.
    Up(Column),
    /// Move a shown column one place to the right.
    Down(Column),
}

impl ColumnAction {
    /// Reads the requested action from the preferences form.
    ///
    /// The button parameter (`removeColumn`, `addColumn`, `upButton`,
    /// `downButton`) names the action and `selected_removeColumn` or
    /// `selected_addColumn` names the column. Requests without both, or with
    /// an unknown column, yield `None`.
    pub fn from_params(params: &Params) -> Option<Self> {
        let selected = |key: &str| params.get(key).and_then(|name| name.parse::<Column>().ok());

        if params.contains_key("removeColumn") {
            selected("selected_removeColumn").map(ColumnAction::Remove)
        } else if params.contains_key("addColumn") {
            selected("selected_addColumn").map(ColumnAction::Add)
        } else if params.contains_key("upButton") {
            selected("selected_removeColumn").map(ColumnAction::Up)
        } else if params.contains_key("downButton") {
            selected("selected_removeColumn").map(ColumnAction::Down)
        } else {
            None
        }
    }
}

/// The shown and available columns of one visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPreferences {
    current: Vec<Column>,
    available: Vec<Column>,
}

impl Default for ColumnPreferences {
    fn default() -> Self {
        Self {
            current: Column::DEFAULT_CURRENT.to_vec(),
            available: Column::DEFAULT_AVAILABLE.to_vec(),
        }
    }
}

impl ColumnPreferences {
    /// Shown columns, in display order.
    pub fn current(&self) -> &[Column] {
        &self.current
    }

    /// Columns that can be added.
    pub fn available(&self) -> &[Column] {
        &self.available
    }

    /// Applies `action` and returns the affected column if anything changed.
    ///
    /// Acting on a column that isn't in the list the action expects, moving a
    /// pinned column, or moving past either end does nothing.
    pub fn apply(&mut self, action: ColumnAction) -> Option<Column> {
        match action {
            ColumnAction::Remove(column) => {
                let i = position(&self.current, column)?;
                self.available.push(self.current.remove(i));
                Some(column)
            }
            ColumnAction::Add(column) => {
                let i = position(&self.available, column)?;
                self.current.push(self.available.remove(i));
                Some(column)
            }
            ColumnAction::Up(column) if column.is_movable() => {
                let i = position(&self.current, column)?;
                if i == 0 {
                    return None;
                }
                self.current.swap(i, i - 1);
                Some(column)
            }
            ColumnAction::Down(column) if column.is_movable() => {
                let i = position(&self.current, column)?;
                if i + 1 >= self.current.len() {
                    return None;
                }
                self.current.swap(i, i + 1);
                Some(column)
            }
            ColumnAction::Up(_) | ColumnAction::Down(_) => None,
        }
    }
}

fn position(columns: &[Column], column: Column) -> Option<usize> {
    columns.iter().position(|c| *c == column)
}
