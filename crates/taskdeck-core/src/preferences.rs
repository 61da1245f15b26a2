use std::fmt;

use crate::view::{SortKey, ViewSelector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "list" {
            Self::List
        } else {
            Self::Grid
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::List => "list",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar UI preferences. Stored as plain strings, one key each.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preferences {
    pub view_mode: ViewMode,
    pub current_sort: SortKey,
    pub current_view: ViewSelector,
    pub dark_mode: bool,
}

pub const VIEW_MODE_KEY: &str = "viewMode";
pub const CURRENT_SORT_KEY: &str = "currentSort";
pub const CURRENT_VIEW_KEY: &str = "currentView";
pub const DARK_MODE_KEY: &str = "darkMode";
