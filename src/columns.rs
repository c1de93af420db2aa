//! Table columns and the filter toolbar
//!
//! Free-text search runs against one column at a time. Time columns hold
//! dates that cannot be matched textually, so they are never offered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::query::QueryState;
use crate::selection::RenderNode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub is_time: bool,
}

impl Column {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            is_time: false,
        }
    }

    pub fn time(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            is_time: true,
            ..Self::new(key, title)
        }
    }

    pub fn is_searchable(&self) -> bool {
        !self.is_time
    }
}

/// Columns that may carry a text search, in display order.
pub fn searchable_columns(columns: &[Column]) -> impl Iterator<Item = &Column> {
    columns.iter().filter(|c| c.is_searchable())
}

/// The column searched when the user has not picked one: the first
/// searchable column.
pub fn default_search_column(columns: &[Column]) -> Option<&Column> {
    searchable_columns(columns).next()
}

/// Field searched by the data source for a text search on `column`.
pub fn search_key<'a>(column: &'a str, aliases: &'a BTreeMap<String, String>) -> &'a str {
    aliases.get(column).map_or(column, String::as_str)
}

/// Toolbar state derived from the current view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolbarViewModel {
    pub show_text_search: bool,
    pub show_filter_menu: bool,
    pub search_column: Option<String>,
    pub placeholder: Option<String>,
}

/// Decide what the toolbar shows.
///
/// Text search stays visible while a narrowing is active even if it left
/// no results, so the user can always undo it.
pub fn compute_toolbar(
    columns: &[Column],
    filters: &[RenderNode],
    query: &QueryState,
    total_items: u64,
) -> ToolbarViewModel {
    let column = query
        .text_search()
        .and_then(|search| {
            searchable_columns(columns).find(|c| c.key == search.column)
        })
        .or_else(|| default_search_column(columns));

    let show_text_search = column.is_some() && (total_items > 0 || query.is_narrowed());

    ToolbarViewModel {
        show_text_search,
        show_filter_menu: !filters.is_empty(),
        search_column: column.map(|c| c.key.clone()),
        placeholder: column.map(|c| format!("Find by {}", c.title)),
    }
}
