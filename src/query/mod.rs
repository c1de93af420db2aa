//! Query state and its transitions
//!
//! `QueryState` is the single descriptor of what the view currently wants
//! fetched. Every change goes through a pure transition that consults the
//! reset table in [`transition`], so page-reset behavior is decided in one
//! place for every query axis.

pub mod transition;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};
use crate::selection::{ActiveFilters, FilterIntent};

pub use transition::{QueryField, ResetPolicy, changed_fields};

/// Flag key for the built-in "show all" structural flag
pub const SHOW_ALL: &str = "show_all";

/// Number of items per page
///
/// The selectable sizes are fixed; `Unbounded` is only produced for
/// downloads and cannot be selected through [`apply_page_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PageSize {
    Ten,
    #[default]
    Twenty,
    Fifty,
    Hundred,
    Unbounded,
}

impl PageSize {
    /// Sizes a user can pick, in display order
    pub const OPTIONS: [PageSize; 4] = [
        PageSize::Ten,
        PageSize::Twenty,
        PageSize::Fifty,
        PageSize::Hundred,
    ];

    /// Item limit, or `None` when unbounded.
    pub fn limit(self) -> Option<u32> {
        match self {
            PageSize::Ten => Some(10),
            PageSize::Twenty => Some(20),
            PageSize::Fifty => Some(50),
            PageSize::Hundred => Some(100),
            PageSize::Unbounded => None,
        }
    }

    pub fn is_selectable(self) -> bool {
        self != PageSize::Unbounded
    }
}

impl TryFrom<u32> for PageSize {
    type Error = SiftError;

    fn try_from(n: u32) -> Result<Self> {
        PageSize::OPTIONS
            .into_iter()
            .find(|size| size.limit() == Some(n))
            .ok_or_else(|| SiftError::InvalidPageSize(n.to_string()))
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> u32 {
        size.limit().unwrap_or(u32::MAX)
    }
}

impl FromStr for PageSize {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        let n: u32 = s
            .trim()
            .parse()
            .map_err(|_| SiftError::InvalidPageSize(s.to_string()))?;
        PageSize::try_from(n)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit() {
            Some(n) => write!(f, "{n}"),
            None => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(SiftError::InvalidSort(s.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

impl FromStr for Sort {
    type Err = SiftError;

    /// Parse `column` or `column:asc|desc`
    fn from_str(s: &str) -> Result<Self> {
        let (column, direction) = match s.split_once(':') {
            Some((column, direction)) => (column, direction.parse()?),
            None => (s, SortDirection::Asc),
        };
        if column.trim().is_empty() {
            return Err(SiftError::InvalidSort(s.to_string()));
        }
        Ok(Sort::new(column.trim(), direction))
    }
}

/// The single active free-text search
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSearch {
    pub column: String,
    pub value: String,
}

/// Composite descriptor of the currently requested result view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryState {
    filters: ActiveFilters,
    text_search: Option<TextSearch>,
    sort: Option<Sort>,
    page: u32,
    page_size: PageSize,
    show_all: bool,
    extra_flags: BTreeMap<String, bool>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(PageSize::default())
    }
}

impl QueryState {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            filters: ActiveFilters::new(),
            text_search: None,
            sort: None,
            page: 1,
            page_size,
            show_all: false,
            extra_flags: BTreeMap::new(),
        }
    }

    pub fn with_sort(mut self, sort: Option<Sort>) -> Self {
        self.sort = sort;
        self
    }

    /// Declare an extra structural flag so it can be changed later.
    pub fn with_flag(mut self, key: impl Into<String>, value: bool) -> Self {
        let key = key.into();
        if key == SHOW_ALL {
            self.show_all = value;
        } else {
            self.extra_flags.insert(key, value);
        }
        self
    }

    pub fn filters(&self) -> &ActiveFilters {
        &self.filters
    }

    pub fn text_search(&self) -> Option<&TextSearch> {
        self.text_search.as_ref()
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        if key == SHOW_ALL {
            Some(self.show_all)
        } else {
            self.extra_flags.get(key).copied()
        }
    }

    pub fn extra_flags(&self) -> &BTreeMap<String, bool> {
        &self.extra_flags
    }

    /// Zero-based offset of the first item on the current page.
    pub fn offset(&self) -> usize {
        match self.page_size.limit() {
            Some(limit) => (self.page as usize - 1) * limit as usize,
            None => 0,
        }
    }

    /// Whether any narrowing (filter or text search) is in effect.
    pub fn is_narrowed(&self) -> bool {
        self.filters.any_selected() || self.text_search.is_some()
    }

    /// The query used for downloads: first page, no size limit.
    ///
    /// This is a detached copy; the visible state keeps its page and size.
    pub fn for_export(&self) -> QueryState {
        QueryState {
            page: 1,
            page_size: PageSize::Unbounded,
            ..self.clone()
        }
    }
}

/// All transitions a view can request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryAction {
    Filters(Vec<FilterIntent>),
    TextSearch { column: String, text: String },
    Sort { column: String, direction: SortDirection },
    Page(u32),
    PageSize(PageSize),
    Flag { key: String, value: bool },
}

/// Apply an action to the state (reducer pattern).
pub fn reduce_query_state(state: QueryState, action: QueryAction) -> Result<QueryState> {
    match action {
        QueryAction::Filters(intents) => Ok(apply_filter_intents(state, &intents)),
        QueryAction::TextSearch { column, text } => Ok(apply_text_search(state, column, text)),
        QueryAction::Sort { column, direction } => Ok(apply_sort(state, column, direction)),
        QueryAction::Page(page) => apply_page(state, page),
        QueryAction::PageSize(size) => apply_page_size(state, size),
        QueryAction::Flag { key, value } => apply_structural_flag(state, &key, value),
    }
}

/// Upsert each intent into the active filters. Always returns to page 1.
pub fn apply_filter_intents(state: QueryState, intents: &[FilterIntent]) -> QueryState {
    transition::transition(state, QueryField::Filters, |s| {
        for intent in intents {
            s.filters.upsert(intent);
        }
    })
}

/// Replace the text search; empty text clears it. Returns to page 1.
pub fn apply_text_search(
    state: QueryState,
    column: impl Into<String>,
    text: impl Into<String>,
) -> QueryState {
    let column = column.into();
    let text = text.into();
    transition::transition(state, QueryField::TextSearch, |s| {
        s.text_search = if text.is_empty() {
            None
        } else {
            Some(TextSearch {
                column,
                value: text,
            })
        };
    })
}

/// Change the sort order; the current page is kept.
pub fn apply_sort(
    state: QueryState,
    column: impl Into<String>,
    direction: SortDirection,
) -> QueryState {
    let sort = Sort::new(column, direction);
    transition::transition(state, QueryField::Sort, |s| s.sort = Some(sort))
}

pub fn apply_page(state: QueryState, page: u32) -> Result<QueryState> {
    if page == 0 {
        return Err(SiftError::InvalidPage(page));
    }
    Ok(transition::transition(state, QueryField::Page, |s| {
        s.page = page
    }))
}

/// Change the page size. Always returns to page 1.
pub fn apply_page_size(state: QueryState, page_size: PageSize) -> Result<QueryState> {
    if !page_size.is_selectable() {
        return Err(SiftError::InvalidPageSize(page_size.to_string()));
    }
    Ok(transition::transition(state, QueryField::PageSize, |s| {
        s.page_size = page_size
    }))
}

/// Set `show_all` or a declared extra flag. Returns to page 1 only when the
/// value actually changes.
pub fn apply_structural_flag(state: QueryState, key: &str, value: bool) -> Result<QueryState> {
    if key == SHOW_ALL {
        return Ok(transition::transition(state, QueryField::ShowAll, |s| {
            s.show_all = value
        }));
    }
    if !state.extra_flags.contains_key(key) {
        return Err(SiftError::UnknownFlag(key.to_string()));
    }
    Ok(transition::transition(state, QueryField::ExtraFlags, |s| {
        s.extra_flags.insert(key.to_string(), value);
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_page(page: u32, page_size: PageSize) -> QueryState {
        apply_page(QueryState::new(page_size), page).unwrap()
    }

    #[test]
    fn test_page_size_change_resets_page() {
        let state = on_page(3, PageSize::Twenty);
        let next = apply_page_size(state, PageSize::Fifty).unwrap();
        assert_eq!(next.page(), 1);
        assert_eq!(next.page_size(), PageSize::Fifty);
    }

    #[test]
    fn test_same_page_size_still_resets_page() {
        let state = on_page(3, PageSize::Twenty);
        let next = apply_page_size(state, PageSize::Twenty).unwrap();
        assert_eq!(next.page(), 1);
    }

    #[test]
    fn test_unbounded_page_size_rejected() {
        let state = QueryState::default();
        assert!(matches!(
            apply_page_size(state, PageSize::Unbounded),
            Err(SiftError::InvalidPageSize(_))
        ));
    }

    #[test]
    fn test_filter_intents_reset_page() {
        let state = on_page(4, PageSize::Ten);
        let next = apply_filter_intents(state, &[FilterIntent::select("rhel8")]);
        assert_eq!(next.page(), 1);
        assert!(next.filters().is_selected("rhel8"));
    }

    #[test]
    fn test_filter_intents_upsert_by_value() {
        let state = QueryState::default();
        let state = apply_filter_intents(state, &[FilterIntent::select("a")]);
        let state = apply_filter_intents(
            state,
            &[FilterIntent::deselect("a"), FilterIntent::select("b")],
        );
        assert!(!state.filters().is_selected("a"));
        assert!(state.filters().is_selected("b"));
        assert_eq!(state.filters().selected_values().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_text_search_replaces_previous() {
        let state = apply_text_search(QueryState::default(), "name", "web");
        let state = apply_text_search(state, "ip", "10.0");
        assert_eq!(
            state.text_search(),
            Some(&TextSearch {
                column: "ip".to_string(),
                value: "10.0".to_string()
            })
        );
    }

    #[test]
    fn test_empty_text_clears_search() {
        let state = apply_text_search(QueryState::default(), "name", "web");
        let state = apply_page(state, 2).unwrap();
        let state = apply_text_search(state, "name", "");
        assert!(state.text_search().is_none());
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_sort_keeps_page() {
        let state = on_page(5, PageSize::Ten);
        let next = apply_sort(state, "name", SortDirection::Desc);
        assert_eq!(next.page(), 5);
        assert_eq!(next.sort(), Some(&Sort::new("name", SortDirection::Desc)));
    }

    #[test]
    fn test_page_zero_rejected() {
        assert!(matches!(
            apply_page(QueryState::default(), 0),
            Err(SiftError::InvalidPage(0))
        ));
    }

    #[test]
    fn test_apply_page_changes_only_page() {
        let state = apply_sort(QueryState::default(), "name", SortDirection::Asc);
        let next = apply_page(state.clone(), 7).unwrap();
        assert_eq!(changed_fields(&state, &next), vec![QueryField::Page]);
    }

    #[test]
    fn test_show_all_resets_only_on_change() {
        let state = on_page(3, PageSize::Ten);
        let same = apply_structural_flag(state, SHOW_ALL, false).unwrap();
        assert_eq!(same.page(), 3);
        let changed = apply_structural_flag(same, SHOW_ALL, true).unwrap();
        assert_eq!(changed.page(), 1);
        assert!(changed.show_all());
    }

    #[test]
    fn test_extra_flag_must_be_declared() {
        let state = QueryState::default();
        assert!(matches!(
            apply_structural_flag(state, "affected_only", true),
            Err(SiftError::UnknownFlag(_))
        ));

        let state = QueryState::default().with_flag("affected_only", false);
        let state = apply_page(state, 2).unwrap();
        let state = apply_structural_flag(state, "affected_only", true).unwrap();
        assert_eq!(state.flag("affected_only"), Some(true));
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_for_export_is_detached() {
        let state = on_page(3, PageSize::Fifty);
        let export = state.for_export();
        assert_eq!(export.page(), 1);
        assert_eq!(export.page_size(), PageSize::Unbounded);
        assert_eq!(state.page(), 3);
        assert_eq!(state.page_size(), PageSize::Fifty);
    }

    #[test]
    fn test_offset() {
        assert_eq!(on_page(1, PageSize::Twenty).offset(), 0);
        assert_eq!(on_page(3, PageSize::Twenty).offset(), 40);
        assert_eq!(on_page(3, PageSize::Twenty).for_export().offset(), 0);
    }

    #[test]
    fn test_page_size_parse() {
        assert_eq!("50".parse::<PageSize>().unwrap(), PageSize::Fifty);
        assert!("25".parse::<PageSize>().is_err());
        assert!("lots".parse::<PageSize>().is_err());
        assert_eq!(PageSize::Unbounded.to_string(), "all");
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!(
            "name:desc".parse::<Sort>().unwrap(),
            Sort::new("name", SortDirection::Desc)
        );
        assert_eq!(
            "name".parse::<Sort>().unwrap(),
            Sort::new("name", SortDirection::Asc)
        );
        assert!("name:sideways".parse::<Sort>().is_err());
        assert!(":desc".parse::<Sort>().is_err());
    }

    #[test]
    fn test_reducer_dispatches_actions() {
        let state = reduce_query_state(QueryState::default(), QueryAction::Page(4)).unwrap();
        let state = reduce_query_state(
            state,
            QueryAction::Sort {
                column: "name".to_string(),
                direction: SortDirection::Asc,
            },
        )
        .unwrap();
        assert_eq!(state.page(), 4);
        let state = reduce_query_state(
            state,
            QueryAction::TextSearch {
                column: "name".to_string(),
                text: "db".to_string(),
            },
        )
        .unwrap();
        assert_eq!(state.page(), 1);
        assert!(reduce_query_state(state, QueryAction::Page(0)).is_err());
    }
}
