//! Page-reset table
//!
//! Each query field carries a reset policy. A transition names the field it
//! touches; afterwards the page returns to 1 if the touched field always
//! resets, or if any field whose policy is not `Never` changed value.

use super::QueryState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryField {
    Filters,
    TextSearch,
    Sort,
    Page,
    PageSize,
    ShowAll,
    ExtraFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Touching the field resets the page, even without a value change
    Always,
    /// The page resets when the field's value changes
    OnChange,
    /// The field never affects the page
    Never,
}

impl QueryField {
    pub const ALL: [QueryField; 7] = [
        QueryField::Filters,
        QueryField::TextSearch,
        QueryField::Sort,
        QueryField::Page,
        QueryField::PageSize,
        QueryField::ShowAll,
        QueryField::ExtraFlags,
    ];

    pub fn reset_policy(self) -> ResetPolicy {
        match self {
            QueryField::Filters | QueryField::TextSearch | QueryField::PageSize => {
                ResetPolicy::Always
            }
            QueryField::ShowAll | QueryField::ExtraFlags => ResetPolicy::OnChange,
            QueryField::Sort | QueryField::Page => ResetPolicy::Never,
        }
    }
}

/// Fields whose observable value differs between two states.
pub fn changed_fields(before: &QueryState, after: &QueryState) -> Vec<QueryField> {
    // Destructured so a new field cannot be added without deciding its policy.
    let QueryState {
        filters,
        text_search,
        sort,
        page,
        page_size,
        show_all,
        extra_flags,
    } = before;

    let mut changed = Vec::new();
    if !filters.same_selection(&after.filters) {
        changed.push(QueryField::Filters);
    }
    if *text_search != after.text_search {
        changed.push(QueryField::TextSearch);
    }
    if *sort != after.sort {
        changed.push(QueryField::Sort);
    }
    if *page != after.page {
        changed.push(QueryField::Page);
    }
    if *page_size != after.page_size {
        changed.push(QueryField::PageSize);
    }
    if *show_all != after.show_all {
        changed.push(QueryField::ShowAll);
    }
    if *extra_flags != after.extra_flags {
        changed.push(QueryField::ExtraFlags);
    }
    changed
}

/// Apply `mutate` and then the reset table for the touched field.
pub(crate) fn transition(
    state: QueryState,
    touched: QueryField,
    mutate: impl FnOnce(&mut QueryState),
) -> QueryState {
    let mut next = state.clone();
    mutate(&mut next);

    let reset = touched.reset_policy() == ResetPolicy::Always
        || changed_fields(&state, &next)
            .into_iter()
            .any(|field| field.reset_policy() != ResetPolicy::Never);
    if reset {
        next.page = 1;
    }

    tracing::trace!(?touched, reset, page = next.page, "query transition");
    next
}
