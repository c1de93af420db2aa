//! Pagination intents
//!
//! Page changes made while dragging a page slider are debounced and shown
//! optimistically; discrete clicks and page-size changes dispatch at once.

use serde::Serialize;

use crate::dispatch::DispatchMode;
use crate::error::Result;
use crate::query::{PageSize, QueryAction, QueryState, reduce_query_state};

/// View model consumed by the pagination control
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationViewModel {
    pub current_page: u32,
    pub page_size: PageSize,
    pub total_items: u64,
    pub page_size_options: Vec<PageSize>,
    pub page_count: u32,
    /// False until results are loaded, or when the view has no columns
    pub visible: bool,
}

/// Tracks the ephemeral page shown while a debounced page change is pending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationController {
    ephemeral_page: Option<u32>,
}

impl PaginationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `page`. Dragging shows the page optimistically and debounces
    /// the dispatch; otherwise the dispatch is immediate.
    pub fn set_page(
        &mut self,
        state: QueryState,
        page: u32,
        is_dragging: bool,
    ) -> Result<(QueryState, DispatchMode)> {
        let next = reduce_query_state(state, QueryAction::Page(page))?;
        if is_dragging {
            self.ephemeral_page = Some(page);
            Ok((next, DispatchMode::Debounced))
        } else {
            self.ephemeral_page = None;
            Ok((next, DispatchMode::Immediate))
        }
    }

    /// Change the page size; always dispatched immediately.
    pub fn set_page_size(
        &mut self,
        state: QueryState,
        page_size: PageSize,
    ) -> Result<(QueryState, DispatchMode)> {
        let next = reduce_query_state(state, QueryAction::PageSize(page_size))?;
        self.ephemeral_page = None;
        Ok((next, DispatchMode::Immediate))
    }

    /// A dispatch went out; the display follows the query state again.
    pub fn on_dispatched(&mut self) {
        self.ephemeral_page = None;
    }

    /// Another transition moved the page, so the optimistic page is void.
    pub fn on_query_changed(&mut self, before: &QueryState, after: &QueryState) {
        if before.page() != after.page() {
            self.ephemeral_page = None;
        }
    }

    pub fn ephemeral_page(&self) -> Option<u32> {
        self.ephemeral_page
    }

    /// Page to display: the optimistic page while one is pending.
    pub fn current_page(&self, state: &QueryState) -> u32 {
        self.ephemeral_page.unwrap_or_else(|| state.page())
    }

    pub fn view_model(
        &self,
        state: &QueryState,
        total_items: u64,
        visible: bool,
    ) -> PaginationViewModel {
        PaginationViewModel {
            current_page: self.current_page(state),
            page_size: state.page_size(),
            total_items,
            page_size_options: PageSize::OPTIONS.to_vec(),
            page_count: page_count(total_items, state.page_size()),
            visible,
        }
    }
}

/// Number of pages needed for `total_items`; at least one.
pub fn page_count(total_items: u64, page_size: PageSize) -> u32 {
    match page_size.limit() {
        Some(limit) => {
            let pages = total_items.div_ceil(u64::from(limit)).max(1);
            u32::try_from(pages).unwrap_or(u32::MAX)
        }
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::apply_page;

    #[test]
    fn test_dragging_is_debounced_and_optimistic() {
        let mut controller = PaginationController::new();
        let (state, mode) = controller
            .set_page(QueryState::default(), 4, true)
            .unwrap();
        assert_eq!(mode, DispatchMode::Debounced);
        assert_eq!(state.page(), 4);
        assert_eq!(controller.ephemeral_page(), Some(4));

        // Another intent moved the query state meanwhile; display stays optimistic
        let reset = apply_page(state, 1).unwrap();
        assert_eq!(controller.current_page(&reset), 4);

        controller.on_dispatched();
        assert_eq!(controller.current_page(&reset), 1);
    }

    #[test]
    fn test_click_is_immediate_and_clears_ephemeral() {
        let mut controller = PaginationController::new();
        let (state, _) = controller
            .set_page(QueryState::default(), 4, true)
            .unwrap();
        let (state, mode) = controller.set_page(state, 2, false).unwrap();
        assert_eq!(mode, DispatchMode::Immediate);
        assert_eq!(controller.ephemeral_page(), None);
        assert_eq!(controller.current_page(&state), 2);
    }

    #[test]
    fn test_page_reset_elsewhere_clears_ephemeral() {
        let mut controller = PaginationController::new();
        let (state, _) = controller
            .set_page(QueryState::default(), 5, true)
            .unwrap();

        let sorted = crate::query::apply_sort(state.clone(), "name", crate::query::SortDirection::Asc);
        controller.on_query_changed(&state, &sorted);
        assert_eq!(controller.current_page(&sorted), 5);

        let searched = crate::query::apply_text_search(sorted.clone(), "name", "web");
        controller.on_query_changed(&sorted, &searched);
        assert_eq!(controller.ephemeral_page(), None);
        assert_eq!(controller.current_page(&searched), 1);
    }

    #[test]
    fn test_page_size_is_immediate_and_resets_page() {
        let mut controller = PaginationController::new();
        let state = apply_page(QueryState::new(PageSize::Twenty), 3).unwrap();
        let (state, mode) = controller.set_page_size(state, PageSize::Fifty).unwrap();
        assert_eq!(mode, DispatchMode::Immediate);
        assert_eq!(state.page(), 1);
        assert_eq!(state.page_size(), PageSize::Fifty);
    }

    #[test]
    fn test_invalid_page_leaves_ephemeral_untouched() {
        let mut controller = PaginationController::new();
        let (state, _) = controller
            .set_page(QueryState::default(), 3, true)
            .unwrap();
        assert!(controller.set_page(state, 0, false).is_err());
        assert_eq!(controller.ephemeral_page(), Some(3));
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, PageSize::Ten), 1);
        assert_eq!(page_count(10, PageSize::Ten), 1);
        assert_eq!(page_count(11, PageSize::Ten), 2);
        assert_eq!(page_count(1_000, PageSize::Unbounded), 1);
    }

    #[test]
    fn test_view_model() {
        let controller = PaginationController::new();
        let state = apply_page(QueryState::new(PageSize::Ten), 2).unwrap();
        let vm = controller.view_model(&state, 35, true);
        assert_eq!(vm.current_page, 2);
        assert_eq!(vm.page_count, 4);
        assert_eq!(vm.page_size_options.len(), 4);
        assert!(vm.visible);
    }
}
