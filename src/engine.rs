//! Query engine for one filtered result view
//!
//! The engine owns the view's state: the catalog, the query, the committed
//! page of results and the pagination display. Intents mutate the query
//! synchronously and hand it to a [`DebouncedDispatcher`]; each dispatch
//! spawns one fetch whose result is committed only if its token is still
//! the latest one issued.
//!
//! Intents spawn tasks, so they must be called from within a tokio runtime.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use jiff::Timestamp;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use crate::catalog::FilterCatalog;
use crate::columns::{Column, ToolbarViewModel, compute_toolbar};
use crate::config::EngineConfig;
use crate::dispatch::{DebouncedDispatcher, Dispatch, DispatchMode, RequestToken, RequestTokens};
use crate::error::{Result, SiftError};
use crate::export::{ExportFormat, ExportSink, export_file_name};
use crate::fetch::{Fetcher, Page};
use crate::pagination::{PaginationController, PaginationViewModel};
use crate::query::{PageSize, QueryAction, QueryState, SortDirection, reduce_query_state};
use crate::selection::{FilterIntent, RenderNode, project, toggle};

/// Everything the render boundary needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineView<T> {
    pub filters: Vec<RenderNode>,
    pub toolbar: ToolbarViewModel,
    pub pagination: PaginationViewModel,
    pub items: Vec<T>,
    pub total_items: u64,
    pub loading: bool,
    pub last_error: Option<String>,
}

struct ViewState<T> {
    query: QueryState,
    pagination: PaginationController,
    rows: Vec<RenderNode>,
    items: Vec<T>,
    total_items: u64,
    loaded: bool,
    last_error: Option<String>,
    /// Token of the last dispatch whose fetch finished, committed or failed
    settled: Option<RequestToken>,
}

struct EngineShared<F: Fetcher> {
    catalog: FilterCatalog,
    columns: Vec<Column>,
    config: EngineConfig,
    fetcher: Arc<F>,
    tokens: RequestTokens,
    state: Mutex<ViewState<F::Item>>,
    torn_down: AtomicBool,
    settled_tx: watch::Sender<Option<RequestToken>>,
}

impl<F: Fetcher + 'static> EngineShared<F> {
    fn on_dispatch(self: &Arc<Self>, dispatch: Dispatch<QueryState>) {
        self.state.lock().pagination.on_dispatched();

        let fetcher = Arc::clone(&self.fetcher);
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let result = fetcher.fetch(&dispatch.state).await;
            if let Some(shared) = weak.upgrade() {
                shared.commit(dispatch.token, result);
            }
        });
    }

    /// Store a fetch result. Both checks run under the state lock: a newer
    /// dispatch that commits first must not be overwritten.
    fn commit(&self, token: RequestToken, result: Result<Page<F::Item>>) {
        let mut state = self.state.lock();
        if self.torn_down.load(Ordering::SeqCst) {
            tracing::debug!(%token, "dropping response after teardown");
            return;
        }
        if !self.tokens.is_current(token) {
            tracing::debug!(%token, "dropping stale response");
            return;
        }

        match result {
            Ok(page) => {
                state.items = page.items;
                state.total_items = page.total_items;
                state.loaded = true;
                state.last_error = None;
            }
            Err(e) => {
                tracing::warn!(%token, error = %e, "fetch failed, keeping previous results");
                state.last_error = Some(e.to_string());
            }
        }
        state.settled = Some(token);
        self.settled_tx.send_replace(Some(token));
    }
}

pub struct QueryEngine<F: Fetcher + 'static> {
    shared: Arc<EngineShared<F>>,
    dispatcher: DebouncedDispatcher<QueryState>,
}

impl<F: Fetcher + 'static> QueryEngine<F> {
    pub fn new(catalog: FilterCatalog, columns: Vec<Column>, fetcher: F, config: EngineConfig) -> Self {
        let query = config.initial_query();
        let rows = project(&catalog, query.filters());
        let tokens = RequestTokens::new();
        let (settled_tx, _) = watch::channel(None);

        let shared = Arc::new(EngineShared {
            catalog,
            columns,
            fetcher: Arc::new(fetcher),
            tokens: tokens.clone(),
            state: Mutex::new(ViewState {
                query,
                pagination: PaginationController::new(),
                rows,
                items: Vec::new(),
                total_items: 0,
                loaded: false,
                last_error: None,
                settled: None,
            }),
            torn_down: AtomicBool::new(false),
            settled_tx,
            config,
        });

        let weak = Arc::downgrade(&shared);
        let dispatcher = DebouncedDispatcher::with_tokens(
            shared.config.quiescence_window(),
            tokens,
            Arc::new(move |dispatch: Dispatch<QueryState>| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_dispatch(dispatch);
                }
            }),
        );

        Self { shared, dispatcher }
    }

    /// Send the initial query.
    pub fn start(&self) -> Result<RequestToken> {
        self.ensure_live()?;
        let query = self.shared.state.lock().query.clone();
        self.dispatcher
            .submit(query, DispatchMode::Immediate)
            .ok_or(SiftError::TornDown)
    }

    /// Toggle the filter row at `index`, dispatching immediately.
    pub fn toggle_filter(&self, index: usize) -> Result<Vec<FilterIntent>> {
        self.ensure_live()?;
        let (query, intents) = {
            let mut state = self.shared.state.lock();
            let (_, intents) = toggle(&state.rows, index)?;
            let query = self.apply(&mut state, QueryAction::Filters(intents.clone()))?;
            (query, intents)
        };
        self.dispatcher.submit(query, DispatchMode::Immediate);
        Ok(intents)
    }

    /// Search `column` for `text`; debounced. Empty text clears the search.
    pub fn set_text_search(&self, column: &str, text: &str) -> Result<()> {
        self.ensure_live()?;
        if !self
            .shared
            .columns
            .iter()
            .any(|c| c.key == column && c.is_searchable())
        {
            return Err(SiftError::UnknownColumn(column.to_string()));
        }
        let query = self.update(QueryAction::TextSearch {
            column: column.to_string(),
            text: text.to_string(),
        })?;
        self.dispatcher.submit(query, DispatchMode::Debounced);
        Ok(())
    }

    pub fn set_sort(&self, column: &str, direction: SortDirection) -> Result<()> {
        self.ensure_live()?;
        if !self.shared.columns.iter().any(|c| c.key == column) {
            return Err(SiftError::UnknownColumn(column.to_string()));
        }
        let query = self.update(QueryAction::Sort {
            column: column.to_string(),
            direction,
        })?;
        self.dispatcher.submit(query, DispatchMode::Immediate);
        Ok(())
    }

    /// Move to `page`; dragging debounces and shows the page optimistically.
    pub fn set_page(&self, page: u32, is_dragging: bool) -> Result<()> {
        self.ensure_live()?;
        let (query, mode) = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            let (query, mode) = state
                .pagination
                .set_page(state.query.clone(), page, is_dragging)?;
            state.query = query.clone();
            (query, mode)
        };
        self.dispatcher.submit(query, mode);
        Ok(())
    }

    pub fn set_page_size(&self, page_size: PageSize) -> Result<()> {
        self.ensure_live()?;
        let (query, mode) = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            let (query, mode) = state
                .pagination
                .set_page_size(state.query.clone(), page_size)?;
            state.query = query.clone();
            (query, mode)
        };
        self.dispatcher.submit(query, mode);
        Ok(())
    }

    /// Set `show_all` or a declared extra flag, dispatching immediately.
    pub fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        self.ensure_live()?;
        let query = self.update(QueryAction::Flag {
            key: key.to_string(),
            value,
        })?;
        self.dispatcher.submit(query, DispatchMode::Immediate);
        Ok(())
    }

    /// Dispatch a pending debounced query now instead of waiting out the
    /// quiescence window.
    pub fn flush(&self) -> Option<RequestToken> {
        self.dispatcher.flush()
    }

    /// Download everything matching the current query into `sink`.
    ///
    /// The visible page and page size are left untouched.
    pub async fn download(&self, format: ExportFormat, sink: &dyn ExportSink) -> Result<PathBuf> {
        self.ensure_live()?;
        let query = self.shared.state.lock().query.for_export();
        let payload = self
            .shared
            .fetcher
            .fetch_export(&query, format)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "export fetch failed"))?;
        let bytes = payload.encode()?;
        let file_name = export_file_name(&self.shared.config.export_prefix, format, Timestamp::now());
        let path = sink.save(&file_name, &bytes)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "saved export");
        Ok(path)
    }

    /// Wait until no dispatch is pending and the latest fetch has finished.
    pub async fn settled(&self) {
        let mut rx = self.shared.settled_tx.subscribe();
        loop {
            if self.is_torn_down() || (!self.dispatcher.has_pending() && !self.is_loading()) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn view(&self) -> EngineView<F::Item> {
        let loading = self.is_loading();
        let state = self.shared.state.lock();
        let visible = state.loaded && !self.shared.columns.is_empty();
        EngineView {
            filters: state.rows.clone(),
            toolbar: compute_toolbar(&self.shared.columns, &state.rows, &state.query, state.total_items),
            pagination: state
                .pagination
                .view_model(&state.query, state.total_items, visible),
            items: state.items.clone(),
            total_items: state.total_items,
            loading,
            last_error: state.last_error.clone(),
        }
    }

    pub fn query(&self) -> QueryState {
        self.shared.state.lock().query.clone()
    }

    pub fn filters(&self) -> Vec<RenderNode> {
        self.shared.state.lock().rows.clone()
    }

    pub fn catalog(&self) -> &FilterCatalog {
        &self.shared.catalog
    }

    pub fn columns(&self) -> &[Column] {
        &self.shared.columns
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// True while the latest dispatch has not finished fetching.
    pub fn is_loading(&self) -> bool {
        let latest = self.shared.tokens.latest();
        latest.is_some() && latest != self.shared.state.lock().settled
    }

    /// Cancel pending dispatches and ignore responses still in flight.
    pub fn teardown(&self) {
        {
            // Taken so no commit is between its checks and its write
            let _state = self.shared.state.lock();
            if self.shared.torn_down.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        self.dispatcher.teardown();
        self.shared.settled_tx.send_replace(None);
        tracing::debug!("query engine torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.torn_down.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_torn_down() {
            Err(SiftError::TornDown)
        } else {
            Ok(())
        }
    }

    fn update(&self, action: QueryAction) -> Result<QueryState> {
        self.apply(&mut self.shared.state.lock(), action)
    }

    /// Apply a non-pagination action to locked state and store the result.
    fn apply(&self, state: &mut ViewState<F::Item>, action: QueryAction) -> Result<QueryState> {
        let query = reduce_query_state(state.query.clone(), action)?;
        state.pagination.on_query_changed(&state.query, &query);
        state.rows = project(&self.shared.catalog, query.filters());
        state.query = query.clone();
        Ok(query)
    }
}

impl<F: Fetcher + 'static> Drop for QueryEngine<F> {
    fn drop(&mut self) {
        self.teardown();
    }
}
