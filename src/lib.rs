pub mod catalog;
pub mod columns;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod display;
pub mod engine;
pub mod error;
pub mod export;
pub mod fetch;
pub mod logging;
pub mod pagination;
pub mod query;
pub mod selection;

pub use catalog::{FilterCatalog, FilterDef, FilterNode};
pub use columns::{Column, ToolbarViewModel, compute_toolbar, default_search_column};
pub use config::EngineConfig;
pub use dispatch::{DebouncedDispatcher, Dispatch, DispatchMode, RequestToken, RequestTokens};
pub use engine::{EngineView, QueryEngine};
pub use error::{Result, SiftError};
pub use export::{DirectorySink, ExportFormat, ExportPayload, ExportSink, export_file_name};
pub use fetch::{Fetcher, MemorySource, Page};
pub use pagination::{PaginationController, PaginationViewModel};
pub use query::{
    PageSize, QueryAction, QueryState, Sort, SortDirection, TextSearch, reduce_query_state,
};
pub use selection::{ActiveFilter, ActiveFilters, FilterIntent, Indent, RenderNode, project, toggle};
