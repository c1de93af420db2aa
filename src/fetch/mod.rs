//! The data-fetch boundary

pub mod memory;

use serde::Serialize;

use crate::error::Result;
use crate::export::{ExportFormat, ExportPayload};
use crate::query::QueryState;

pub use memory::MemorySource;

/// One page of results plus the size of the whole matching set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
}

/// Source of result pages for a query
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    /// Fetch the page described by `query`.
    async fn fetch(&self, query: &QueryState) -> Result<Page<Self::Item>>;

    /// Fetch everything matching `query` for a download.
    async fn fetch_export(&self, query: &QueryState, format: ExportFormat)
    -> Result<ExportPayload>;
}
