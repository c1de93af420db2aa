mod export;
mod filters;
mod query;

pub use export::cmd_export;
pub use filters::cmd_filters;
pub use query::cmd_query;

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::catalog::FilterCatalog;
use crate::columns::Column;
use crate::config::EngineConfig;
use crate::engine::QueryEngine;
use crate::error::{Result, SiftError};
use crate::fetch::MemorySource;
use crate::query::{PageSize, SHOW_ALL, Sort};

/// Selectors shared by the commands that run a query
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    pub catalog: PathBuf,
    pub dataset: PathBuf,
    pub config: Option<PathBuf>,
    pub select: Vec<String>,
    pub search: Option<(String, String)>,
    pub sort: Option<Sort>,
    pub page: Option<u32>,
    pub page_size: Option<PageSize>,
    pub show_all: bool,
    pub flags: Vec<(String, bool)>,
    /// Dataset fields holding dates; never offered for text search
    pub time_columns: Vec<String>,
    /// Field hidden records carry as `false` unless `--show-all` is given
    pub scope_field: Option<String>,
}

/// Columns for a dataset: every field seen in its records.
fn dataset_columns(source: &MemorySource, time_columns: &[String]) -> Vec<Column> {
    source
        .records()
        .iter()
        .filter_map(|r| r.as_object())
        .flat_map(|obj| obj.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|key| {
            if time_columns.contains(key) {
                Column::time(key.clone(), key.clone())
            } else {
                Column::new(key.clone(), key.clone())
            }
        })
        .collect()
}

fn build_engine(opts: &ViewOptions) -> Result<QueryEngine<MemorySource>> {
    let config = EngineConfig::load(opts.config.as_deref())?;
    let catalog = FilterCatalog::load(&opts.catalog)?;

    let mut source = MemorySource::load(&opts.dataset)?
        .with_catalog(catalog.clone())
        .with_search_aliases(config.search_aliases.clone());
    if let Some(field) = &opts.scope_field {
        source = source.with_scope_field(field.clone());
    }
    let columns = dataset_columns(&source, &opts.time_columns);
    let source = source.with_export_columns(columns.iter().map(|c| c.key.clone()).collect());

    // Flags named on the command line are declared up front
    let mut config = config;
    for (key, _) in &opts.flags {
        if key != SHOW_ALL {
            config.flags.entry(key.clone()).or_insert(false);
        }
    }

    Ok(QueryEngine::new(catalog, columns, source, config))
}

/// Start the engine and replay the selectors as user intents.
async fn run_view(opts: &ViewOptions) -> Result<QueryEngine<MemorySource>> {
    let engine = build_engine(opts)?;
    engine.start()?;

    for value in &opts.select {
        let rows = engine.filters();
        let index = rows
            .iter()
            .position(|r| !r.is_disabled && r.filter.value == *value)
            .ok_or_else(|| SiftError::UnknownFilter(value.clone()))?;
        if !rows[index].filter.selected {
            engine.toggle_filter(index)?;
        }
    }
    if let Some((column, text)) = &opts.search {
        engine.set_text_search(column, text)?;
        engine.flush();
    }
    if let Some(sort) = &opts.sort {
        engine.set_sort(&sort.column, sort.direction)?;
    }
    if let Some(page_size) = opts.page_size {
        engine.set_page_size(page_size)?;
    }
    if opts.show_all {
        engine.set_flag(SHOW_ALL, true)?;
    }
    for (key, value) in &opts.flags {
        engine.set_flag(key, *value)?;
    }
    if let Some(page) = opts.page {
        engine.set_page(page, false)?;
    }

    engine.settled().await;
    Ok(engine)
}
