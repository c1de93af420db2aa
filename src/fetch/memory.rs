//! In-memory data source over JSON records
//!
//! Record fields are matched as follows:
//! - Each catalog section names a record field. A record passes a section
//!   when that field (a string or an array of strings) holds any selected
//!   value of the section. Sections combine with AND; a value listed under
//!   several sections constrains the field of each of them.
//! - Text search fuzzy-matches the searched column, after mapping it
//!   through the configured search aliases.
//! - `show_all` off hides records whose scope field is `false`.
//! - An extra flag that is on keeps only records whose field of the same
//!   name is `true`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde_json::Value;

use super::{Fetcher, Page};
use crate::catalog::FilterCatalog;
use crate::columns::search_key;
use crate::error::{Result, SiftError};
use crate::export::{ExportFormat, ExportPayload};
use crate::query::{QueryState, SortDirection};

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<Value>,
    catalog: FilterCatalog,
    search_aliases: BTreeMap<String, String>,
    scope_field: Option<String>,
    export_columns: Vec<String>,
}

impl MemorySource {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Parse a dataset: a JSON array of objects.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let records: Vec<Value> = serde_json::from_str(content)?;
        if let Some(pos) = records.iter().position(|r| !r.is_object()) {
            return Err(SiftError::Fetch(format!(
                "dataset record {pos} is not a JSON object"
            )));
        }
        Ok(Self::new(records))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SiftError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read dataset at {}: {}", path.display(), e),
            ))
        })?;
        Self::from_json_str(&content)
    }

    pub fn with_catalog(mut self, catalog: FilterCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_search_aliases(mut self, aliases: BTreeMap<String, String>) -> Self {
        self.search_aliases = aliases;
        self
    }

    /// Field consulted by `show_all`.
    pub fn with_scope_field(mut self, field: impl Into<String>) -> Self {
        self.scope_field = Some(field.into());
        self
    }

    /// Columns written to CSV downloads, in order. Defaults to every field
    /// seen in the matching records.
    pub fn with_export_columns(mut self, columns: Vec<String>) -> Self {
        self.export_columns = columns;
        self
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record matching `query`, sorted, ignoring pagination.
    pub fn select(&self, query: &QueryState) -> Vec<&Value> {
        let sections = self.selected_by_section(query);
        let matcher = SkimMatcherV2::default().smart_case();

        let mut matched: Vec<&Value> = self
            .records
            .iter()
            .filter(|record| {
                sections.iter().all(|(field, values)| {
                    field_strings(record.get(*field))
                        .iter()
                        .any(|s| values.contains(s.as_str()))
                })
            })
            .filter(|record| match query.text_search() {
                Some(search) => {
                    let key = search_key(&search.column, &self.search_aliases);
                    field_strings(record.get(key))
                        .iter()
                        .any(|s| matcher.fuzzy_match(s, &search.value).is_some())
                }
                None => true,
            })
            .filter(|record| {
                query.show_all()
                    || self
                        .scope_field
                        .as_ref()
                        .is_none_or(|field| record.get(field) != Some(&Value::Bool(false)))
            })
            .filter(|record| {
                query
                    .extra_flags()
                    .iter()
                    .filter(|(_, on)| **on)
                    .all(|(key, _)| record.get(key) == Some(&Value::Bool(true)))
            })
            .collect();

        if let Some(sort) = query.sort() {
            matched.sort_by(|a, b| {
                compare_values(a.get(&sort.column), b.get(&sort.column), sort.direction)
            });
        }
        matched
    }

    fn selected_by_section<'a>(&'a self, query: &'a QueryState) -> BTreeMap<&'a str, BTreeSet<&'a str>> {
        let mut sections: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for value in query.filters().selected_values() {
            let mut found = false;
            for section in self.catalog.sections_of(value) {
                sections.entry(section).or_default().insert(value);
                found = true;
            }
            if !found {
                tracing::trace!(value, "selected filter not in catalog; ignored");
            }
        }
        sections
    }

    fn encode_csv(&self, records: &[&Value]) -> Result<Vec<u8>> {
        let columns: Vec<String> = if self.export_columns.is_empty() {
            records
                .iter()
                .filter_map(|r| r.as_object())
                .flat_map(|obj| obj.keys().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        } else {
            self.export_columns.clone()
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&columns)?;
        for record in records {
            writer.write_record(columns.iter().map(|c| field_strings(record.get(c)).join(";")))?;
        }
        writer
            .into_inner()
            .map_err(|e| SiftError::Export(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Fetcher for MemorySource {
    type Item = Value;

    async fn fetch(&self, query: &QueryState) -> Result<Page<Value>> {
        let matched = self.select(query);
        let total_items = matched.len() as u64;
        let take = query
            .page_size()
            .limit()
            .map_or(usize::MAX, |limit| limit as usize);
        let items = matched
            .into_iter()
            .skip(query.offset())
            .take(take)
            .cloned()
            .collect();
        Ok(Page { items, total_items })
    }

    async fn fetch_export(&self, query: &QueryState, format: ExportFormat) -> Result<ExportPayload> {
        let matched = self.select(query);
        match format {
            ExportFormat::Json => Ok(ExportPayload::Json(Value::Array(
                matched.into_iter().cloned().collect(),
            ))),
            ExportFormat::Csv => Ok(ExportPayload::Raw(self.encode_csv(&matched)?)),
        }
    }
}

/// Textual forms of a field: scalars yield one string, arrays one per element.
fn field_strings(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .flat_map(|item| field_strings(Some(item)))
            .collect(),
        Some(other) => vec![other.to_string()],
    }
}

/// Numbers compare numerically, everything else textually. Missing values
/// sort last in either direction.
fn compare_values(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    fn present(v: Option<&Value>) -> Option<&Value> {
        v.filter(|v| !v.is_null())
    }

    let ord = match (present(a), present(b)) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => field_strings(Some(x)).cmp(&field_strings(Some(y))),
    };
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}
