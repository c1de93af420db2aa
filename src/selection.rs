//! Selection projection and cascade toggling
//!
//! `project` flattens a catalog plus the active selection into the ordered
//! list the render boundary consumes. `toggle` flips one row of that list and
//! reports the selection changes as intents. Both are pure: rows reference
//! their children by value, never by position, so the list can always be
//! recomputed from `(catalog, active)`.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{FilterCatalog, FilterNode};
use crate::error::{Result, SiftError};

/// A filter value with its explicit selected flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFilter {
    pub value: String,
    pub selected: bool,
}

/// A requested change to one filter's selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterIntent {
    pub value: String,
    pub selected: bool,
}

impl FilterIntent {
    pub fn select(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            selected: true,
        }
    }

    pub fn deselect(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            selected: false,
        }
    }
}

/// The set of active filters, keyed by value
///
/// Entries may be retained with `selected = false`; only the selected flag is
/// observable, so two sets with the same selected values compare equal via
/// [`ActiveFilters::same_selection`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveFilters(BTreeMap<String, bool>);

impl ActiveFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_selected<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(|v| (v.into(), true)).collect())
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.0.get(value).copied().unwrap_or(false)
    }

    /// Insert or overwrite the entry for the intent's value.
    pub fn upsert(&mut self, intent: &FilterIntent) {
        self.0.insert(intent.value.clone(), intent.selected);
    }

    /// Values currently selected, in sorted order.
    pub fn selected_values(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(value, _)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = ActiveFilter> + '_ {
        self.0.iter().map(|(value, selected)| ActiveFilter {
            value: value.clone(),
            selected: *selected,
        })
    }

    pub fn any_selected(&self) -> bool {
        self.0.values().any(|s| *s)
    }

    pub fn same_selection(&self, other: &ActiveFilters) -> bool {
        self.selected_values().eq(other.selected_values())
    }
}

/// Row indentation in the flattened list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Indent {
    #[default]
    Top,
    Nested,
}

impl Indent {
    pub fn level(self) -> u8 {
        match self {
            Indent::Top => 0,
            Indent::Nested => 1,
        }
    }
}

/// Filter view attached to a rendered row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderFilter {
    pub title: String,
    pub value: String,
    pub selected: bool,
    /// Value of the top-level section this row belongs to
    pub group: String,
    /// Values of the row's direct children
    pub children: Vec<String>,
}

/// One row of the flattened filter list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderNode {
    pub filter: RenderFilter,
    pub indent: Indent,
    pub is_disabled: bool,
}

impl RenderNode {
    fn header(section: &FilterNode) -> Self {
        RenderNode {
            filter: RenderFilter {
                title: section.title().to_string(),
                value: section.value().to_string(),
                selected: false,
                group: section.value().to_string(),
                children: child_values(section),
            },
            indent: Indent::Top,
            is_disabled: true,
        }
    }

    fn row(node: &FilterNode, section: &FilterNode, indent: Indent, active: &ActiveFilters) -> Self {
        RenderNode {
            filter: RenderFilter {
                title: node.title().to_string(),
                value: node.value().to_string(),
                selected: active.is_selected(node.value()),
                group: section.value().to_string(),
                children: child_values(node),
            },
            indent,
            is_disabled: false,
        }
    }
}

fn child_values(node: &FilterNode) -> Vec<String> {
    node.children().iter().map(|c| c.value().to_string()).collect()
}

/// Flatten the catalog into its depth-first render order.
///
/// Each section yields a disabled header, then every child (top indent)
/// immediately followed by its own children (nested indent).
pub fn project(catalog: &FilterCatalog, active: &ActiveFilters) -> Vec<RenderNode> {
    let mut rows = Vec::with_capacity(catalog.node_count());
    for section in catalog.sections() {
        rows.push(RenderNode::header(section));
        for child in section.children() {
            rows.push(RenderNode::row(child, section, Indent::Top, active));
            for grandchild in child.children() {
                rows.push(RenderNode::row(grandchild, section, Indent::Nested, active));
            }
        }
    }
    rows
}

/// Flip the row at `index`, cascading a group's new state to its children.
///
/// Returns the updated list and one intent per value whose selection
/// changed, ordered by the index of the value's first row. Leaf toggles
/// never propagate upward.
pub fn toggle(rows: &[RenderNode], index: usize) -> Result<(Vec<RenderNode>, Vec<FilterIntent>)> {
    let target = rows.get(index).ok_or(SiftError::IndexOutOfRange {
        index,
        len: rows.len(),
    })?;
    if target.is_disabled {
        return Err(SiftError::DisabledNode(target.filter.title.clone()));
    }

    let new_state = !target.filter.selected;
    let mut desired: HashMap<&str, bool> = target
        .filter
        .children
        .iter()
        .map(|v| (v.as_str(), new_state))
        .collect();
    desired.insert(target.filter.value.as_str(), new_state);

    let mut intents = Vec::new();
    let mut emitted = HashSet::new();
    let updated = rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            if row.is_disabled {
                return row;
            }
            if let Some(&selected) = desired.get(row.filter.value.as_str()) {
                if row.filter.selected != selected && emitted.insert(row.filter.value.clone()) {
                    intents.push(FilterIntent {
                        value: row.filter.value.clone(),
                        selected,
                    });
                }
                row.filter.selected = selected;
            }
            row
        })
        .collect();

    Ok((updated, intents))
}
