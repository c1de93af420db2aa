//! Filter catalog
//!
//! The catalog is the immutable tree of filter definitions a view is mounted
//! with. Top-level entries are section headers; below them sit selectable
//! filters at most two levels deep (child, grandchild).

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};

/// Maximum nesting below a top-level section.
pub const MAX_DEPTH: usize = 2;

/// Wire shape of a filter definition as written in catalog files.
///
/// A definition carrying an `items` key (even an empty one) is a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDef {
    pub title: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<FilterDef>>,
}

/// A node of the filter tree, identified by its `value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterNode {
    Group {
        title: String,
        value: String,
        children: Vec<FilterNode>,
    },
    Leaf {
        title: String,
        value: String,
    },
}

impl FilterNode {
    pub fn group(
        title: impl Into<String>,
        value: impl Into<String>,
        children: Vec<FilterNode>,
    ) -> Self {
        FilterNode::Group {
            title: title.into(),
            value: value.into(),
            children,
        }
    }

    pub fn leaf(title: impl Into<String>, value: impl Into<String>) -> Self {
        FilterNode::Leaf {
            title: title.into(),
            value: value.into(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            FilterNode::Group { title, .. } | FilterNode::Leaf { title, .. } => title,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            FilterNode::Group { value, .. } | FilterNode::Leaf { value, .. } => value,
        }
    }

    /// Direct children; empty for leaves.
    pub fn children(&self) -> &[FilterNode] {
        match self {
            FilterNode::Group { children, .. } => children,
            FilterNode::Leaf { .. } => &[],
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, FilterNode::Group { .. })
    }

    /// Number of nodes in this subtree, including the node itself.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(FilterNode::node_count)
            .sum::<usize>()
    }

    fn depth(&self) -> usize {
        self.children()
            .iter()
            .map(|c| 1 + c.depth())
            .max()
            .unwrap_or(0)
    }

    fn find(&self, value: &str) -> Option<&FilterNode> {
        if self.value() == value {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(value))
    }
}

impl From<FilterDef> for FilterNode {
    fn from(def: FilterDef) -> Self {
        match def.items {
            Some(items) => FilterNode::Group {
                title: def.title,
                value: def.value,
                children: items.into_iter().map(FilterNode::from).collect(),
            },
            None => FilterNode::Leaf {
                title: def.title,
                value: def.value,
            },
        }
    }
}

/// Validated, immutable filter tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCatalog {
    sections: Vec<FilterNode>,
}

impl FilterCatalog {
    /// Build a catalog from top-level sections, validating its shape.
    pub fn new(sections: Vec<FilterNode>) -> Result<Self> {
        validate_siblings(&sections, "catalog root")?;
        for section in &sections {
            if section.depth() > MAX_DEPTH {
                return Err(SiftError::InvalidCatalog(format!(
                    "section '{}' nests deeper than {} levels",
                    section.title(),
                    MAX_DEPTH
                )));
            }
            validate_selectable(section.children(), section.title())?;
        }
        Ok(Self { sections })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_defs(defs: Vec<FilterDef>) -> Result<Self> {
        Self::new(defs.into_iter().map(FilterNode::from).collect())
    }

    /// Parse a catalog from YAML (or JSON, which is valid YAML).
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let defs: Vec<FilterDef> = serde_yaml_ng::from_str(content)?;
        Self::from_defs(defs)
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SiftError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read catalog at {}: {}", path.display(), e),
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Top-level sections, each rendered as a disabled header.
    pub fn sections(&self) -> &[FilterNode] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Total number of nodes, section headers included.
    pub fn node_count(&self) -> usize {
        self.sections.iter().map(FilterNode::node_count).sum()
    }

    /// Find the first node carrying `value` below a section header.
    pub fn find(&self, value: &str) -> Option<&FilterNode> {
        self.sections
            .iter()
            .flat_map(|s| s.children())
            .find_map(|c| c.find(value))
    }

    /// Values of every section containing the selectable filter `value`.
    ///
    /// Sibling values are unique, but one value may appear under several
    /// sections.
    pub fn sections_of<'a>(&'a self, value: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.sections
            .iter()
            .filter(move |s| s.children().iter().any(|c| c.find(value).is_some()))
            .map(FilterNode::value)
    }
}

fn validate_siblings(nodes: &[FilterNode], parent: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for node in nodes {
        if !node.value().is_empty() && !seen.insert(node.value()) {
            return Err(SiftError::InvalidCatalog(format!(
                "duplicate value '{}' under '{}'",
                node.value(),
                parent
            )));
        }
    }
    Ok(())
}

fn validate_selectable(nodes: &[FilterNode], parent: &str) -> Result<()> {
    validate_siblings(nodes, parent)?;
    for node in nodes {
        if node.value().is_empty() {
            return Err(SiftError::InvalidCatalog(format!(
                "filter '{}' under '{}' has no value",
                node.title(),
                parent
            )));
        }
        validate_selectable(node.children(), node.title())?;
    }
    Ok(())
}
