use std::path::Path;

use serde_json::json;

use crate::catalog::FilterCatalog;
use crate::display::{format_filter_list, format_intent};
use crate::error::Result;
use crate::selection::{ActiveFilter, ActiveFilters, project, toggle};

/// Print the projected filter list, after applying `toggles` in order
pub fn cmd_filters(catalog: &Path, select: &[String], toggles: &[usize], output_json: bool) -> Result<()> {
    let catalog = FilterCatalog::load(catalog)?;
    let mut active = ActiveFilters::from_selected(select);
    let mut rows = project(&catalog, &active);

    let mut intents = Vec::new();
    for &index in toggles {
        let (next, emitted) = toggle(&rows, index)?;
        rows = next;
        for intent in &emitted {
            active.upsert(intent);
        }
        intents.extend(emitted);
    }

    if output_json {
        let active: Vec<ActiveFilter> = active.iter().collect();
        let output = json!({
            "filters": rows,
            "intents": intents,
            "active": active,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No filters defined");
        return Ok(());
    }
    println!("{}", format_filter_list(&rows));
    if !intents.is_empty() {
        println!();
        for intent in &intents {
            println!("{}", format_intent(intent));
        }
    }
    Ok(())
}
