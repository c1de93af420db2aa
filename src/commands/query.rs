use super::{ViewOptions, run_view};
use crate::display::{format_pagination, format_result_table};
use crate::error::{Result, SiftError};

/// Run a query against a dataset and print the resulting page
pub async fn cmd_query(opts: &ViewOptions, output_json: bool) -> Result<()> {
    let engine = run_view(opts).await?;
    let view = engine.view();
    engine.teardown();

    if let Some(error) = &view.last_error {
        return Err(SiftError::Fetch(error.clone()));
    }

    if output_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    if view.items.is_empty() {
        println!("No matching items");
    } else {
        println!("{}", format_result_table(engine.columns(), &view.items));
    }
    println!("{}", format_pagination(&view.pagination));
    Ok(())
}
