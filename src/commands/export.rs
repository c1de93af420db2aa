use std::path::Path;

use super::{ViewOptions, run_view};
use crate::error::Result;
use crate::export::{DirectorySink, ExportFormat};

/// Download every item matching the selectors into `out_dir`
pub async fn cmd_export(opts: &ViewOptions, format: ExportFormat, out_dir: &Path) -> Result<()> {
    let engine = run_view(opts).await?;
    let path = engine.download(format, &DirectorySink::new(out_dir)).await?;
    engine.teardown();
    println!("{}", path.display());
    Ok(())
}
