//! Downloads of the full result set
//!
//! A download fetches every item matching the current query, encodes the
//! payload and hands it to an [`ExportSink`] under a timestamped file name.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(SiftError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Result-set payload returned by a data source for a download
#[derive(Debug, Clone, PartialEq)]
pub enum ExportPayload {
    /// Structured document, serialized as JSON text on save
    Json(serde_json::Value),
    /// Already-encoded tabular data, saved as is
    Raw(Vec<u8>),
}

impl ExportPayload {
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            ExportPayload::Json(value) => Ok(serde_json::to_vec(value)?),
            ExportPayload::Raw(bytes) => Ok(bytes.clone()),
        }
    }
}

/// `<prefix>-<ISO-8601 timestamp>.<ext>`
pub fn export_file_name(prefix: &str, format: ExportFormat, at: Timestamp) -> String {
    format!(
        "{}-{}.{}",
        prefix,
        at.strftime("%Y-%m-%dT%H:%M:%S%.3fZ"),
        format.extension()
    )
}

/// Destination for downloaded files
pub trait ExportSink: Send + Sync {
    /// Persist `bytes` under `file_name`, returning where they went.
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Writes downloads into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for DirectorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        if file_name.contains(std::path::MAIN_SEPARATOR) || file_name.contains('/') {
            return Err(SiftError::Export(format!(
                "file name '{file_name}' must not contain a path separator"
            )));
        }
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes).map_err(|e| {
            SiftError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write export to {}: {}", path.display(), e),
            ))
        })?;
        Ok(path)
    }
}
