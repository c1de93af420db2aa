use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiftError {
    // Programming errors: invalid use of the engine API
    #[error("index {index} out of range for filter list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("filter '{0}' is a section header and cannot be toggled")]
    DisabledNode(String),

    #[error("invalid page {0}: pages start at 1")]
    InvalidPage(u32),

    #[error("invalid page size '{0}': expected one of 10, 20, 50, 100")]
    InvalidPageSize(String),

    #[error("unknown query flag '{0}'")]
    UnknownFlag(String),

    #[error("invalid filter catalog: {0}")]
    InvalidCatalog(String),

    #[error("no filter with value '{0}'")]
    UnknownFilter(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("invalid sort '{0}': expected COLUMN or COLUMN:asc|desc")]
    InvalidSort(String),

    #[error("unknown export format '{0}': expected json or csv")]
    UnknownFormat(String),

    // External failures
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("engine has been torn down")]
    TornDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SiftError {
    /// True for errors caused by calling the engine incorrectly, as opposed
    /// to failures reported by an external collaborator.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            SiftError::IndexOutOfRange { .. }
                | SiftError::DisabledNode(_)
                | SiftError::InvalidPage(_)
                | SiftError::InvalidPageSize(_)
                | SiftError::UnknownFlag(_)
                | SiftError::UnknownColumn(_)
                | SiftError::UnknownFilter(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SiftError>;
