use thiserror::Error;

/// Errors surfaced by the spreadsheet access layer.
///
/// Transport failures from the remote service are passed through as-is;
/// nothing here is retried.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Credentials were missing, malformed, or rejected by the token endpoint.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The workbook URL or key does not resolve to a document.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// A worksheet selector or cell reference did not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// A value or style outside its accepted domain.
    #[error("invalid value: {0}")]
    Validation(String),

    /// Coordinates outside the worksheet's bounds.
    #[error("{label} is outside the worksheet bounds ({rows} rows x {cols} columns)")]
    Range { label: String, rows: u32, cols: u32 },

    /// Credential input matched none of the accepted forms.
    #[error("invalid credential input: {0}")]
    Input(String),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[cfg(feature = "google")]
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SheetError>;
