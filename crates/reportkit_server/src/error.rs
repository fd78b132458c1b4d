//! Error types for the export service.
//!
//! `ExportError` covers one request; `ServerError` covers start-up. Every
//! `ExportError` renders as `{"error": <message>}`. Export failures of any
//! kind are 500; only download lookups answer 404.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reportkit_flatten::FlattenError;
use thiserror::Error;
use tracing::{error, warn};

/// Per-request export/download errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// Body or `schema`/`data` field is not decodable JSON, or a field is missing
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Schema or data shape does not fit a single-table report
    #[error("{0}")]
    Flatten(#[from] FlattenError),

    /// Workbook could not be written
    #[error("Spreadsheet write failed: {0}")]
    Serialization(String),

    /// I/O error outside the workbook writer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking export task panicked or was cancelled
    #[error("Export task failed: {0}")]
    Task(String),

    /// Requested download does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Requested download name is not a plain file name
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}

impl ExportError {
    /// HTTP status for this error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            ExportError::FileNotFound(_) | ExportError::InvalidFileName(_) => {
                StatusCode::NOT_FOUND
            }
            ExportError::MalformedInput(_)
            | ExportError::Flatten(_)
            | ExportError::Serialization(_)
            | ExportError::Io(_)
            | ExportError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(%status, "{message}");
        } else {
            warn!(%status, "{message}");
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Result type alias for ExportError
pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Start-up errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Listener or output directory I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
