// errors.rs
use crate::domain::schema::FieldError;
use crate::spreadsheets::import_csv::RowError;
use astra::Response;
use thiserror::Error;

/// Errors originating from either the request layer
/// (routing, auth, input) or downstream layers (validation, DB, CSV).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid buyer data")]
    Validation(Vec<FieldError>),

    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Missing required headers: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),

    #[error("Malformed CSV: {0}")]
    CsvFormat(String),

    #[error("No valid rows found in CSV")]
    NoValidRows(Vec<RowError>),

    #[error("Import aborted, no rows were saved: {0}")]
    Transaction(String),

    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(u64),

    #[error("Too many requests. Please try again later.")]
    TooManyRequests { retry_after: i64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database Error: {0}")]
    DbError(String),

    #[error("Internal Server Error")]
    InternalError,
}

// Type alias commonly used by route handlers.
pub type ResultResp = Result<Response, ServerError>;

impl ServerError {
    pub fn status(&self) -> u16 {
        match self {
            ServerError::Validation(_)
            | ServerError::BadRequest(_)
            | ServerError::MissingHeaders(_)
            | ServerError::CsvFormat(_)
            | ServerError::NoValidRows(_) => 400,
            ServerError::Unauthorized(_) => 401,
            ServerError::Forbidden(_) => 403,
            ServerError::NotFound => 404,
            ServerError::Conflict(_) => 409,
            ServerError::PayloadTooLarge(_) => 413,
            ServerError::TooManyRequests { .. } => 429,
            ServerError::Transaction(_)
            | ServerError::Config(_)
            | ServerError::DbError(_)
            | ServerError::InternalError => 500,
        }
    }
}

impl From<rusqlite::Error> for ServerError {
    fn from(e: rusqlite::Error) -> Self {
        ServerError::DbError(e.to_string())
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        tracing::error!("JSON encoding failed: {e}");
        ServerError::InternalError
    }
}
