//! Error types for the bridge.
//!
//! Every failure a request can hit is a [`BridgeError`]. The gateway turns any of them
//! into the uniform error envelope, so the variants only matter for logging and for
//! the message text the caller sees.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The database could not be reached or refused the credentials.
    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// Missing or malformed request fields. Shown to the caller verbatim.
    #[error("{message}")]
    InvalidInput { message: String },

    /// The database rejected or failed a statement.
    #[error("Query failed: {message}")]
    Query {
        message: String,
        /// ClickHouse exception code, e.g. 60 for UNKNOWN_TABLE
        code: Option<u32>,
    },

    #[error("Export failed: {message}")]
    Export { message: String },

    #[error("Import failed: {message}")]
    Import { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BridgeError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a query error, extracting the ClickHouse exception code when present.
    pub fn query(message: impl Into<String>) -> Self {
        let message = message.into();
        let code = exception_code(&message);
        Self::Query { message, code }
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::Import {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short category name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::InvalidInput { .. } => "validation",
            Self::Query { .. } => "query",
            Self::Export { .. } => "export",
            Self::Import { .. } => "import",
            Self::Internal { .. } => "internal",
        }
    }

    /// ClickHouse exception code for query errors.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Query { code, .. } => *code,
            _ => None,
        }
    }
}

/// Parse the numeric code out of a ClickHouse error body ("Code: 60. DB::Exception: ...").
fn exception_code(message: &str) -> Option<u32> {
    let rest = message.trim_start().strip_prefix("Code:")?;
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Transport-level failures talking to the database are connection errors.
impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            BridgeError::invalid_input(format!("Invalid connection settings: {}", err))
        } else if err.is_timeout() {
            BridgeError::connection(format!("timed out: {}", err))
        } else {
            BridgeError::connection(err.to_string())
        }
    }
}

/// CSV writer failures. Reader failures are mapped to import errors where they occur.
impl From<csv::Error> for BridgeError {
    fn from(err: csv::Error) -> Self {
        BridgeError::export(err.to_string())
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for BridgeError {
    fn from(err: tokio::task::JoinError) -> Self {
        BridgeError::internal(format!("Background task failed: {}", err))
    }
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Every error becomes `{"status": "error", "message": ...}` with HTTP 400.
impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        warn!(kind = self.kind(), code = ?self.code(), error = %self, "Request failed");
        let body = serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
