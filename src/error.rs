//! # Error Handling
//!
//! Tagged error types for the listings import. Each failure category gets its
//! own variant so callers can branch on the cause instead of matching on
//! message text.

use serde::Serialize;
use thiserror::Error;

use crate::geocoding::GeocodingError;

/// Errors raised by the persistent store (building and unit repositories).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[source] sea_orm::DbErr),
}

fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const MYSQL_DUPLICATE_CODES: &[&str] = &["1022", "1062", "1169", "1586"];
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    match db_error.code() {
        Some(code) => {
            let code = code.as_ref();
            code == PG_UNIQUE
                || MYSQL_DUPLICATE_CODES.contains(&code)
                || SQLITE_DUPLICATE_CODES.contains(&code)
        }
        None => false,
    }
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return StoreError::Conflict(error.to_string());
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => StoreError::NotFound(record),
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                StoreError::Unavailable(connection_err.to_string())
            }
            sea_orm::DbErr::ConnectionAcquire(acquire_err) => {
                tracing::error!("Database connection acquire error: {:?}", acquire_err);
                StoreError::Unavailable(acquire_err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Category of an [`ImportError`], for programmatic handling and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportErrorKind {
    Io,
    Parse,
    InvalidField,
    Geocoding,
    Store,
    Timeout,
}

/// Errors surfaced by CSV parsing and the import reconciler.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The source file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV text is malformed (column count, quoting, missing header).
    #[error("{message}")]
    Parse { line: Option<u64>, message: String },

    /// A row parsed but one of its values is not of the expected type.
    #[error("invalid {field} '{value}' on line {line}: {reason}")]
    InvalidField {
        line: u64,
        field: &'static str,
        value: String,
        reason: String,
    },

    /// The geocoder failed or returned no coordinates for a new building.
    #[error("geocoding failed for '{address}': {source}")]
    Geocoding {
        address: String,
        #[source]
        source: GeocodingError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A geocoding or store call exceeded its configured bound.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl ImportError {
    pub fn kind(&self) -> ImportErrorKind {
        match self {
            ImportError::Io { .. } => ImportErrorKind::Io,
            ImportError::Parse { .. } => ImportErrorKind::Parse,
            ImportError::InvalidField { .. } => ImportErrorKind::InvalidField,
            ImportError::Geocoding { .. } => ImportErrorKind::Geocoding,
            ImportError::Store(_) => ImportErrorKind::Store,
            ImportError::Timeout { .. } => ImportErrorKind::Timeout,
        }
    }

    /// Line number in the source document, when the error is tied to one.
    pub fn line(&self) -> Option<u64> {
        match self {
            ImportError::Parse { line, .. } => *line,
            ImportError::InvalidField { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for ImportError {
    fn from(error: sea_orm::DbErr) -> Self {
        ImportError::Store(error.into())
    }
}
