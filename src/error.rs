//! Error types for dbkit.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Backend-native errors are kept as the `source()` of the variant that wraps them,
//! so callers can always reach the driver's own error and message.

use crate::config::{BackendKind, DEFAULT_ACQUIRE_TIMEOUT_SECS};
use thiserror::Error;

const POOL_ACQUIRE: &str = "connection pool acquire";

/// Boxed native cause carried by backend-facing variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Not connected: {backend} adapter is not connected")]
    NotConnected { backend: BackendKind },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Query failed: {message}")]
    Query {
        message: String,
        /// e.g., "42P01" for undefined table
        code: Option<String>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Execute failed: {message}")]
    Execute {
        message: String,
        code: Option<String>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("Unsupported operation: {operation} is not available on {backend}")]
    Unsupported {
        operation: String,
        backend: BackendKind,
    },

    #[error("Connection not found: {name}")]
    ConnectionNotFound { name: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a not-connected error.
    pub fn not_connected(backend: BackendKind) -> Self {
        Self::NotConnected { backend }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Wrap a driver error raised on the read path.
    pub fn query(err: sqlx::Error) -> Self {
        match classify_sqlx(err) {
            Classified::Statement {
                message,
                code,
                source,
            } => Self::Query {
                message,
                code,
                source: Some(source),
            },
            Classified::Other(err) => err,
        }
    }

    /// Wrap a driver error raised on the write path.
    pub fn execute(err: sqlx::Error) -> Self {
        match classify_sqlx(err) {
            Classified::Statement {
                message,
                code,
                source,
            } => Self::Execute {
                message,
                code,
                source: Some(source),
            },
            Classified::Other(err) => err,
        }
    }

    /// Create a transaction discipline error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>, backend: BackendKind) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            backend,
        }
    }

    /// Create a connection not found error.
    pub fn connection_not_found(name: impl Into<String>) -> Self {
        Self::ConnectionNotFound { name: name.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Report a pool-acquire timeout with the pool's configured limit.
    pub fn with_acquire_timeout(self, secs: u64) -> Self {
        match self {
            Self::Timeout { operation, .. } if operation == POOL_ACQUIRE => Self::Timeout {
                operation,
                elapsed_secs: secs,
            },
            other => other,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Backend error code (SQLSTATE or document-store code), if the backend supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Query { code, .. } | Self::Execute { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

enum Classified {
    Statement {
        message: String,
        code: Option<String>,
        source: BoxError,
    },
    Other(DbError),
}

/// Split sqlx errors into "the backend rejected the statement" and everything else.
fn classify_sqlx(err: sqlx::Error) -> Classified {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            let code = db_err.code().map(|c| c.to_string());
            Classified::Statement {
                message,
                code,
                source: Box::new(sqlx::Error::Database(db_err)),
            }
        }
        sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::RowNotFound => Classified::Statement {
            message: err.to_string(),
            code: None,
            source: Box::new(err),
        },
        other => Classified::Other(DbError::from(other)),
    }
}

/// Convert sqlx errors that are not tied to a statement to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection parameters and credentials",
            ),
            sqlx::Error::PoolTimedOut => {
                DbError::timeout(POOL_ACQUIRE, DEFAULT_ACQUIRE_TIMEOUT_SECS)
            }
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            err @ (sqlx::Error::Database(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::RowNotFound) => DbError::query(err),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Convert document-store driver errors to DbError.
///
/// Command failures become `Query` errors carrying the server's numeric code;
/// use [`DbError::execute_from_mongo`] on the write path.
impl From<mongodb::error::Error> for DbError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        let code = match err.kind.as_ref() {
            ErrorKind::Command(command) => Some(command.code.to_string()),
            _ => None,
        };
        if code.is_none() && is_mongo_connectivity(&err) {
            return DbError::connection(
                err.to_string(),
                "Check that the document store is reachable and the replica set is healthy",
            );
        }
        DbError::Query {
            message: err.to_string(),
            code,
            source: Some(Box::new(err)),
        }
    }
}

impl DbError {
    /// Wrap a document-store driver error raised on the write path.
    pub fn execute_from_mongo(err: mongodb::error::Error) -> Self {
        match DbError::from(err) {
            DbError::Query {
                message,
                code,
                source,
            } => DbError::Execute {
                message,
                code,
                source,
            },
            other => other,
        }
    }
}

fn is_mongo_connectivity(err: &mongodb::error::Error) -> bool {
    use mongodb::error::ErrorKind;

    matches!(
        err.kind.as_ref(),
        ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::Authentication { .. }
    )
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::connection("refused", "Check that the server is running");
        assert_eq!(err.suggestion(), Some("Check that the server is running"));
        assert_eq!(DbError::transaction("outside scope").suggestion(), None);
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::timeout("acquire", 30).is_retryable());
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(!DbError::transaction("closed mid-transaction").is_retryable());
    }

    #[test]
    fn test_not_connected_names_backend() {
        let err = DbError::not_connected(BackendKind::Sqlite);
        assert!(err.to_string().contains("sql-sqlite"));
    }

    #[test]
    fn test_unsupported_names_operation() {
        let err = DbError::unsupported("savepoints", BackendKind::Mongo);
        assert!(err.to_string().contains("savepoints"));
        assert!(err.to_string().contains("document-mongo"));
    }

    #[test]
    fn test_pool_closed_maps_to_connection() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::Connection { .. }));
    }

    #[test]
    fn test_row_not_found_maps_to_query_with_source() {
        let err = DbError::query(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::Query { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_execute_keeps_write_path() {
        let err = DbError::execute(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::Execute { .. }));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_pool_timeout_reports_configured_limit() {
        let err = DbError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(
            err,
            DbError::Timeout { elapsed_secs, .. } if elapsed_secs == DEFAULT_ACQUIRE_TIMEOUT_SECS
        ));
        let err = err.with_acquire_timeout(5);
        assert_eq!(err.to_string(), "Timeout: connection pool acquire exceeded 5s");

        let other = DbError::timeout("health check", 2).with_acquire_timeout(5);
        assert!(matches!(other, DbError::Timeout { elapsed_secs: 2, .. }));
    }
}
