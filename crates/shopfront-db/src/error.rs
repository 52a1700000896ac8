//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  PostgreSQL error (sqlx::Error, SQLSTATE code)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Categorized by SQLSTATE                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutError::Persistence ← Transaction already rolled back          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (in app) ← Logged in full, client gets a generic message     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (SQLSTATE 23505).
    ///
    /// ## When This Occurs
    /// - Two orders assigned the same order number
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// Foreign key constraint violation (SQLSTATE 23503).
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (SQLSTATE 23514).
    ///
    /// ## When This Occurs
    /// - A stock decrement would take `stock_quantity` below zero
    #[error("Check constraint violated: {constraint}")]
    CheckViolation { constraint: String },

    /// Waited longer than `lock_timeout` for a row lock (SQLSTATE 55P03).
    #[error("Timed out waiting for a row lock")]
    LockTimeout,

    /// Statement exceeded `statement_timeout` (SQLSTATE 57014).
    #[error("Statement timed out")]
    StatementTimeout,

    /// Serialization failure or deadlock (SQLSTATE 40001 / 40P01).
    #[error("Transaction aborted by the database: {0}")]
    SerializationFailure(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin / commit / rollback failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// True for errors caused by contention rather than a broken database.
    /// Resubmitting the checkout may succeed.
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            DbError::LockTimeout
                | DbError::StatementTimeout
                | DbError::SerializationFailure(_)
                | DbError::PoolExhausted
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → by SQLSTATE (23505, 23503, 23514, 55P03, 57014, 40001, 40P01)
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();

                match code.as_str() {
                    "23505" => DbError::UniqueViolation { constraint },
                    "23503" => DbError::ForeignKeyViolation { message: msg },
                    "23514" => DbError::CheckViolation { constraint },
                    "55P03" => DbError::LockTimeout,
                    "57014" => DbError::StatementTimeout,
                    "40001" | "40P01" => DbError::SerializationFailure(msg),
                    _ => DbError::QueryFailed(msg),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
