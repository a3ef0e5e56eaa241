use std::fmt;

/// Classified database failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatabaseErrorKind {
    #[error("Database connection pool exhausted. Please try again.")]
    PoolExhausted,

    #[error("Database connection timed out. Please try again.")]
    ConnectionTimeout,

    #[error("{entity} with ID '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("A record with {column} '{value}' already exists")]
    UniqueConstraintViolation { column: String, value: String },

    #[error("Cannot perform operation: referenced {column} in {table} does not exist")]
    ForeignKeyViolation { table: String, column: String },

    #[error("Database query failed: {message}")]
    QueryError { message: String },

    #[error("Transaction failed: {message}")]
    TransactionError { message: String },

    #[error("Database connection error: {message}")]
    ConnectionError { message: String },

    /// A conditional update found the row in a different status than
    /// expected. Another caller won the race.
    #[error("Payment '{id}' is no longer in status '{expected}'")]
    StatusConflict { id: String, expected: String },

    #[error("Database configuration error: {message}")]
    ConfigError { message: String },

    #[error("Unknown database error: {message}")]
    Unknown { message: String },
}

#[derive(Debug, Clone)]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    pub context: Option<String>,
    pub is_retryable: bool,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        let is_retryable = matches!(
            kind,
            DatabaseErrorKind::ConnectionTimeout
                | DatabaseErrorKind::PoolExhausted
                | DatabaseErrorKind::ConnectionError { .. }
        );

        Self {
            kind,
            context: None,
            is_retryable,
        }
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_status_conflict(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::StatusConflict { .. })
    }

    /// Map a SQLx error to a classified kind.
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::new(DatabaseErrorKind::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            }),
            sqlx::Error::PoolTimedOut => Self::new(DatabaseErrorKind::PoolExhausted),
            sqlx::Error::PoolClosed => Self::new(DatabaseErrorKind::ConnectionError {
                message: "Connection pool is closed".to_string(),
            }),
            sqlx::Error::Configuration(msg) => Self::new(DatabaseErrorKind::ConfigError {
                message: msg.to_string(),
            }),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code();
                match code.as_deref() {
                    // Postgres unique constraint violation
                    Some("23505") => Self::new(DatabaseErrorKind::UniqueConstraintViolation {
                        column: db_err.constraint().unwrap_or("unknown").to_string(),
                        value: "provided value".to_string(),
                    }),
                    // Postgres foreign key violation
                    Some("23503") => Self::new(DatabaseErrorKind::ForeignKeyViolation {
                        table: db_err.table().unwrap_or("unknown").to_string(),
                        column: db_err.constraint().unwrap_or("unknown").to_string(),
                    }),
                    _ => Self::new(DatabaseErrorKind::QueryError {
                        message: db_err.message().to_string(),
                    }),
                }
            }
            sqlx::Error::Io(io_err) => Self::new(DatabaseErrorKind::ConnectionError {
                message: io_err.to_string(),
            }),
            _ => Self::new(DatabaseErrorKind::Unknown {
                message: error.to_string(),
            }),
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{} ({})", self.kind, context)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl std::error::Error for DatabaseError {}

impl PartialEq for DatabaseError {
    fn eq(&self, other: &Self) -> bool {
        // Kind-level comparison, used by tests
        format!("{:?}", self.kind) == format!("{:?}", other.kind)
    }
}
