use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BenchError {
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Postgres error: {0}")]
    PostgresError(String),
    #[error("MongoDB error: {0}")]
    MongoError(String),
    #[error("{backend}: {op} failed: {message}")]
    BackendError {
        backend: String,
        op: String,
        message: String,
    },
    #[error("{backend}: expected {expected} records, got {actual}")]
    ReadCountMismatch {
        backend: String,
        expected: usize,
        actual: usize,
    },
    #[error("Cannot parse size: {0}")]
    SizeParseError(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl BenchError {
    /// Attach the backend name and operation to an adapter error.
    pub fn in_op(self, backend: &str, op: &str) -> BenchError {
        match self {
            err @ (BenchError::BackendError { .. } | BenchError::ReadCountMismatch { .. }) => err,
            other => BenchError::BackendError {
                backend: backend.to_string(),
                op: op.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<tokio_postgres::Error> for BenchError {
    fn from(err: tokio_postgres::Error) -> Self {
        BenchError::PostgresError(err.to_string())
    }
}

impl From<mongodb::error::Error> for BenchError {
    fn from(err: mongodb::error::Error) -> Self {
        BenchError::MongoError(err.to_string())
    }
}

impl From<config::ConfigError> for BenchError {
    fn from(err: config::ConfigError) -> Self {
        BenchError::ConfigParsingError(err.to_string())
    }
}
