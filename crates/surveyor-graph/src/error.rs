//! Centralized error types for the graph engine.
//!
//! Two classes of database failure exist: transient errors are retried with
//! bounded backoff by the executor; everything else propagates immediately.
//! Nothing in this crate catches an error and discards it.

use thiserror::Error;

use surveyor_model::SchemaError;

/// Main error type for graph engine operations.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("schema validation failed: {0}")]
    Schema(#[from] SchemaError),

    #[error("record for schema '{schema}' is not a JSON object")]
    InvalidRecord { schema: String },

    #[error("record for schema '{schema}' is missing field '{field}'")]
    MissingField { schema: String, field: String },

    #[error("fan-out field '{field}' on schema '{schema}' must hold a collection")]
    NotACollection { schema: String, field: String },

    #[error("run parameter '{name}' required by {context} was not supplied")]
    MissingRunParam { name: String, context: String },

    #[error(
        "refusing tenant-scoped cleanup of '{schema}': run parameter '{missing}' for the owning \
         relationship is absent; running without it would delete every tenant's stale data"
    )]
    UnscopedCleanup { schema: String, missing: String },

    /// Transient driver failure (connection reset, deadlock, transient
    /// server condition). The executor retries these; the rendered message
    /// is kept since the original error is consumed by the retry loop.
    #[error("transient database error: {0}")]
    TransientDatabase(String),

    /// Any other driver failure. Never retried.
    #[error("database error: {0}")]
    Database(#[source] neo4rs::Error),

    #[error("retry budget exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<GraphError>,
    },

    #[error("unexpected result shape: {context}")]
    BadResult { context: String },
}

impl GraphError {
    /// Whether the executor may retry the failed statement.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientDatabase(_))
    }

    /// Wrap a driver error, splitting it into the transient/fatal classes.
    pub fn from_driver(err: neo4rs::Error) -> Self {
        if is_transient_driver_error(&err) {
            Self::TransientDatabase(format!("{err:?}"))
        } else {
            Self::Database(err)
        }
    }
}

/// Classify a driver error as retryable.
///
/// Server-side conditions surface through the Bolt failure message with a
/// `Neo.TransientError.*` code (deadlocks, lock clients stopped, memory
/// pressure) or as availability errors; connection-level failures show up as
/// I/O errors from the pool. Matching on the rendered error keeps us
/// independent of driver enum details that have shifted between releases.
fn is_transient_driver_error(err: &neo4rs::Error) -> bool {
    const TRANSIENT_MARKERS: &[&str] = &[
        "Neo.TransientError",
        "ServiceUnavailable",
        "SessionExpired",
        "DeadlockDetected",
        "LockClientStopped",
        "OutOfMemoryError",
        "connection reset",
        "broken pipe",
        "Connection refused",
        "connection closed",
        "unexpected end of file",
        "timed out",
    ];
    let rendered = format!("{err:?}");
    TRANSIENT_MARKERS.iter().any(|m| rendered.contains(m))
}

/// Result type for graph engine operations.
pub type GraphResult<T> = Result<T, GraphError>;
