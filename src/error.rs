use thiserror::Error;

/// Errors surfaced by the connection layer.
///
/// Every variant carries the human-readable message of the failure, usually
/// the native engine text. Callers branch on the variant; no numeric engine
/// codes are part of the contract (see [`SqlConnection::last_error`] for
/// diagnostics).
///
/// [`SqlConnection::last_error`]: crate::SqlConnection::last_error
#[derive(Debug, Error)]
pub enum DbError {
    /// The database file cannot be opened or reached, or the handle is no
    /// longer valid for the requested operation.
    #[error("Connection broken: {0}")]
    ConnectionBroken(String),

    /// SQL text is empty or fails to compile.
    #[error("SQL syntax error: {0}")]
    SyntaxError(String),

    /// Out-of-range bind/column index, or a value the requested type cannot
    /// represent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Engine-reported failure while executing: constraint violation,
    /// busy/locked database, disk error.
    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    /// API misuse against the documented contract, e.g. double-beginning a
    /// transaction or stepping an exhausted command.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience alias for results with [`DbError`].
pub type DbResult<T> = Result<T, DbError>;
