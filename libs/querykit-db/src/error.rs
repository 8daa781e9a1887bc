use thiserror::Error;

/// Rejected field policy definitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("column alias for unknown field: {0}")]
    UnknownAlias(String),
}

pub type PolicyResult<T> = Result<T, PolicyError>;

/// Failures at the execution boundary. These are surfaced to the caller, unlike
/// malformed input, which the compiler absorbs.
#[derive(Debug, Error, Clone)]
pub enum QueryError {
    #[error("column has no entity mapping: {0}")]
    UnmappedColumn(String),

    #[error("database error: {0}")]
    Db(String),
}

#[cfg(feature = "sea-orm")]
impl From<sea_orm::DbErr> for QueryError {
    fn from(e: sea_orm::DbErr) -> Self {
        QueryError::Db(e.to_string())
    }
}
