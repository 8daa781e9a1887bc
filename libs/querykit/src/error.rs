use axum::http::StatusCode;
use querykit_db::QueryError;

use crate::problem::{Problem, ProblemResponse};

/// Map execution-boundary failures to RFC 9457 Problem responses.
///
/// Both cases are server faults: malformed client input never reaches this
/// point because normalization and compilation absorb it.
pub fn query_error_to_problem(e: &QueryError, instance: &str) -> ProblemResponse {
    match e {
        QueryError::UnmappedColumn(column) => {
            tracing::error!(column = %column, "list policy references an unmapped column");
            Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "List Misconfigured",
                "The list endpoint is not configured correctly",
            )
            .with_code("UNMAPPED_COLUMN")
            .with_instance(instance)
            .into()
        }
        QueryError::Db(msg) => {
            tracing::error!(error = %msg, "list query failed");
            Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Database Error",
                "An internal database error occurred",
            )
            .with_code("DB_ERROR")
            .with_instance(instance)
            .into()
        }
    }
}

impl From<QueryError> for ProblemResponse {
    fn from(e: QueryError) -> Self {
        query_error_to_problem(&e, "")
    }
}
