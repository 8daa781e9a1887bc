//! HTTP surface for list endpoints.
//!
//! [`ListQuery`] and [`ListBody`] turn a request into a normalized
//! [`query_core::FilterExpression`] and never reject. Failures at the
//! execution boundary map to RFC 9457 problems via [`query_error_to_problem`].

pub mod error;
pub mod extract;
pub mod problem;

pub use error::query_error_to_problem;
pub use extract::{ListBody, ListQuery};
pub use problem::{Problem, ProblemResponse, APPLICATION_PROBLEM_JSON};

pub use query_core::{FilterExpression, Page, PageMeta};
