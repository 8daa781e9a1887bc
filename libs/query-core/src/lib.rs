//! Transport-agnostic list query model.
//!
//! A [`FilterExpression`] carries one request's pagination, sort, search and
//! filter intent. [`QueryBuilder`] and [`encode`] produce the canonical query
//! string; [`normalize`] reads any supported representation back. Compiling an
//! expression into database predicates lives in `querykit-db`.

mod encode;
mod error;
mod json;
pub mod model;
mod normalize;
mod page;
pub mod qs;

pub use encode::{encode, QueryBuilder};
pub use error::ParseError;
pub use model::{
    FilterExpression, FilterMap, FilterValue, Operand, Operator, OperatorFilter, Scalar,
    SortDirection, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT,
};
pub use normalize::{is_reserved, normalize, resolve_filters, RawQuery};
pub use page::{assemble, Page, PageMeta};

#[cfg(test)]
mod tests;
