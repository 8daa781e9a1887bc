//! List query compilation.
//!
//! A normalized [`query_core::FilterExpression`] plus a [`FieldPolicy`] compile
//! into a [`CompiledQuery`]: AND-combined predicates over policy columns,
//! named bound parameters, an ordering and a page window. The result can be
//! rendered as SQL text ([`CompiledQuery::to_sql`]) or, with the `sea-orm`
//! feature, applied to a `sea_orm::Select<E>`.

pub mod compile;
pub mod error;
pub mod params;
pub mod policy;
pub mod predicate;
#[cfg(feature = "sea-orm")]
pub mod sea;
pub mod sql;

pub use compile::{clamp_limit, compile, compile_with_limits, like_contains, CompiledQuery, LimitCfg};
pub use error::{PolicyError, PolicyResult, QueryError};
pub use params::{NamerKind, ParamNamer, RandomSuffixNamer, SequentialNamer};
pub use policy::{Column, FieldPolicy, FieldPolicyBuilder};
pub use predicate::{BoundParam, CompareOp, OrderKey, ParamValue, Predicate};
#[cfg(feature = "sea-orm")]
pub use sea::{paginate_list, FieldKind, FieldMap, ListQueryExt};
pub use sql::SqlFragment;
