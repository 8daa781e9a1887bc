use thiserror::Error;

/// Why one parser attempt could not produce a filter tree.
///
/// These never reach callers of [`crate::normalize`]; they drive the fallback
/// chain and end up in `debug` logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected a string")]
    NotAString,

    #[error("expected an object")]
    NotAnObject,

    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("no usable key/value pairs")]
    NoPairs,
}
