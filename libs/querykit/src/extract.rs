use std::convert::Infallible;
use std::ops::Deref;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use query_core::FilterExpression;
use serde_json::Value;

/// List parameters decoded from the request URI query string.
///
/// Extraction is total: malformed or hostile input yields the normalized
/// defaults rather than a rejection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery(pub FilterExpression);

impl ListQuery {
    #[inline]
    pub fn into_inner(self) -> FilterExpression {
        self.0
    }
}

impl Deref for ListQuery {
    type Target = FilterExpression;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<ListQuery> for FilterExpression {
    #[inline]
    fn from(x: ListQuery) -> Self {
        x.0
    }
}

impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    #[allow(clippy::manual_async_fn)]
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl core::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let raw = parts.uri.query().unwrap_or("");
            Ok(ListQuery(FilterExpression::from_query_string(raw)))
        }
    }
}

/// List parameters decoded from a JSON request body (structured map form).
///
/// An empty body falls back to the URI query string; an unreadable or
/// non-JSON body yields the defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListBody(pub FilterExpression);

impl ListBody {
    #[inline]
    pub fn into_inner(self) -> FilterExpression {
        self.0
    }
}

impl Deref for ListBody {
    type Target = FilterExpression;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequest<S> for ListBody
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    #[allow(clippy::manual_async_fn)]
    fn from_request(
        req: Request,
        state: &S,
    ) -> impl core::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let query = req.uri().query().unwrap_or("").to_owned();
            let bytes = match Bytes::from_request(req, state).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::debug!(error = %e, "list body unreadable, using defaults");
                    return Ok(ListBody(FilterExpression::default()));
                }
            };

            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(ListBody(FilterExpression::from_query_string(&query)));
            }

            let value = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|e| {
                tracing::debug!(error = %e, "list body is not JSON, using defaults");
                Value::Null
            });
            Ok(ListBody(FilterExpression::from_value(value)))
        }
    }
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod extract_tests;
