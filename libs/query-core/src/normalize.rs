//! Server-side decoding of list queries.
//!
//! [`normalize`] is total: malformed fragments are dropped or defaulted and the
//! worst outcome is an unfiltered first page.

use std::convert::Infallible;
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ParseError;
use crate::model::{
    clamp_limit, clamp_page, FilterExpression, FilterValue, SortDirection, DEFAULT_LIMIT,
    DEFAULT_PAGE,
};
use crate::qs::{expand_structured, parse_pairs, parse_query_string};

pub const PAGE_KEY: &str = "page";
pub const LIMIT_KEY: &str = "limit";
pub const SORT_FIELD_KEYS: [&str; 2] = ["sortBy", "sortField"];
pub const SORT_DIRECTION_KEYS: [&str; 2] = ["sortOrder", "sortDirection"];
pub const SEARCH_KEYS: [&str; 2] = ["search", "searchTerm"];
pub const FILTERS_KEY: &str = "filters";

/// Keys that never name a filter field at the top level.
pub fn is_reserved(key: &str) -> bool {
    key == PAGE_KEY
        || key == LIMIT_KEY
        || key == FILTERS_KEY
        || SORT_FIELD_KEYS.contains(&key)
        || SORT_DIRECTION_KEYS.contains(&key)
        || SEARCH_KEYS.contains(&key)
}

/// The shapes a list query can arrive in.
#[derive(Clone, Debug)]
pub enum RawQuery<'a> {
    /// Percent-encoded query string, with or without the leading `?`.
    QueryString(&'a str),
    /// Already-decoded pairs; keys may still use bracket/dot notation.
    Pairs(Vec<(String, String)>),
    /// A typed key/value object, e.g. a JSON request body.
    Structured(Value),
}

impl<'a> From<&'a str> for RawQuery<'a> {
    fn from(v: &'a str) -> Self {
        RawQuery::QueryString(v)
    }
}

impl From<Vec<(String, String)>> for RawQuery<'_> {
    fn from(v: Vec<(String, String)>) -> Self {
        RawQuery::Pairs(v)
    }
}

impl From<Value> for RawQuery<'_> {
    fn from(v: Value) -> Self {
        RawQuery::Structured(v)
    }
}

impl From<Map<String, Value>> for RawQuery<'_> {
    fn from(v: Map<String, Value>) -> Self {
        RawQuery::Structured(Value::Object(v))
    }
}

type Attempt = fn(&Value) -> Result<Map<String, Value>, ParseError>;

/// Ordered parser attempts for the `filters` value; the first success wins.
const FILTER_ATTEMPTS: [(&str, Attempt); 3] = [
    ("structured", attempt_structured),
    ("json", attempt_json),
    ("bracket", attempt_bracket),
];

fn attempt_structured(v: &Value) -> Result<Map<String, Value>, ParseError> {
    match v {
        Value::Object(obj) => Ok(expand_structured(obj)),
        _ => Err(ParseError::NotAnObject),
    }
}

fn attempt_json(v: &Value) -> Result<Map<String, Value>, ParseError> {
    let Value::String(raw) = v else {
        return Err(ParseError::NotAString);
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(obj)) => Ok(expand_structured(&obj)),
        Ok(_) => Err(ParseError::NotAnObject),
        Err(e) => Err(ParseError::Json(e.to_string())),
    }
}

fn attempt_bracket(v: &Value) -> Result<Map<String, Value>, ParseError> {
    match v {
        Value::String(raw) => parse_query_string(raw),
        _ => Err(ParseError::NotAString),
    }
}

/// Resolve the `filters` value through the attempt chain, falling back to an empty map.
pub fn resolve_filters(v: &Value) -> Map<String, Value> {
    for (name, attempt) in FILTER_ATTEMPTS {
        match attempt(v) {
            Ok(tree) => {
                debug!(attempt = name, "filters decoded");
                return tree;
            }
            Err(e) => debug!(attempt = name, error = %e, "filters attempt failed"),
        }
    }
    debug!("filters unusable, continuing without them");
    Map::new()
}

fn read_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn read_text(v: &Value) -> Option<String> {
    let text = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn first_of<'t>(tree: &'t Map<String, Value>, keys: &[&str]) -> Option<&'t Value> {
    keys.iter().find_map(|k| tree.get(*k))
}

fn insert_filter(expr: &mut FilterExpression, field: &str, raw: &Value) {
    match FilterValue::from_json(raw) {
        Some(value) => expr.filters.insert(field, value),
        None => debug!(field = %field, "dropping unusable filter"),
    }
}

fn from_tree(tree: &Map<String, Value>) -> FilterExpression {
    let page = tree
        .get(PAGE_KEY)
        .and_then(read_int)
        .map(clamp_page)
        .unwrap_or(DEFAULT_PAGE);
    let limit = tree
        .get(LIMIT_KEY)
        .and_then(read_int)
        .map(clamp_limit)
        .unwrap_or(DEFAULT_LIMIT);
    let sort_field = first_of(tree, &SORT_FIELD_KEYS).and_then(read_text);
    let sort_direction = first_of(tree, &SORT_DIRECTION_KEYS)
        .and_then(read_text)
        .and_then(|t| SortDirection::from_token(&t))
        .unwrap_or_default();
    let search_term = first_of(tree, &SEARCH_KEYS).and_then(read_text);

    let mut expr = FilterExpression {
        page,
        limit,
        sort_field,
        sort_direction,
        search_term,
        ..FilterExpression::default()
    };

    for (field, raw) in tree.iter().filter(|(k, _)| !is_reserved(k)) {
        insert_filter(&mut expr, field, raw);
    }
    if let Some(blob) = tree.get(FILTERS_KEY) {
        for (field, raw) in &resolve_filters(blob) {
            insert_filter(&mut expr, field, raw);
        }
    }

    expr
}

/// Decode any supported representation into a [`FilterExpression`]. Never fails.
pub fn normalize<'a>(raw: impl Into<RawQuery<'a>>) -> FilterExpression {
    let tree = match raw.into() {
        RawQuery::QueryString(q) => parse_query_string(q),
        RawQuery::Pairs(pairs) => parse_pairs(pairs),
        RawQuery::Structured(Value::Object(obj)) => Ok(expand_structured(&obj)),
        RawQuery::Structured(_) => Err(ParseError::NotAnObject),
    }
    .unwrap_or_else(|e| {
        debug!(error = %e, "query unusable, using defaults");
        Map::new()
    });

    from_tree(&tree)
}

impl FilterExpression {
    pub fn from_query_string(query: &str) -> Self {
        normalize(RawQuery::QueryString(query))
    }

    pub fn from_value(value: Value) -> Self {
        normalize(RawQuery::Structured(value))
    }
}

impl FromStr for FilterExpression {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FilterExpression::from_query_string(s))
    }
}
