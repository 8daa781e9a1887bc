//! Client-side construction and canonical encoding of list queries.

use std::borrow::Cow;

use crate::model::{
    clamp_limit, clamp_page, FilterExpression, FilterMap, FilterValue, Operand, Operator,
    OperatorFilter, SortDirection,
};
use crate::normalize::{
    is_reserved, FILTERS_KEY, LIMIT_KEY, PAGE_KEY, SEARCH_KEYS, SORT_DIRECTION_KEYS,
    SORT_FIELD_KEYS,
};

#[derive(Default)]
struct QueryWriter {
    out: String,
}

impl QueryWriter {
    /// `key` must already be escaped; `value` is escaped here.
    fn pair(&mut self, key: &str, value: &str) {
        if !self.out.is_empty() {
            self.out.push('&');
        }
        self.out.push_str(key);
        self.out.push('=');
        self.out.push_str(&urlencoding::encode(value));
    }

    fn finish(self) -> String {
        self.out
    }
}

fn escape_key(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

fn write_operand(w: &mut QueryWriter, key: &str, operand: &Operand) {
    match operand {
        Operand::Scalar(s) => w.pair(key, &s.to_wire()),
        Operand::List(items) => {
            let key = format!("{}[]", key);
            for s in items {
                w.pair(&key, &s.to_wire());
            }
        }
    }
}

fn write_value(w: &mut QueryWriter, key: &str, value: &FilterValue) {
    match value {
        FilterValue::Scalar(s) => w.pair(key, &s.to_wire()),
        FilterValue::List(items) => {
            let key = format!("{}[]", key);
            for s in items {
                w.pair(&key, &s.to_wire());
            }
        }
        FilterValue::Operators(ops) => {
            for f in ops {
                write_operand(w, &format!("{}[{}]", key, f.op.as_token()), &f.value);
            }
        }
        FilterValue::Nested(map) => {
            for (sub, v) in map.iter() {
                write_value(w, &format!("{}[{}]", key, escape_key(sub)), v);
            }
        }
    }
}

/// Canonical query string: `page`, `limit`, `sortBy`, `sortOrder`, `search`, then filters
/// in insertion order. Filters named like a reserved key go under `filters[...]`.
pub fn encode(expr: &FilterExpression) -> String {
    let mut w = QueryWriter::default();
    w.pair(PAGE_KEY, &expr.page.to_string());
    w.pair(LIMIT_KEY, &expr.limit.to_string());
    if let Some(field) = &expr.sort_field {
        w.pair(SORT_FIELD_KEYS[0], field);
    }
    w.pair(SORT_DIRECTION_KEYS[0], expr.sort_direction.as_token());
    if let Some(term) = &expr.search_term {
        w.pair(SEARCH_KEYS[0], term);
    }

    for (field, value) in expr.filters.iter() {
        let key = if is_reserved(field) {
            format!("{}[{}]", FILTERS_KEY, escape_key(field))
        } else {
            escape_key(field).into_owned()
        };
        write_value(&mut w, &key, value);
    }

    w.finish()
}

impl FilterExpression {
    pub fn to_query_string(&self) -> String {
        encode(self)
    }
}

/// Incremental builder for a [`FilterExpression`].
///
/// Out-of-range pagination is clamped rather than rejected, so building never fails.
#[derive(Clone, Debug, Default)]
pub struct QueryBuilder {
    expr: FilterExpression,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u64) -> Self {
        self.expr.page = clamp_page(i64::try_from(page).unwrap_or(i64::MAX));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.expr.limit = clamp_limit(i64::try_from(limit).unwrap_or(i64::MAX));
        self
    }

    pub fn sort(self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_by(field).sort_direction(direction)
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.expr.sort_field = (!field.trim().is_empty()).then(|| field.trim().to_string());
        self
    }

    pub fn sort_direction(mut self, direction: SortDirection) -> Self {
        self.expr.sort_direction = direction;
        self
    }

    /// Blank terms clear the search.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.expr.search_term = (!term.trim().is_empty()).then(|| term.trim().to_string());
        self
    }

    pub fn filter(mut self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.expr.filters.insert(field, value.into());
        self
    }

    /// Adds to any operators already set on `field`; the same operator twice keeps the last value.
    pub fn filter_op(mut self, field: &str, op: Operator, value: impl Into<Operand>) -> Self {
        self.expr
            .filters
            .push_op(field, OperatorFilter::new(op, value));
        self
    }

    pub fn filters(mut self, filters: FilterMap) -> Self {
        for (field, value) in filters.iter() {
            self.expr.filters.insert(field, value.clone());
        }
        self
    }

    pub fn without_filter(mut self, field: &str) -> Self {
        self.expr.filters.remove(field);
        self
    }

    pub fn build(self) -> FilterExpression {
        self.expr
    }

    pub fn to_query_string(&self) -> String {
        encode(&self.expr)
    }
}

impl From<FilterExpression> for QueryBuilder {
    fn from(expr: FilterExpression) -> Self {
        Self { expr }
    }
}
