use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// `page < 1` becomes 1.
#[inline]
pub fn clamp_page(page: i64) -> u64 {
    if page < 1 {
        DEFAULT_PAGE
    } else {
        page as u64
    }
}

/// `limit < 1` falls back to the default, anything above the maximum is capped.
#[inline]
pub fn clamp_limit(limit: i64) -> u64 {
    if limit < 1 {
        DEFAULT_LIMIT
    } else {
        (limit as u64).min(MAX_LIMIT)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Ascending,
    #[default]
    #[serde(rename = "DESC")]
    Descending,
}

impl SortDirection {
    pub fn as_token(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }

    pub fn from_token(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Ascending),
            "desc" | "descending" => Some(SortDirection::Descending),
            _ => None,
        }
    }
}

/// A single untyped-on-the-wire value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Infer a typed scalar from a raw query-string value.
    ///
    /// Only canonical numeric spellings become numbers: the raw text must be
    /// exactly what `to_wire` would print back, so `1.50`, `1e3` and `-0` stay
    /// text and reach string columns unchanged. Integers that overflow `i64`
    /// stay text as well.
    pub fn infer(raw: &str) -> Self {
        match raw {
            "true" => return Scalar::Bool(true),
            "false" => return Scalar::Bool(false),
            _ => {}
        }
        let number = match classify_number(raw) {
            Some(NumberShape::Integer) => raw.parse::<i64>().ok().map(Scalar::Int),
            Some(NumberShape::Decimal) => raw
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Scalar::Float),
            None => None,
        };
        match number {
            Some(n) if n.to_wire() == raw => n,
            _ => Scalar::Text(raw.to_string()),
        }
    }

    /// Wire spelling; `Scalar::infer(&s.to_wire()) == s` for every non-text scalar.
    pub fn to_wire(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => ryu::Buffer::new().format(*f).to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Loose truthiness used by `exists`: `false`, `0` and `"false"`/`"0"` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Int(i) => *i != 0,
            Scalar::Float(f) => *f != 0.0,
            Scalar::Text(s) => !matches!(s.trim(), "" | "0" | "false"),
        }
    }
}

enum NumberShape {
    Integer,
    Decimal,
}

fn classify_number(raw: &str) -> Option<NumberShape> {
    let body = raw.strip_prefix('-').unwrap_or(raw);
    let (mantissa, exponent) = match body.find(|c| c == 'e' || c == 'E') {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || (int_part.len() > 1 && int_part.starts_with('0')) {
        return None;
    }
    if let Some(f) = frac_part {
        if !all_digits(f) {
            return None;
        }
    }
    if let Some(e) = exponent {
        if !all_digits(e.strip_prefix('-').unwrap_or(e)) {
            return None;
        }
    }

    if frac_part.is_none() && exponent.is_none() {
        Some(NumberShape::Integer)
    } else {
        Some(NumberShape::Decimal)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v.into())
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Like,
    In,
    Between,
    Not,
    Exists,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Equals,
        Operator::GreaterThan,
        Operator::GreaterOrEqual,
        Operator::LessThan,
        Operator::LessOrEqual,
        Operator::Like,
        Operator::In,
        Operator::Between,
        Operator::Not,
        Operator::Exists,
    ];

    /// Canonical wire token, as used in `field[token]=value`.
    pub fn as_token(self) -> &'static str {
        match self {
            Operator::Equals => "eq",
            Operator::GreaterThan => "gt",
            Operator::GreaterOrEqual => "gte",
            Operator::LessThan => "lt",
            Operator::LessOrEqual => "lte",
            Operator::Like => "like",
            Operator::In => "in",
            Operator::Between => "between",
            Operator::Not => "not",
            Operator::Exists => "exists",
        }
    }

    pub fn from_token(raw: &str) -> Option<Self> {
        Some(match raw.to_ascii_lowercase().as_str() {
            "eq" | "equals" => Operator::Equals,
            "gt" | "greaterthan" => Operator::GreaterThan,
            "gte" | "ge" | "greaterorequal" => Operator::GreaterOrEqual,
            "lt" | "lessthan" => Operator::LessThan,
            "lte" | "le" | "lessorequal" => Operator::LessOrEqual,
            "like" => Operator::Like,
            "in" => Operator::In,
            "between" => Operator::Between,
            "not" | "ne" => Operator::Not,
            "exists" => Operator::Exists,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl<T: Into<Scalar>> From<Vec<T>> for Operand {
    fn from(v: Vec<T>) -> Self {
        Operand::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Scalar>> From<(T, T)> for Operand {
    fn from((lo, hi): (T, T)) -> Self {
        Operand::List(vec![lo.into(), hi.into()])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OperatorFilter {
    pub op: Operator,
    pub value: Operand,
}

impl OperatorFilter {
    pub fn new(op: Operator, value: impl Into<Operand>) -> Self {
        Self {
            op,
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    /// Equality.
    Scalar(Scalar),
    /// Inclusion.
    List(Vec<Scalar>),
    /// One or more explicit comparisons on the same field, at most one per operator.
    Operators(Vec<OperatorFilter>),
    /// Relation-style nesting (`user[role]=admin`).
    Nested(FilterMap),
}

impl FilterValue {
    /// Values with no wire representation; they are never stored in a [`FilterMap`].
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Scalar(_) => false,
            FilterValue::List(items) => items.is_empty(),
            FilterValue::Operators(ops) => ops.is_empty(),
            FilterValue::Nested(map) => map.is_empty(),
        }
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        FilterValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<OperatorFilter> for FilterValue {
    fn from(v: OperatorFilter) -> Self {
        FilterValue::Operators(vec![v])
    }
}

impl From<FilterMap> for FilterValue {
    fn from(v: FilterMap) -> Self {
        FilterValue::Nested(v)
    }
}

macro_rules! scalar_conversions {
    ($($ty:ty),* $(,)?) => {$(
        impl From<$ty> for Operand {
            fn from(v: $ty) -> Self {
                Operand::Scalar(v.into())
            }
        }

        impl From<$ty> for FilterValue {
            fn from(v: $ty) -> Self {
                FilterValue::Scalar(v.into())
            }
        }
    )*};
}

scalar_conversions!(Scalar, &str, String, bool, i64, i32, f64);

/// Insertion-ordered mapping of field name to filter value.
///
/// Dotted names are split into nested maps on insertion, so `user.role` and
/// `user[role]` land in the same shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterMap {
    entries: Vec<(String, FilterValue)>,
}

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert or replace in place. Empty values are ignored.
    pub fn insert(&mut self, field: &str, value: FilterValue) {
        if value.is_empty() {
            return;
        }
        let mut segments = field.split('.').filter(|s| !s.is_empty());
        let Some(head) = segments.next() else {
            return;
        };
        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            self.put(head, value);
            return;
        }

        let child = self.nested_mut(head);
        child.insert(&rest.join("."), value);
    }

    /// Add an operator condition to `field`, replacing an existing condition with the same operator.
    pub fn push_op(&mut self, field: &str, filter: OperatorFilter) {
        let segments: Vec<&str> = field.split('.').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => {}
            [name] => self.push_op_flat(name, filter),
            [head, rest @ ..] => self.nested_mut(head).push_op(&rest.join("."), filter),
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<FilterValue> {
        let idx = self.entries.iter().position(|(k, _)| k == field)?;
        Some(self.entries.remove(idx).1)
    }

    fn push_op_flat(&mut self, field: &str, filter: OperatorFilter) {
        match self.entries.iter_mut().find(|(k, _)| k == field) {
            Some((_, FilterValue::Operators(ops))) => {
                match ops.iter_mut().find(|existing| existing.op == filter.op) {
                    Some(existing) => *existing = filter,
                    None => ops.push(filter),
                }
            }
            Some((_, other)) => *other = FilterValue::Operators(vec![filter]),
            None => self
                .entries
                .push((field.to_string(), FilterValue::Operators(vec![filter]))),
        }
    }

    fn put(&mut self, field: &str, value: FilterValue) {
        match self.entries.iter_mut().find(|(k, _)| k == field) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((field.to_string(), value)),
        }
    }

    fn nested_mut(&mut self, field: &str) -> &mut FilterMap {
        let idx = match self.entries.iter().position(|(k, _)| k == field) {
            Some(idx) => {
                if !matches!(self.entries[idx].1, FilterValue::Nested(_)) {
                    self.entries[idx].1 = FilterValue::Nested(FilterMap::new());
                }
                idx
            }
            None => {
                self.entries
                    .push((field.to_string(), FilterValue::Nested(FilterMap::new())));
                self.entries.len() - 1
            }
        };
        match &mut self.entries[idx].1 {
            FilterValue::Nested(map) => map,
            _ => unreachable!("slot was just set to a nested map"),
        }
    }
}

/// One request's pagination, sort, search and filter intent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterExpression {
    pub page: u64,
    pub limit: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_direction: SortDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(default)]
    pub filters: FilterMap,
}

impl Default for FilterExpression {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort_field: None,
            sort_direction: SortDirection::default(),
            search_term: None,
            filters: FilterMap::new(),
        }
    }
}

impl FilterExpression {
    /// Rows to skip for the requested page; clamps are re-applied so hand-built values are safe.
    pub fn skip(&self) -> u64 {
        (self.page.max(1) - 1).saturating_mul(self.effective_limit())
    }

    pub fn effective_limit(&self) -> u64 {
        clamp_limit(i64::try_from(self.limit).unwrap_or(i64::MAX))
    }
}
