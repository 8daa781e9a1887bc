//! Interpretation of loosely shaped JSON trees as filter values.
//!
//! Both the JSON `filters` blob and the bracket-notation parser produce a
//! `serde_json::Value` tree; this module is the single place that decides what
//! such a tree means.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::model::{FilterMap, FilterValue, Operand, Operator, OperatorFilter, Scalar};
use crate::qs::MAX_DEPTH;

pub(crate) fn scalar_from_json(v: &Value) -> Option<Scalar> {
    match v {
        Value::Bool(b) => Some(Scalar::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Scalar::Int(i)),
            None => n.as_f64().map(Scalar::Float),
        },
        Value::String(s) => Some(Scalar::Text(s.clone())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub(crate) fn scalar_to_json(s: &Scalar) -> Value {
    match s {
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Int(i) => Value::Number((*i).into()),
        Scalar::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(s.to_wire())),
        Scalar::Text(t) => Value::String(t.clone()),
    }
}

fn scalars_from_json(items: &[Value]) -> Vec<Scalar> {
    items.iter().filter_map(scalar_from_json).collect()
}

fn operand_from_json(v: &Value) -> Option<Operand> {
    match v {
        Value::Array(items) => {
            let list = scalars_from_json(items);
            (!list.is_empty()).then_some(Operand::List(list))
        }
        other => scalar_from_json(other).map(Operand::Scalar),
    }
}

fn operand_to_json(o: &Operand) -> Value {
    match o {
        Operand::Scalar(s) => scalar_to_json(s),
        Operand::List(items) => Value::Array(items.iter().map(scalar_to_json).collect()),
    }
}

/// `{"operator": "gte", "value": 10}`. Unknown operators degrade to equality.
fn explicit_operator(obj: &Map<String, Value>) -> Option<OperatorFilter> {
    let op = match obj.get("operator") {
        Some(Value::String(token)) => Operator::from_token(token).unwrap_or_else(|| {
            debug!(operator = %token, "unknown filter operator, treating as equality");
            Operator::Equals
        }),
        _ => Operator::Equals,
    };
    let value = obj.get("value").and_then(operand_from_json)?;
    Some(OperatorFilter { op, value })
}

fn value_from_json(v: &Value, depth: usize) -> Option<FilterValue> {
    match v {
        Value::Null => None,
        Value::Array(items) => {
            let explicit: Vec<OperatorFilter> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(obj) if obj.contains_key("operator") => explicit_operator(obj),
                    _ => None,
                })
                .collect();
            if !explicit.is_empty() {
                return Some(FilterValue::Operators(dedup_ops(explicit)));
            }
            let list = scalars_from_json(items);
            (!list.is_empty()).then_some(FilterValue::List(list))
        }
        Value::Object(obj) => {
            if obj.contains_key("operator") {
                return explicit_operator(obj).map(FilterValue::from);
            }
            if !obj.is_empty() && obj.keys().all(|k| Operator::from_token(k).is_some()) {
                let ops: Vec<OperatorFilter> = obj
                    .iter()
                    .filter_map(|(k, v)| {
                        let op = Operator::from_token(k)?;
                        operand_from_json(v).map(|value| OperatorFilter { op, value })
                    })
                    .collect();
                return (!ops.is_empty()).then(|| FilterValue::Operators(dedup_ops(ops)));
            }
            if depth > MAX_DEPTH {
                debug!(depth, "filter nesting too deep, dropping fragment");
                return None;
            }
            let nested = map_from_json(obj, depth + 1);
            (!nested.is_empty()).then_some(FilterValue::Nested(nested))
        }
        scalar => scalar_from_json(scalar).map(FilterValue::Scalar),
    }
}

/// Later conditions win over earlier ones with the same operator.
fn dedup_ops(ops: Vec<OperatorFilter>) -> Vec<OperatorFilter> {
    let mut out: Vec<OperatorFilter> = Vec::with_capacity(ops.len());
    for f in ops {
        match out.iter_mut().find(|existing| existing.op == f.op) {
            Some(existing) => *existing = f,
            None => out.push(f),
        }
    }
    out
}

fn map_from_json(obj: &Map<String, Value>, depth: usize) -> FilterMap {
    let mut map = FilterMap::new();
    for (field, raw) in obj {
        match value_from_json(raw, depth) {
            Some(value) => map.insert(field, value),
            None => debug!(field = %field, "dropping unusable filter value"),
        }
    }
    map
}

fn value_to_json(v: &FilterValue) -> Value {
    match v {
        FilterValue::Scalar(s) => scalar_to_json(s),
        FilterValue::List(items) => Value::Array(items.iter().map(scalar_to_json).collect()),
        FilterValue::Operators(ops) => Value::Object(
            ops.iter()
                .map(|f| (f.op.as_token().to_string(), operand_to_json(&f.value)))
                .collect(),
        ),
        FilterValue::Nested(map) => map.to_json(),
    }
}

impl FilterValue {
    pub fn from_json(v: &Value) -> Option<Self> {
        value_from_json(v, 0)
    }

    pub fn to_json(&self) -> Value {
        value_to_json(self)
    }
}

impl FilterMap {
    /// Anything other than a JSON object yields an empty map.
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Object(obj) => map_from_json(obj, 0),
            _ => FilterMap::new(),
        }
    }

    /// Canonical JSON shape; operator sets are written as `{"gte": 1, "lte": 5}`.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(k, v)| (k.to_string(), value_to_json(v)))
                .collect(),
        )
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        scalar_to_json(self).serialize(serializer)
    }
}

impl Serialize for FilterMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(FilterMap::from_json(&raw))
    }
}
