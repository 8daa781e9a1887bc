//! Bracket / dot notation query-string parsing.
//!
//! `a[b][]=1&a.c=2` becomes `{"a": {"b": [1], "c": 2}}`. Leaf values are typed
//! with [`Scalar::infer`]. Depth, array length and pair count are bounded so a
//! hostile query string cannot blow up the tree.

use serde_json::{Map, Value};
use tracing::debug;
use url::form_urlencoded;

use crate::error::ParseError;
use crate::json::scalar_to_json;
use crate::model::Scalar;

/// Maximum number of nested segments below the root key.
pub const MAX_DEPTH: usize = 10;
/// Maximum number of elements in one array; further elements are dropped.
pub const MAX_ARRAY_LEN: usize = 100;
/// Maximum number of `key=value` pairs read from one query string.
pub const MAX_PAIRS: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    Key(String),
    Index(usize),
    Append,
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '$'
}

fn push_dotted(out: &mut Vec<Segment>, raw: &str) -> Option<()> {
    for part in raw.split('.') {
        if part.is_empty() || !part.chars().all(is_key_char) {
            return None;
        }
        out.push(Segment::Key(part.to_string()));
    }
    Some(())
}

/// Split `a.b[c][][3]` into segments. Returns `None` for malformed keys.
pub(crate) fn split_key(key: &str) -> Option<Vec<Segment>> {
    let (root, mut rest) = match key.find('[') {
        Some(i) => (&key[..i], &key[i..]),
        None => (key, ""),
    };

    let mut segments = Vec::new();
    push_dotted(&mut segments, root)?;

    while !rest.is_empty() {
        let inner_end = rest.strip_prefix('[')?.find(']')?;
        let inner = &rest[1..=inner_end];
        rest = &rest[inner_end + 2..];

        if inner.is_empty() {
            segments.push(Segment::Append);
        } else if inner.bytes().all(|b| b.is_ascii_digit()) {
            match inner.parse::<usize>() {
                Ok(i) if i < MAX_ARRAY_LEN => segments.push(Segment::Index(i)),
                _ => segments.push(Segment::Key(inner.to_string())),
            }
        } else {
            push_dotted(&mut segments, inner)?;
        }
    }

    if segments.len() > MAX_DEPTH + 1 {
        let overflow: String = segments[MAX_DEPTH + 1..]
            .iter()
            .map(|s| match s {
                Segment::Key(k) => format!("[{}]", k),
                Segment::Index(i) => format!("[{}]", i),
                Segment::Append => "[]".to_string(),
            })
            .collect();
        segments.truncate(MAX_DEPTH + 1);
        segments.push(Segment::Key(overflow));
    }

    Some(segments)
}

fn container_for(next: &Segment) -> Value {
    match next {
        Segment::Key(_) => Value::Object(Map::new()),
        Segment::Index(_) | Segment::Append => Value::Array(Vec::new()),
    }
}

fn as_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

fn as_array(node: &mut Value) -> &mut Vec<Value> {
    if !node.is_array() {
        *node = Value::Array(Vec::new());
    }
    match node {
        Value::Array(items) => items,
        _ => unreachable!("node was just replaced with an array"),
    }
}

/// Repeated leaves collect into a list and objects merge key by key; any
/// other shape conflict is won by the later writer.
fn merge_leaf(slot: &mut Value, leaf: Value) {
    match leaf {
        Value::Object(incoming) => {
            if let Value::Object(existing) = slot {
                for (k, v) in incoming {
                    match existing.get_mut(&k) {
                        Some(child) => merge_leaf(child, v),
                        None => {
                            existing.insert(k, v);
                        }
                    }
                }
            } else {
                *slot = Value::Object(incoming);
            }
        }
        Value::Array(_) => *slot = leaf,
        scalar => match slot {
            Value::Array(items) => {
                if items.len() < MAX_ARRAY_LEN {
                    items.push(scalar);
                } else {
                    debug!("array length bound reached, dropping element");
                }
            }
            Value::Object(_) | Value::Null => *slot = scalar,
            _ => {
                let first = std::mem::take(slot);
                *slot = Value::Array(vec![first, scalar]);
            }
        },
    }
}

pub(crate) fn insert_path(node: &mut Value, path: &[Segment], leaf: Value) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };

    match head {
        Segment::Key(key) => {
            let obj = as_object(node);
            match rest.first() {
                None => match obj.get_mut(key) {
                    Some(slot) => merge_leaf(slot, leaf),
                    None => {
                        obj.insert(key.clone(), leaf);
                    }
                },
                Some(next) => {
                    let child = obj.entry(key.clone()).or_insert_with(|| container_for(next));
                    insert_path(child, rest, leaf);
                }
            }
        }
        Segment::Append => {
            let items = as_array(node);
            if items.len() >= MAX_ARRAY_LEN {
                debug!("array length bound reached, dropping element");
                return;
            }
            match rest.first() {
                None => items.push(leaf),
                Some(next) => {
                    items.push(container_for(next));
                    if let Some(child) = items.last_mut() {
                        insert_path(child, rest, leaf);
                    }
                }
            }
        }
        Segment::Index(i) => {
            let items = as_array(node);
            if *i < items.len() {
                match rest.first() {
                    None => items[*i] = leaf,
                    Some(_) => insert_path(&mut items[*i], rest, leaf),
                }
                return;
            }
            // Sparse indices are compacted, as with `[]`.
            let mut shifted = Vec::with_capacity(path.len());
            shifted.push(Segment::Append);
            shifted.extend_from_slice(rest);
            insert_path(node, &shifted, leaf);
        }
    }
}

/// Parse already-decoded `key=value` pairs into an ordered tree.
///
/// Fails only when not a single pair was usable.
pub fn parse_pairs<I, K, V>(pairs: I) -> Result<Map<String, Value>, ParseError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut root = Value::Object(Map::new());
    let mut used = 0usize;

    for (key, value) in pairs.into_iter().take(MAX_PAIRS) {
        let key = key.as_ref();
        let Some(path) = split_key(key) else {
            debug!(key = %key, "skipping malformed query key");
            continue;
        };
        insert_path(&mut root, &path, scalar_to_json(&Scalar::infer(value.as_ref())));
        used += 1;
    }

    if used == 0 {
        return Err(ParseError::NoPairs);
    }
    match root {
        Value::Object(map) => Ok(map),
        _ => Err(ParseError::NotAnObject),
    }
}

/// Parse a raw (percent-encoded) query string. A leading `?` is ignored.
pub fn parse_query_string(query: &str) -> Result<Map<String, Value>, ParseError> {
    let query = query.strip_prefix('?').unwrap_or(query);
    parse_pairs(form_urlencoded::parse(query.as_bytes()))
}

/// Expand bracket/dot keys of an already-structured object (`{"price[gte]": 1}`).
/// Values are kept as given; they are not re-inferred.
pub(crate) fn expand_structured(obj: &Map<String, Value>) -> Map<String, Value> {
    let mut root = Value::Object(Map::new());
    for (key, value) in obj {
        match split_key(key) {
            Some(path) => insert_path(&mut root, &path, value.clone()),
            None => debug!(key = %key, "skipping malformed structured key"),
        }
    }
    match root {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
