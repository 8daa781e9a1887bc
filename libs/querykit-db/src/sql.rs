//! Plain SQL text rendering of a compiled query with `:name` placeholders.
//!
//! Useful for engines reached through a raw named-parameter API and for
//! inspecting what a request compiles to. Identifiers are double-quoted; list
//! parameters are rendered as a single `(:name)` placeholder and are expected
//! to be expanded by the binding layer.

use std::collections::BTreeMap;

use query_core::SortDirection;
use serde::Serialize;

use crate::compile::CompiledQuery;
use crate::policy::Column;
use crate::predicate::{ParamValue, Predicate};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SqlFragment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    pub limit: u64,
    pub offset: u64,
    pub params: BTreeMap<String, ParamValue>,
}

fn quote(column: &Column) -> String {
    format!("\"{}\"", column.as_str().replace('"', "\"\""))
}

fn render(p: &Predicate) -> Option<String> {
    Some(match p {
        Predicate::Compare { column, op, param } => {
            format!("{} {} :{}", quote(column), op.as_sql(), param.name)
        }
        Predicate::InList {
            column,
            param,
            negated,
        } => format!(
            "{} {} (:{})",
            quote(column),
            if *negated { "NOT IN" } else { "IN" },
            param.name
        ),
        Predicate::Like { column, param } => {
            format!("LOWER({}) LIKE :{} ESCAPE '\\'", quote(column), param.name)
        }
        Predicate::Between { column, low, high } => {
            format!("{} BETWEEN :{} AND :{}", quote(column), low.name, high.name)
        }
        Predicate::Null { column, negated } => format!(
            "{} IS {}NULL",
            quote(column),
            if *negated { "NOT " } else { "" }
        ),
        Predicate::AnyOf(items) => {
            let parts: Vec<String> = items.iter().filter_map(render).collect();
            if parts.is_empty() {
                return None;
            }
            format!("({})", parts.join(" OR "))
        }
    })
}

impl CompiledQuery {
    pub fn to_sql(&self) -> SqlFragment {
        let clauses: Vec<String> = self.predicates.iter().filter_map(render).collect();
        let order: Vec<String> = self
            .order
            .iter()
            .map(|k| {
                let dir = match k.direction {
                    SortDirection::Ascending => "ASC",
                    SortDirection::Descending => "DESC",
                };
                format!("{} {}", quote(&k.column), dir)
            })
            .collect();

        SqlFragment {
            where_clause: (!clauses.is_empty()).then(|| clauses.join(" AND ")),
            order_by: (!order.is_empty()).then(|| order.join(", ")),
            limit: self.take,
            offset: self.skip,
            params: self
                .params()
                .map(|p| (p.name.clone(), p.value.clone()))
                .collect(),
        }
    }
}
