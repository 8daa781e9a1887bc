//! FilterExpression + FieldPolicy -> predicates, ordering and page window.
//!
//! Compilation never fails. A filter on a field the policy does not allow, or
//! an operator payload of the wrong shape, is dropped on its own and logged at
//! `debug`; the remaining filters still apply.

use query_core::{
    FilterExpression, FilterValue, Operand, Operator, OperatorFilter, Scalar, DEFAULT_LIMIT,
    MAX_LIMIT,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::params::ParamNamer;
use crate::policy::{Column, FieldPolicy};
use crate::predicate::{BoundParam, CompareOp, OrderKey, ParamValue, Predicate};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitCfg {
    pub default: u64,
    pub max: u64,
}

impl Default for LimitCfg {
    fn default() -> Self {
        Self {
            default: DEFAULT_LIMIT,
            max: MAX_LIMIT,
        }
    }
}

/// `0` falls back to the default, anything above `max` is capped.
pub fn clamp_limit(requested: u64, cfg: LimitCfg) -> u64 {
    let max = cfg.max.max(1);
    match requested {
        0 => cfg.default.clamp(1, max),
        l => l.min(max),
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompiledQuery {
    pub predicates: Vec<Predicate>,
    pub order: Vec<OrderKey>,
    pub skip: u64,
    pub take: u64,
}

impl CompiledQuery {
    pub fn params(&self) -> impl Iterator<Item = &BoundParam> {
        self.predicates.iter().flat_map(Predicate::params)
    }
}

fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

/// `%term%` with LIKE metacharacters escaped by `\`.
///
/// Only ASCII letters are folded. The column side is wrapped in SQL `LOWER`,
/// which leaves non-ASCII characters untouched on SQLite, so folding them here
/// would make the pattern unmatchable.
pub fn like_contains(s: &str) -> String {
    format!("%{}%", like_escape(&s.to_ascii_lowercase()))
}

struct Compiler<'a> {
    namer: &'a mut dyn ParamNamer,
    out: Vec<Predicate>,
}

impl Compiler<'_> {
    fn bind(&mut self, base: &[&str], value: ParamValue) -> BoundParam {
        BoundParam {
            name: self.namer.name(&base.join("_")),
            value,
        }
    }

    fn search(&mut self, term: &str, policy: &FieldPolicy) {
        let pattern = like_contains(term);
        let mut any = Vec::new();
        for (field, column) in policy.search_columns() {
            let param = self.bind(
                &["search", field],
                ParamValue::Scalar(Scalar::Text(pattern.clone())),
            );
            any.push(Predicate::Like {
                column: column.clone(),
                param,
            });
        }
        if !any.is_empty() {
            self.out.push(Predicate::AnyOf(any));
        }
    }

    fn filter(&mut self, column: &Column, path: &mut Vec<String>, value: &FilterValue) {
        match value {
            FilterValue::Scalar(s) => self.compare(column, path, "eq", CompareOp::Eq, s.clone()),
            FilterValue::List(items) => self.in_list(column, path, "in", items.clone(), false),
            FilterValue::Operators(ops) => {
                for f in ops {
                    self.operator(column, path, f);
                }
            }
            // Nested keys only scope parameter names; the column stays the parent's.
            FilterValue::Nested(map) => {
                for (key, inner) in map.iter() {
                    path.push(key.to_string());
                    self.filter(column, path, inner);
                    path.pop();
                }
            }
        }
    }

    fn compare(&mut self, column: &Column, path: &[String], token: &str, op: CompareOp, v: Scalar) {
        let param = self.bind(&base(path, token), ParamValue::Scalar(v));
        self.out.push(Predicate::Compare {
            column: column.clone(),
            op,
            param,
        });
    }

    fn in_list(
        &mut self,
        column: &Column,
        path: &[String],
        token: &str,
        items: Vec<Scalar>,
        negated: bool,
    ) {
        if items.is_empty() {
            debug!(column = %column, "empty list, skipping filter");
            return;
        }
        let param = self.bind(&base(path, token), ParamValue::List(items));
        self.out.push(Predicate::InList {
            column: column.clone(),
            param,
            negated,
        });
    }

    fn operator(&mut self, column: &Column, path: &[String], f: &OperatorFilter) {
        let token = f.op.as_token();
        match (f.op, &f.value) {
            (Operator::Equals, Operand::Scalar(s)) => {
                self.compare(column, path, token, CompareOp::Eq, s.clone())
            }
            (Operator::Equals | Operator::In, Operand::List(items)) => {
                self.in_list(column, path, token, items.clone(), false)
            }
            (Operator::GreaterThan, Operand::Scalar(s)) => {
                self.compare(column, path, token, CompareOp::Gt, s.clone())
            }
            (Operator::GreaterOrEqual, Operand::Scalar(s)) => {
                self.compare(column, path, token, CompareOp::Gte, s.clone())
            }
            (Operator::LessThan, Operand::Scalar(s)) => {
                self.compare(column, path, token, CompareOp::Lt, s.clone())
            }
            (Operator::LessOrEqual, Operand::Scalar(s)) => {
                self.compare(column, path, token, CompareOp::Lte, s.clone())
            }
            (Operator::Like, Operand::Scalar(s)) => {
                let pattern = like_contains(&s.to_wire());
                let param = self.bind(
                    &base(path, token),
                    ParamValue::Scalar(Scalar::Text(pattern)),
                );
                self.out.push(Predicate::Like {
                    column: column.clone(),
                    param,
                });
            }
            (Operator::In, Operand::Scalar(s)) => {
                self.in_list(column, path, token, vec![s.clone()], false)
            }
            (Operator::Between, Operand::List(items)) if items.len() == 2 => {
                let names = base(path, token);
                let low = self.bind(&names, ParamValue::Scalar(items[0].clone()));
                let high = self.bind(&names, ParamValue::Scalar(items[1].clone()));
                self.out.push(Predicate::Between {
                    column: column.clone(),
                    low,
                    high,
                });
            }
            (Operator::Not, Operand::Scalar(s)) => {
                self.compare(column, path, token, CompareOp::Ne, s.clone())
            }
            (Operator::Not, Operand::List(items)) => {
                self.in_list(column, path, token, items.clone(), true)
            }
            (Operator::Exists, Operand::Scalar(s)) => self.out.push(Predicate::Null {
                column: column.clone(),
                negated: s.is_truthy(),
            }),
            (op, value) => {
                debug!(column = %column, operator = op.as_token(), ?value, "malformed operator payload, skipping");
            }
        }
    }
}

fn base<'p>(path: &'p [String], token: &'p str) -> Vec<&'p str> {
    path.iter().map(String::as_str).chain([token]).collect()
}

fn order_for(expr: &FilterExpression, policy: &FieldPolicy) -> Vec<OrderKey> {
    let requested = expr
        .sort_field
        .as_deref()
        .and_then(|f| policy.sort_column(f).map(|c| (f, c)));
    let primary = match requested {
        Some((_, column)) => Some(column),
        None => {
            if let Some(field) = &expr.sort_field {
                debug!(field = %field, "sort field not allowed, using default");
            }
            policy.default_sort().map(|(_, column)| column)
        }
    };

    let mut order = Vec::with_capacity(2);
    if let Some(column) = primary {
        order.push(OrderKey {
            column: column.clone(),
            direction: expr.sort_direction,
        });
    }
    if let Some((column, direction)) = policy.tiebreaker() {
        if primary != Some(column) {
            order.push(OrderKey {
                column: column.clone(),
                direction,
            });
        }
    }
    order
}

/// Compile with the default limit window.
pub fn compile(
    expr: &FilterExpression,
    policy: &FieldPolicy,
    namer: &mut dyn ParamNamer,
) -> CompiledQuery {
    compile_with_limits(expr, policy, LimitCfg::default(), namer)
}

pub fn compile_with_limits(
    expr: &FilterExpression,
    policy: &FieldPolicy,
    limits: LimitCfg,
    namer: &mut dyn ParamNamer,
) -> CompiledQuery {
    let mut c = Compiler {
        namer,
        out: Vec::new(),
    };

    if let Some(term) = expr.search_term.as_deref().map(str::trim) {
        if !term.is_empty() {
            c.search(term, policy);
        }
    }

    for (field, value) in expr.filters.iter() {
        match policy.filter_column(field) {
            Some(column) => c.filter(column, &mut vec![field.to_string()], value),
            None => debug!(field = %field, "filter on field not in policy, dropping"),
        }
    }

    let take = clamp_limit(expr.limit, limits);
    let skip = (expr.page.max(1) - 1).saturating_mul(take);
    let compiled = CompiledQuery {
        predicates: c.out,
        order: order_for(expr, policy),
        skip,
        take,
    };
    trace!(predicates = compiled.predicates.len(), skip, take, "compiled list query");
    compiled
}
