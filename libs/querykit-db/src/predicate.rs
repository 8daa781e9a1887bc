use query_core::{Scalar, SortDirection};
use serde::Serialize;

use crate::policy::Column;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoundParam {
    pub name: String,
    pub value: ParamValue,
}

/// One atomic condition. All predicates of a compiled query are AND-combined.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Compare {
        column: Column,
        op: CompareOp,
        param: BoundParam,
    },
    InList {
        column: Column,
        param: BoundParam,
        negated: bool,
    },
    /// Case-insensitive; the bound pattern is already lower-cased and escaped.
    Like { column: Column, param: BoundParam },
    /// Inclusive on both ends.
    Between {
        column: Column,
        low: BoundParam,
        high: BoundParam,
    },
    /// `IS NULL`, or `IS NOT NULL` when negated.
    Null { column: Column, negated: bool },
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    /// Parameters bound by this predicate, depth first.
    pub fn params(&self) -> Vec<&BoundParam> {
        let mut out = Vec::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params<'a>(&'a self, out: &mut Vec<&'a BoundParam>) {
        match self {
            Predicate::Compare { param, .. }
            | Predicate::InList { param, .. }
            | Predicate::Like { param, .. } => out.push(param),
            Predicate::Between { low, high, .. } => {
                out.push(low);
                out.push(high);
            }
            Predicate::Null { .. } => {}
            Predicate::AnyOf(items) => items.iter().for_each(|p| p.collect_params(out)),
        }
    }

    /// Columns referenced by this predicate, depth first.
    pub fn columns(&self) -> Vec<&Column> {
        match self {
            Predicate::Compare { column, .. }
            | Predicate::InList { column, .. }
            | Predicate::Like { column, .. }
            | Predicate::Between { column, .. }
            | Predicate::Null { column, .. } => vec![column],
            Predicate::AnyOf(items) => items.iter().flat_map(Predicate::columns).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderKey {
    pub column: Column,
    pub direction: SortDirection,
}
