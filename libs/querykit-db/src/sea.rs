//! CompiledQuery -> sea_orm::Select<E>, plus the one-shot `paginate_list` combiner.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use query_core::{FilterExpression, Page, Scalar, SortDirection};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, Order},
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::debug;

use crate::compile::{compile_with_limits, CompiledQuery, LimitCfg};
use crate::error::QueryError;
use crate::params::ParamNamer;
use crate::policy::{Column, FieldPolicy};
use crate::predicate::{CompareOp, ParamValue, Predicate};

/// Whitelisted field kind; used to coerce a [`Scalar`] into a `sea_orm::Value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    I64,
    F64,
    Bool,
    Uuid,
    DateTimeUtc,
    Date,
}

#[derive(Clone)]
pub struct Field<E: EntityTrait> {
    pub col: E::Column,
    pub kind: FieldKind,
}

/// Policy column name -> entity column.
#[derive(Clone)]
pub struct FieldMap<E: EntityTrait> {
    map: HashMap<String, Field<E>>,
}

impl<E: EntityTrait> Default for FieldMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> FieldMap<E> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn insert(mut self, column: impl Into<String>, col: E::Column, kind: FieldKind) -> Self {
        self.map.insert(column.into(), Field { col, kind });
        self
    }

    pub fn get(&self, column: &str) -> Option<&Field<E>> {
        self.map.get(column)
    }

    fn resolve(&self, column: &Column) -> Result<&Field<E>, QueryError> {
        self.get(column.as_str())
            .ok_or_else(|| QueryError::UnmappedColumn(column.to_string()))
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    s.parse::<NaiveDate>()
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `None` when the scalar cannot represent a value of `kind`.
pub fn coerce(kind: FieldKind, v: &Scalar) -> Option<sea_orm::Value> {
    use sea_orm::Value as V;
    Some(match (kind, v) {
        (FieldKind::String, s) => V::String(Some(Box::new(s.to_wire()))),

        (FieldKind::I64, Scalar::Int(i)) => V::BigInt(Some(*i)),
        (FieldKind::I64, Scalar::Text(s)) => V::BigInt(Some(s.trim().parse().ok()?)),

        (FieldKind::F64, Scalar::Int(i)) => V::Double(Some(*i as f64)),
        (FieldKind::F64, Scalar::Float(f)) => V::Double(Some(*f)),
        (FieldKind::F64, Scalar::Text(s)) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => V::Double(Some(f)),
            _ => return None,
        },

        (FieldKind::Bool, Scalar::Bool(b)) => V::Bool(Some(*b)),
        (FieldKind::Bool, Scalar::Int(i @ (0 | 1))) => V::Bool(Some(*i == 1)),
        (FieldKind::Bool, Scalar::Text(s)) => V::Bool(Some(s.trim().parse().ok()?)),

        (FieldKind::Uuid, Scalar::Text(s)) => {
            V::Uuid(Some(Box::new(s.trim().parse::<uuid::Uuid>().ok()?)))
        }

        (FieldKind::DateTimeUtc, Scalar::Text(s)) => {
            V::ChronoDateTimeUtc(Some(Box::new(parse_datetime(s.trim())?)))
        }
        (FieldKind::Date, Scalar::Text(s)) => {
            V::ChronoDate(Some(Box::new(s.trim().parse::<NaiveDate>().ok()?)))
        }

        _ => return None,
    })
}

fn coerce_param(kind: FieldKind, v: &ParamValue) -> Option<sea_orm::Value> {
    match v {
        ParamValue::Scalar(s) => coerce(kind, s),
        ParamValue::List(_) => None,
    }
}

fn coerce_many(kind: FieldKind, v: &ParamValue) -> Option<Vec<sea_orm::Value>> {
    match v {
        ParamValue::List(items) => items.iter().map(|s| coerce(kind, s)).collect(),
        ParamValue::Scalar(s) => coerce(kind, s).map(|v| vec![v]),
    }
}

/// `Ok(None)` means the predicate was dropped because a bound value does not fit the column.
pub fn predicate_to_condition<E>(
    p: &Predicate,
    fmap: &FieldMap<E>,
) -> Result<Option<Condition>, QueryError>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    let dropped = |column: &Column| {
        debug!(column = %column, "bound value does not fit column kind, dropping predicate");
        Ok(None)
    };

    let expr = match p {
        Predicate::Compare { column, op, param } => {
            let f = fmap.resolve(column)?;
            let Some(v) = coerce_param(f.kind, &param.value) else {
                return dropped(column);
            };
            let col = Expr::col(f.col);
            match op {
                CompareOp::Eq => col.eq(v),
                CompareOp::Ne => col.ne(v),
                CompareOp::Gt => col.gt(v),
                CompareOp::Gte => col.gte(v),
                CompareOp::Lt => col.lt(v),
                CompareOp::Lte => col.lte(v),
            }
        }
        Predicate::InList {
            column,
            param,
            negated,
        } => {
            let f = fmap.resolve(column)?;
            let Some(vals) = coerce_many(f.kind, &param.value) else {
                return dropped(column);
            };
            if *negated {
                Expr::col(f.col).is_not_in(vals)
            } else {
                Expr::col(f.col).is_in(vals)
            }
        }
        Predicate::Like { column, param } => {
            let f = fmap.resolve(column)?;
            let pattern = match (&param.value, f.kind) {
                (ParamValue::Scalar(Scalar::Text(s)), FieldKind::String) => s.clone(),
                _ => return dropped(column),
            };
            Expr::expr(Func::lower(Expr::col(f.col))).like(LikeExpr::new(pattern).escape('\\'))
        }
        Predicate::Between { column, low, high } => {
            let f = fmap.resolve(column)?;
            match (
                coerce_param(f.kind, &low.value),
                coerce_param(f.kind, &high.value),
            ) {
                (Some(a), Some(b)) => Expr::col(f.col).between(a, b),
                _ => return dropped(column),
            }
        }
        Predicate::Null { column, negated } => {
            let f = fmap.resolve(column)?;
            if *negated {
                Expr::col(f.col).is_not_null()
            } else {
                Expr::col(f.col).is_null()
            }
        }
        Predicate::AnyOf(items) => {
            let mut any = Condition::any();
            let mut kept = 0usize;
            for item in items {
                if let Some(cond) = predicate_to_condition(item, fmap)? {
                    any = any.add(cond);
                    kept += 1;
                }
            }
            return Ok((kept > 0).then_some(any));
        }
    };
    Ok(Some(Condition::all().add(expr)))
}

/// AND of every predicate that survived coercion.
pub fn compiled_to_condition<E>(
    compiled: &CompiledQuery,
    fmap: &FieldMap<E>,
) -> Result<Condition, QueryError>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    let mut all = Condition::all();
    for p in &compiled.predicates {
        if let Some(cond) = predicate_to_condition(p, fmap)? {
            all = all.add(cond);
        }
    }
    Ok(all)
}

/// Apply a compiled list query to a plain SeaORM `Select<E>`.
pub trait ListQueryExt<E: EntityTrait>: Sized {
    /// Predicates only; suitable for counting.
    fn apply_filters(self, compiled: &CompiledQuery, fld_map: &FieldMap<E>)
        -> Result<Self, QueryError>;

    /// Predicates, ordering, offset and limit.
    fn apply_compiled(
        self,
        compiled: &CompiledQuery,
        fld_map: &FieldMap<E>,
    ) -> Result<Self, QueryError>;
}

impl<E> ListQueryExt<E> for sea_orm::Select<E>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    fn apply_filters(
        self,
        compiled: &CompiledQuery,
        fld_map: &FieldMap<E>,
    ) -> Result<Self, QueryError> {
        if compiled.predicates.is_empty() {
            return Ok(self);
        }
        let cond = compiled_to_condition(compiled, fld_map)?;
        Ok(self.filter(cond))
    }

    fn apply_compiled(
        self,
        compiled: &CompiledQuery,
        fld_map: &FieldMap<E>,
    ) -> Result<Self, QueryError> {
        let mut query = self.apply_filters(compiled, fld_map)?;

        for key in &compiled.order {
            let field = fld_map.resolve(&key.column)?;
            let sea_order = match key.direction {
                SortDirection::Ascending => Order::Asc,
                SortDirection::Descending => Order::Desc,
            };
            query = query.order_by(field.col, sea_order);
        }

        Ok(query.offset(compiled.skip).limit(compiled.take))
    }
}

/// One-shot list combiner: compile -> count -> fetch page -> assemble envelope.
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip_all, fields(page = expr.page, limit = expr.limit))]
pub async fn paginate_list<E, D, F, C>(
    select: sea_orm::Select<E>,
    conn: &C,
    expr: &FilterExpression,
    policy: &FieldPolicy,
    fmap: &FieldMap<E>,
    limits: LimitCfg,
    namer: &mut dyn ParamNamer,
    model_to_domain: F,
) -> Result<Page<D>, QueryError>
where
    E: EntityTrait,
    E::Model: Send + Sync + 'static,
    E::Column: ColumnTrait + Copy,
    F: Fn(E::Model) -> D,
    C: ConnectionTrait + Send + Sync,
{
    let compiled = compile_with_limits(expr, policy, limits, namer);

    let total = select
        .clone()
        .apply_filters(&compiled, fmap)?
        .count(conn)
        .await?;

    let rows = select.apply_compiled(&compiled, fmap)?.all(conn).await?;
    debug!(total, rows = rows.len(), "list page fetched");

    let items = rows.into_iter().map(model_to_domain).collect();
    Ok(Page::assemble(items, total, expr.page.max(1), compiled.take))
}
