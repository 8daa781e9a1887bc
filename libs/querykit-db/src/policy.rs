//! Caller-supplied whitelist of searchable, sortable and filterable fields.
//!
//! Every identifier that can reach a generated clause is a [`Column`], and a
//! `Column` can only be obtained from a [`FieldPolicy`] whose names were
//! validated at build time. Raw request text never becomes a column.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use query_core::SortDirection;
use regex::Regex;

use crate::error::{PolicyError, PolicyResult};

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// A validated column identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column(String);

impl Column {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Field {
    name: String,
    column: Column,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldPolicy {
    searchable: Vec<Field>,
    sortable: Vec<Field>,
    filterable: Vec<Field>,
    tiebreaker: Option<(Field, SortDirection)>,
}

fn find<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
    fields.iter().find(|f| f.name == name)
}

impl FieldPolicy {
    pub fn builder() -> FieldPolicyBuilder {
        FieldPolicyBuilder::default()
    }

    pub fn filter_column(&self, field: &str) -> Option<&Column> {
        find(&self.filterable, field).map(|f| &f.column)
    }

    pub fn sort_column(&self, field: &str) -> Option<&Column> {
        find(&self.sortable, field).map(|f| &f.column)
    }

    /// First sortable field; used whenever the requested sort field is not allowed.
    pub fn default_sort(&self) -> Option<(&str, &Column)> {
        self.sortable.first().map(|f| (f.name.as_str(), &f.column))
    }

    /// Searchable fields as `(api name, column)`, in declaration order.
    pub fn search_columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.searchable.iter().map(|f| (f.name.as_str(), &f.column))
    }

    pub fn tiebreaker(&self) -> Option<(&Column, SortDirection)> {
        self.tiebreaker.as_ref().map(|(f, dir)| (&f.column, *dir))
    }

    pub fn searchable(&self) -> impl Iterator<Item = &str> {
        self.searchable.iter().map(|f| f.name.as_str())
    }

    pub fn sortable(&self) -> impl Iterator<Item = &str> {
        self.sortable.iter().map(|f| f.name.as_str())
    }

    pub fn filterable(&self) -> impl Iterator<Item = &str> {
        self.filterable.iter().map(|f| f.name.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct FieldPolicyBuilder {
    searchable: Vec<String>,
    sortable: Vec<String>,
    filterable: Vec<String>,
    columns: HashMap<String, String>,
    tiebreaker: Option<(String, SortDirection)>,
}

fn extend_unique<I, S>(target: &mut Vec<String>, fields: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for f in fields {
        let f = f.into();
        if !target.contains(&f) {
            target.push(f);
        }
    }
}

impl FieldPolicyBuilder {
    pub fn searchable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.searchable, fields);
        self
    }

    /// Order matters: the first sortable field is the default sort.
    pub fn sortable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.sortable, fields);
        self
    }

    pub fn filterable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.filterable, fields);
        self
    }

    /// Map an API field name onto a differently named column (`createdAt` -> `created_at`).
    pub fn column(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns.insert(field.into(), column.into());
        self
    }

    /// Secondary ordering key that keeps page boundaries stable.
    pub fn tiebreaker(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.tiebreaker = Some((field.into(), direction));
        self
    }

    pub fn build(self) -> PolicyResult<FieldPolicy> {
        let known = |name: &String| {
            self.searchable.contains(name)
                || self.sortable.contains(name)
                || self.filterable.contains(name)
                || self.tiebreaker.as_ref().is_some_and(|(t, _)| t == name)
        };
        for (field, column) in &self.columns {
            if !known(field) {
                return Err(PolicyError::UnknownAlias(field.clone()));
            }
            validate(column)?;
        }

        let resolve = |name: &str| -> PolicyResult<Field> {
            validate(name)?;
            let column = self.columns.get(name).map(String::as_str).unwrap_or(name);
            Ok(Field {
                name: name.to_string(),
                column: Column(column.to_string()),
            })
        };
        let resolve_all = |names: &[String]| -> PolicyResult<Vec<Field>> {
            names.iter().map(|n| resolve(n)).collect()
        };

        Ok(FieldPolicy {
            searchable: resolve_all(&self.searchable)?,
            sortable: resolve_all(&self.sortable)?,
            filterable: resolve_all(&self.filterable)?,
            tiebreaker: match &self.tiebreaker {
                Some((name, dir)) => Some((resolve(name)?, *dir)),
                None => None,
            },
        })
    }
}

fn validate(name: &str) -> PolicyResult<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(PolicyError::InvalidIdentifier(name.to_string()))
    }
}
