//! Lazy, chainable query sets over one entity table.
//!
//! # Responsibility
//! - Accumulate filter/exclude conditions, ordering and paging without
//!   touching the store.
//! - Compile everything, including the default visibility predicate, into
//!   one statement per terminal call.
//!
//! # Invariants
//! - No SQL runs until `fetch`, `first`, `get`, `count` or `exists`.
//! - Terminal calls can be repeated; each one re-executes the query.
//! - Under `Visibility::Default`, `is_deleted = 0` is added unless some
//!   filter or exclude condition names `is_deleted`. This is decided in
//!   `compile_where` only.
//! - `exclude` removes exactly the rows its conditions match; rows where a
//!   condition evaluates to NULL are kept.

use super::lookup::{Condition, Lookup, LookupOp, Operand, Predicate};
use super::{QueryError, QueryResult};
use crate::codec::IdCodec;
use crate::db::schema::{has_column, quote_ident, select_list};
use crate::model::record::Entity;
use crate::repo::record_repo::parse_record_row;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::marker::PhantomData;
use std::time::Instant;

/// Upper bound of rows `get` reads before reporting multiple results.
const GET_FETCH_WINDOW: u32 = 21;

/// Which rows a query set may see before its own conditions apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Soft-deleted rows are hidden unless explicitly asked for.
    Default,
    /// Every stored row is visible.
    All,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Ordering {
    field: String,
    descending: bool,
}

/// Lazy query over entity `E`.
pub struct QuerySet<'a, E: Entity> {
    conn: &'a Connection,
    codec: &'a IdCodec,
    visibility: Visibility,
    filters: Vec<Condition>,
    excludes: Vec<Vec<Condition>>,
    ordering: Vec<Ordering>,
    limit: Option<u32>,
    offset: u32,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for QuerySet<'_, E> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn,
            codec: self.codec,
            visibility: self.visibility,
            filters: self.filters.clone(),
            excludes: self.excludes.clone(),
            ordering: self.ordering.clone(),
            limit: self.limit,
            offset: self.offset,
            _entity: PhantomData,
        }
    }
}

impl<'a, E: Entity> QuerySet<'a, E> {
    /// Creates an unfiltered base query set with the given visibility.
    pub fn new(conn: &'a Connection, codec: &'a IdCodec, visibility: Visibility) -> Self {
        Self {
            conn,
            codec,
            visibility,
            filters: Vec::new(),
            excludes: Vec::new(),
            ordering: Vec::new(),
            limit: None,
            offset: 0,
            _entity: PhantomData,
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Narrows to rows matching every argument of `lookup`.
    pub fn filter(mut self, lookup: &Lookup) -> QueryResult<Self> {
        let conditions = lookup.resolve::<E>(self.codec)?;
        self.filters.extend(conditions);
        Ok(self)
    }

    /// Removes rows matching all arguments of `lookup` together.
    pub fn exclude(mut self, lookup: &Lookup) -> QueryResult<Self> {
        let conditions = lookup.resolve::<E>(self.codec)?;
        if !conditions.is_empty() {
            self.excludes.push(conditions);
        }
        Ok(self)
    }

    /// Appends an ordering key; prefix with `-` for descending order.
    pub fn order_by(mut self, key: &str) -> QueryResult<Self> {
        let (field, descending) = match key.strip_prefix('-') {
            Some(field) => (field, true),
            None => (key, false),
        };
        let field = if field == "pk" { "id" } else { field };
        if !has_column::<E>(field) {
            return Err(QueryError::InvalidLookup(format!(
                "unknown ordering field `{field}` on `{}`",
                E::TABLE
            )));
        }
        self.ordering.push(Ordering {
            field: field.to_string(),
            descending,
        });
        Ok(self)
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Whether the default visibility predicate applies to this query set.
    pub fn hides_deleted(&self) -> bool {
        self.visibility == Visibility::Default && !self.names_deletion_state()
    }

    /// Executes the query and materializes every matching record.
    pub fn fetch(&self) -> QueryResult<Vec<E>> {
        let started_at = Instant::now();
        let (sql, values) = self.compile_select(self.limit);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row::<E>(row)?);
        }

        debug!(
            "event=query_fetch module=query status=ok table={} visibility={} hides_deleted={} rows={} duration_ms={}",
            E::TABLE,
            self.visibility.as_str(),
            self.hides_deleted(),
            records.len(),
            started_at.elapsed().as_millis()
        );
        Ok(records)
    }

    /// First matching record in query order, if any.
    pub fn first(&self) -> QueryResult<Option<E>> {
        Ok(self.clone().limit(1).fetch()?.into_iter().next())
    }

    /// Exactly one matching record.
    ///
    /// # Errors
    /// - `NotFound` when nothing matches.
    /// - `MultipleResults` when more than one row matches.
    pub fn get(&self) -> QueryResult<E> {
        let window = self
            .limit
            .map_or(GET_FETCH_WINDOW, |limit| limit.min(GET_FETCH_WINDOW));
        let (sql, values) = self.compile_select(Some(window));
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row::<E>(row)?);
        }

        match records.len() {
            0 => Err(QueryError::NotFound { table: E::TABLE }),
            1 => Ok(records.remove(0)),
            count => Err(QueryError::MultipleResults {
                table: E::TABLE,
                count,
            }),
        }
    }

    /// Number of matching rows, honoring limit and offset.
    pub fn count(&self) -> QueryResult<usize> {
        let (inner, values) = self.compile_select(self.limit);
        let inner = inner.trim_end_matches(';');
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM ({inner});"),
            params_from_iter(values),
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| QueryError::InvalidData(format!("negative row count {count}")))
    }

    pub fn exists(&self) -> QueryResult<bool> {
        Ok(self.clone().limit(1).count()? > 0)
    }

    /// Compiled statement text, for diagnostics.
    pub fn to_sql(&self) -> String {
        self.compile_select(self.limit).0
    }

    fn names_deletion_state(&self) -> bool {
        self.filters
            .iter()
            .chain(self.excludes.iter().flatten())
            .any(Condition::names_deletion_state)
    }

    fn compile_select(&self, limit: Option<u32>) -> (String, Vec<Value>) {
        let mut values = Vec::new();
        let mut sql = format!(
            "SELECT {} FROM {}",
            select_list::<E>(),
            quote_ident(E::TABLE)
        );

        let clauses = self.compile_where(&mut values);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        sql.push_str(" ORDER BY ");
        if self.ordering.is_empty() {
            sql.push_str("\"id\" ASC");
        } else {
            let keys = self
                .ordering
                .iter()
                .map(|order| {
                    let direction = if order.descending { "DESC" } else { "ASC" };
                    format!("{} {direction}", quote_ident(&order.field))
                })
                .collect::<Vec<_>>();
            sql.push_str(&keys.join(", "));
        }

        match (limit, self.offset) {
            (Some(limit), 0) => {
                sql.push_str(" LIMIT ?");
                values.push(Value::Integer(i64::from(limit)));
            }
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                values.push(Value::Integer(i64::from(limit)));
                values.push(Value::Integer(i64::from(offset)));
            }
            (None, 0) => {}
            (None, offset) => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                values.push(Value::Integer(i64::from(offset)));
            }
        }

        sql.push(';');
        (sql, values)
    }

    fn compile_where(&self, values: &mut Vec<Value>) -> Vec<String> {
        let mut clauses = Vec::new();

        if self.hides_deleted() {
            clauses.push("\"is_deleted\" = 0".to_string());
        }

        for condition in &self.filters {
            clauses.push(compile_condition(condition, values));
        }

        for group in &self.excludes {
            let inner = group
                .iter()
                .map(|condition| compile_condition(condition, values))
                .collect::<Vec<_>>();
            // NULL means "did not match"; a bare NOT would drop those rows too.
            clauses.push(format!("NOT COALESCE(({}), 0)", inner.join(" AND ")));
        }

        clauses
    }
}

fn compile_condition(condition: &Condition, values: &mut Vec<Value>) -> String {
    match condition {
        Condition::MatchNone => "0 = 1".to_string(),
        Condition::Field(predicate) => compile_predicate(predicate, values),
    }
}

fn compile_predicate(predicate: &Predicate, values: &mut Vec<Value>) -> String {
    let column = quote_ident(&predicate.field);
    match (&predicate.operand, predicate.op) {
        (Operand::List(items), _) => {
            if items.is_empty() {
                return "0 = 1".to_string();
            }
            values.extend(items.iter().cloned());
            let placeholders = vec!["?"; items.len()].join(", ");
            format!("{column} IN ({placeholders})")
        }
        (Operand::Single(Value::Null), LookupOp::Exact) => format!("{column} IS NULL"),
        (Operand::Single(Value::Null), LookupOp::Ne) => format!("{column} IS NOT NULL"),
        (Operand::Single(Value::Integer(flag)), LookupOp::IsNull) => {
            if *flag == 1 {
                format!("{column} IS NULL")
            } else {
                format!("{column} IS NOT NULL")
            }
        }
        (Operand::Single(value), op) => {
            values.push(value.clone());
            match op {
                LookupOp::Ne => format!("{column} <> ?"),
                LookupOp::Gt => format!("{column} > ?"),
                LookupOp::Gte => format!("{column} >= ?"),
                LookupOp::Lt => format!("{column} < ?"),
                LookupOp::Lte => format!("{column} <= ?"),
                LookupOp::Contains => format!("instr({column}, ?) > 0"),
                LookupOp::StartsWith => format!("instr({column}, ?) = 1"),
                LookupOp::Exact | LookupOp::In | LookupOp::IsNull => format!("{column} = ?"),
            }
        }
    }
}
