//! Read-side query construction.
//!
//! # Responsibility
//! - Turn keyword-style lookups (including opaque-id lookups) into store
//!   predicates.
//! - Build lazy, chainable query sets and decide default visibility at a
//!   single compilation point.
//!
//! # Invariants
//! - Token decode failures never surface as errors; they become a
//!   zero-row condition.
//! - A query set under default visibility never returns soft-deleted rows
//!   unless its own conditions name the deletion-state field.

use crate::db::DbError;
use crate::repo::record_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod lookup;
pub mod queryset;

pub use lookup::{Condition, FieldValue, Lookup, LookupOp, Operand, Predicate};
pub use queryset::{QuerySet, Visibility};

pub type QueryResult<T> = Result<T, QueryError>;

/// Error for gateway and query set reads.
#[derive(Debug)]
pub enum QueryError {
    /// `get` matched zero rows, including undecodable opaque ids.
    NotFound { table: &'static str },
    /// `get` matched more than one row. `count` is capped at the fetch
    /// window used by `get`.
    MultipleResults { table: &'static str, count: usize },
    /// Lookup key, field, operator or operand is not usable.
    InvalidLookup(String),
    Db(DbError),
    InvalidData(String),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { table } => write!(f, "no matching record in `{table}`"),
            Self::MultipleResults { table, count } => {
                write!(f, "get() on `{table}` matched {count} records, expected one")
            }
            Self::InvalidLookup(message) => write!(f, "invalid lookup: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::MultipleResults { .. } => None,
            Self::InvalidLookup(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for QueryError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for QueryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Db(err) => Self::Db(err),
            RepoError::InvalidData(message) => Self::InvalidData(message),
            other => Self::InvalidData(other.to_string()),
        }
    }
}
