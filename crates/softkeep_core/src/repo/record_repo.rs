//! Record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the primitive writes the record base builds on: insert,
//!   update, flag/unflag deletion, physical erase.
//! - Own lifecycle timestamps and row <-> record conversion.
//!
//! # Invariants
//! - Every write is one durable statement; record metadata is updated in
//!   memory only after it succeeds.
//! - `modified_at` is refreshed on every write and never drops below
//!   `created_at`.
//! - Store faults are returned unchanged as `RepoError::Db`.

use crate::db::schema::{quote_ident, verify_entity_table};
use crate::db::DbError;
use crate::model::record::{now_epoch_ms, Entity, RecordId, RecordMeta};
use log::{info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for record store writes and row decoding.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Target row does not exist (any more).
    NotFound(RecordId),
    /// Operation needs a stored record, but the record has no id yet.
    Unsaved { table: &'static str },
    /// Insert called on a record that already has an id.
    AlreadySaved(RecordId),
    /// Persisted data or entity mapping is inconsistent.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Unsaved { table } => write!(f, "record in `{table}` has not been saved"),
            Self::AlreadySaved(id) => write!(f, "record already saved with id {id}"),
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Unsaved { .. } => None,
            Self::AlreadySaved(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Primitive write operations over entity tables.
///
/// Policy (soft vs. hard) is decided by [`Entity::delete`]; stores only
/// execute the chosen operation.
pub trait RecordStore {
    /// Inserts a new row and assigns the record's id.
    fn insert<E: Entity>(&self, record: &mut E) -> RepoResult<RecordId>;
    /// Rewrites all fields of an existing row and refreshes `modified_at`.
    fn update<E: Entity>(&self, record: &mut E) -> RepoResult<()>;
    /// Persists `is_deleted = true` and refreshes `modified_at`.
    fn mark_deleted<E: Entity>(&self, record: &mut E) -> RepoResult<()>;
    /// Persists `is_deleted = false` and refreshes `modified_at`.
    fn unmark_deleted<E: Entity>(&self, record: &mut E) -> RepoResult<()>;
    /// Physically removes the row, returning the removed row count.
    ///
    /// The record's id is cleared afterwards.
    fn erase<E: Entity>(&self, record: &mut E) -> RepoResult<usize>;

    /// Inserts unsaved records, updates saved ones.
    fn save<E: Entity>(&self, record: &mut E) -> RepoResult<RecordId> {
        match record.meta().id {
            None => self.insert(record),
            Some(id) => {
                self.update(record)?;
                Ok(id)
            }
        }
    }
}

/// SQLite-backed record store.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Creates a store after verifying the entity table exists.
    pub fn try_new_for<E: Entity>(conn: &'conn Connection) -> RepoResult<Self> {
        verify_entity_table::<E>(conn)?;
        Ok(Self { conn })
    }

    fn set_deleted_flag<E: Entity>(&self, record: &mut E, is_deleted: bool) -> RepoResult<()> {
        let id = require_id(record)?;
        let modified_at = next_modified_at(record.meta());
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET \"is_deleted\" = ?1, \"modified_at\" = ?2 WHERE \"id\" = ?3;",
                quote_ident(E::TABLE)
            ),
            params![bool_to_int(is_deleted), modified_at, id],
        )?;
        if changed == 0 {
            warn!(
                "event=record_flag module=repo status=error table={} id={} is_deleted={} error_code=not_found",
                E::TABLE,
                id,
                is_deleted
            );
            return Err(RepoError::NotFound(id));
        }

        let meta = record.meta_mut();
        meta.is_deleted = is_deleted;
        meta.modified_at = modified_at;
        info!(
            "event=record_flag module=repo status=ok table={} id={} is_deleted={}",
            E::TABLE,
            id,
            is_deleted
        );
        Ok(())
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn insert<E: Entity>(&self, record: &mut E) -> RepoResult<RecordId> {
        if let Some(id) = record.meta().id {
            return Err(RepoError::AlreadySaved(id));
        }
        let field_values = checked_field_values(record)?;
        let now = now_epoch_ms();

        let mut columns = vec!["\"created_at\"", "\"modified_at\"", "\"is_deleted\""]
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        columns.extend(E::COLUMNS.iter().map(|column| quote_ident(column.name)));
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut values = vec![
            Value::Integer(now),
            Value::Integer(now),
            Value::Integer(bool_to_int(record.meta().is_deleted)),
        ];
        values.extend(field_values);

        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                quote_ident(E::TABLE),
                columns.join(", ")
            ),
            params_from_iter(values),
        )?;
        let id = self.conn.last_insert_rowid();

        let meta = record.meta_mut();
        meta.id = Some(id);
        meta.created_at = now;
        meta.modified_at = now;
        info!(
            "event=record_insert module=repo status=ok table={} id={}",
            E::TABLE,
            id
        );
        Ok(id)
    }

    fn update<E: Entity>(&self, record: &mut E) -> RepoResult<()> {
        let id = require_id(record)?;
        let field_values = checked_field_values(record)?;
        let modified_at = next_modified_at(record.meta());

        let mut assignments: Vec<String> = E::COLUMNS
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{} = ?{}", quote_ident(column.name), index + 1))
            .collect();
        let next = E::COLUMNS.len();
        assignments.push(format!("\"is_deleted\" = ?{}", next + 1));
        assignments.push(format!("\"modified_at\" = ?{}", next + 2));

        let mut values = field_values;
        values.push(Value::Integer(bool_to_int(record.meta().is_deleted)));
        values.push(Value::Integer(modified_at));
        values.push(Value::Integer(id));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE \"id\" = ?{};",
                quote_ident(E::TABLE),
                assignments.join(", "),
                next + 3
            ),
            params_from_iter(values),
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        record.meta_mut().modified_at = modified_at;
        info!(
            "event=record_update module=repo status=ok table={} id={}",
            E::TABLE,
            id
        );
        Ok(())
    }

    fn mark_deleted<E: Entity>(&self, record: &mut E) -> RepoResult<()> {
        self.set_deleted_flag(record, true)
    }

    fn unmark_deleted<E: Entity>(&self, record: &mut E) -> RepoResult<()> {
        self.set_deleted_flag(record, false)
    }

    fn erase<E: Entity>(&self, record: &mut E) -> RepoResult<usize> {
        let id = require_id(record)?;
        let removed = self.conn.execute(
            &format!("DELETE FROM {} WHERE \"id\" = ?1;", quote_ident(E::TABLE)),
            [id],
        )?;

        record.meta_mut().id = None;
        info!(
            "event=record_erase module=repo status=ok table={} id={} removed={}",
            E::TABLE,
            id,
            removed
        );
        Ok(removed)
    }
}

/// Parses base metadata and hands the row to the entity mapper.
pub(crate) fn parse_record_row<E: Entity>(row: &Row<'_>) -> RepoResult<E> {
    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in {}.is_deleted",
                E::TABLE
            )));
        }
    };
    let meta = RecordMeta {
        id: Some(row.get("id")?),
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
        is_deleted,
    };
    Ok(E::from_row(meta, row)?)
}

fn require_id<E: Entity>(record: &E) -> RepoResult<RecordId> {
    record
        .meta()
        .id
        .ok_or(RepoError::Unsaved { table: E::TABLE })
}

fn checked_field_values<E: Entity>(record: &E) -> RepoResult<Vec<Value>> {
    let values = record.field_values();
    if values.len() != E::COLUMNS.len() {
        return Err(RepoError::InvalidData(format!(
            "{} declares {} columns but produced {} values",
            E::TABLE,
            E::COLUMNS.len(),
            values.len()
        )));
    }
    Ok(values)
}

fn next_modified_at(meta: &RecordMeta) -> i64 {
    now_epoch_ms().max(meta.created_at).max(meta.modified_at)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
