//! Record base: lifecycle metadata, deletion policy, entity trait.
//!
//! # Responsibility
//! - Describe how an entity type maps onto a store table.
//! - Route `delete()` to soft or hard removal according to the type's
//!   declared policy, with a per-call override.
//! - Derive the opaque identifier from the stored id on demand.
//!
//! # Invariants
//! - `Entity::POLICY` is an associated const: declared once per type, never
//!   changed at runtime.
//! - A delete call performs exactly one of soft or hard removal.
//! - In-memory metadata changes only after the store write succeeded.

use crate::codec::IdCodec;
use crate::repo::record_repo::{RecordStore, RepoResult};
use log::debug;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Store-assigned monotonic primary key.
pub type RecordId = i64;

/// Columns every entity table carries, in select order.
pub const BASE_COLUMNS: [&str; 4] = ["id", "created_at", "modified_at", "is_deleted"];
/// Name of the deletion-state column targeted by the visibility predicate.
pub const DELETION_FIELD: &str = "is_deleted";

/// How a delete call removes a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// Flag the row as deleted and keep it.
    Soft,
    /// Physically remove the row.
    Hard,
}

impl DeleteMode {
    /// Maps a `hard: bool` call-site flag onto a mode.
    pub fn from_hard_flag(hard: bool) -> Self {
        if hard {
            Self::Hard
        } else {
            Self::Soft
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

/// Static per-type policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityPolicy {
    pub delete_mode: DeleteMode,
}

impl EntityPolicy {
    pub const SOFT_DELETE: Self = Self {
        delete_mode: DeleteMode::Soft,
    };
    pub const HARD_DELETE: Self = Self {
        delete_mode: DeleteMode::Hard,
    };
}

/// Result of a delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub mode: DeleteMode,
    /// `1` for soft deletes; the store's removed row count for hard deletes.
    pub affected: usize,
}

/// Lifecycle metadata embedded in every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// `None` until the first successful insert.
    pub id: Option<RecordId>,
    /// Epoch milliseconds, set once at insert.
    pub created_at: i64,
    /// Epoch milliseconds, refreshed by every write.
    pub modified_at: i64,
    pub is_deleted: bool,
}

impl RecordMeta {
    /// Metadata for a record that has not been saved yet.
    pub fn unsaved() -> Self {
        Self::default()
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }
}

/// Storage affinity for declared entity columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnType {
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

/// One entity-specific column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnDef {
    pub const fn required(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
        }
    }

    pub const fn optional(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: true,
        }
    }
}

/// Contract implemented by every persisted type.
///
/// Implementors declare their table, policy and columns, and convert
/// between their own fields and store values. Lifecycle metadata
/// (`id`, timestamps, deletion flag) is owned by this layer.
pub trait Entity: Sized {
    /// Table holding this entity type.
    const TABLE: &'static str;
    /// Deletion policy declared at definition time.
    const POLICY: EntityPolicy;
    /// Entity-specific columns, excluding [`BASE_COLUMNS`].
    const COLUMNS: &'static [ColumnDef];

    fn meta(&self) -> &RecordMeta;
    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Values for [`Entity::COLUMNS`], in the same order.
    fn field_values(&self) -> Vec<Value>;

    /// Rebuilds an entity from a row; base metadata is already parsed.
    fn from_row(meta: RecordMeta, row: &Row<'_>) -> rusqlite::Result<Self>;

    fn id(&self) -> Option<RecordId> {
        self.meta().id
    }

    fn is_deleted(&self) -> bool {
        self.meta().is_deleted
    }

    /// Whether the default read path would return this record.
    fn is_active(&self) -> bool {
        !self.meta().is_deleted
    }

    /// Opaque token for this record, absent until an id is assigned.
    fn opaque_id(&self, codec: &IdCodec) -> Option<String> {
        self.meta().id.and_then(|id| codec.encode(id))
    }

    /// Deletes using the type's declared policy.
    fn delete<S: RecordStore>(&mut self, store: &S) -> RepoResult<DeleteOutcome> {
        self.delete_as(store, Self::POLICY.delete_mode)
    }

    /// Deletes with an explicit mode, overriding the declared policy.
    ///
    /// # Errors
    /// - `Unsaved` when the record has no id.
    /// - `NotFound` when a soft delete targets a row that no longer exists.
    /// - Store errors unchanged.
    fn delete_as<S: RecordStore>(
        &mut self,
        store: &S,
        mode: DeleteMode,
    ) -> RepoResult<DeleteOutcome> {
        debug!(
            "event=record_delete module=model status=start table={} mode={} policy={}",
            Self::TABLE,
            mode.as_str(),
            Self::POLICY.delete_mode.as_str()
        );
        match mode {
            DeleteMode::Soft => {
                store.mark_deleted(self)?;
                Ok(DeleteOutcome { mode, affected: 1 })
            }
            DeleteMode::Hard => {
                let affected = store.erase(self)?;
                Ok(DeleteOutcome { mode, affected })
            }
        }
    }

    /// Physically removes the record regardless of declared policy.
    fn hard_delete<S: RecordStore>(&mut self, store: &S) -> RepoResult<DeleteOutcome> {
        self.delete_as(store, DeleteMode::Hard)
    }

    /// Clears the deletion flag of a soft-deleted record.
    fn restore<S: RecordStore>(&mut self, store: &S) -> RepoResult<()> {
        store.unmark_deleted(self)
    }
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
