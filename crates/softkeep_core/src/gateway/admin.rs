//! Administrative read gateway and back-office listing contract.
//!
//! # Responsibility
//! - Read every stored row, soft-deleted or not.
//! - Expose the listing columns and filter a management UI renders.
//!
//! # Invariants
//! - Query sets from this gateway use `Visibility::All`; no visibility
//!   predicate is ever injected.

use crate::codec::IdCodec;
use crate::db::verify_entity_table;
use crate::model::record::{Entity, RecordId};
use crate::query::{Lookup, QueryResult, QuerySet, Visibility};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::marker::PhantomData;

/// One row of the administrative listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminRow {
    pub id: RecordId,
    /// Opaque identifier of `id`.
    pub hash: String,
    pub created_at: i64,
    pub modified_at: i64,
    pub is_deleted: bool,
}

/// Listing filter control; `None` shows every row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminListFilter {
    pub is_deleted: Option<bool>,
}

/// Privileged read path for entity `E`.
pub struct AdminGateway<'a, E: Entity> {
    conn: &'a Connection,
    codec: &'a IdCodec,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> AdminGateway<'a, E> {
    /// Columns shown by the listing, in display order.
    pub const LIST_DISPLAY: [&'static str; 5] =
        ["id", "hash", "created_at", "modified_at", "is_deleted"];
    /// Fields offered as listing filters.
    pub const LIST_FILTER: [&'static str; 1] = ["is_deleted"];

    pub fn try_new(conn: &'a Connection, codec: &'a IdCodec) -> QueryResult<Self> {
        verify_entity_table::<E>(conn)?;
        Ok(Self {
            conn,
            codec,
            _entity: PhantomData,
        })
    }

    /// Base query set over every stored row.
    pub fn get_queryset(&self) -> QuerySet<'a, E> {
        QuerySet::new(self.conn, self.codec, Visibility::All)
    }

    pub fn all(&self) -> QuerySet<'a, E> {
        self.get_queryset()
    }

    pub fn get(&self, lookup: &Lookup) -> QueryResult<E> {
        self.get_queryset().filter(lookup)?.get()
    }

    pub fn filter(&self, lookup: &Lookup) -> QueryResult<QuerySet<'a, E>> {
        self.get_queryset().filter(lookup)
    }

    pub fn exclude(&self, lookup: &Lookup) -> QueryResult<QuerySet<'a, E>> {
        self.get_queryset().exclude(lookup)
    }

    /// Rows for the management listing, newest first.
    pub fn listing(&self, filter: AdminListFilter) -> QueryResult<Vec<AdminRow>> {
        let mut queryset = self.get_queryset().order_by("-id")?;
        if let Some(is_deleted) = filter.is_deleted {
            queryset = queryset.filter(&Lookup::new().field("is_deleted", is_deleted))?;
        }

        let rows: Vec<AdminRow> = queryset
            .fetch()?
            .iter()
            .filter_map(|record| self.to_row(record))
            .collect();
        info!(
            "event=admin_listing module=gateway status=ok table={} rows={} is_deleted_filter={:?}",
            E::TABLE,
            rows.len(),
            filter.is_deleted
        );
        Ok(rows)
    }

    fn to_row(&self, record: &E) -> Option<AdminRow> {
        let meta = record.meta();
        let id = meta.id?;
        Some(AdminRow {
            id,
            hash: self.codec.encode(id)?,
            created_at: meta.created_at,
            modified_at: meta.modified_at,
            is_deleted: meta.is_deleted,
        })
    }
}
