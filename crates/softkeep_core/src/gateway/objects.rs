//! Ordinary read gateway.

use crate::codec::IdCodec;
use crate::db::verify_entity_table;
use crate::model::record::Entity;
use crate::query::{Lookup, QueryResult, QuerySet, Visibility};
use rusqlite::Connection;
use std::marker::PhantomData;

/// Default read path for entity `E`.
///
/// Every query set handed out starts from [`Gateway::get_queryset`], whose
/// visibility is fixed to [`Visibility::Default`].
pub struct Gateway<'a, E: Entity> {
    conn: &'a Connection,
    codec: &'a IdCodec,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> Gateway<'a, E> {
    /// Creates a gateway after verifying the entity table.
    pub fn try_new(conn: &'a Connection, codec: &'a IdCodec) -> QueryResult<Self> {
        verify_entity_table::<E>(conn)?;
        Ok(Self {
            conn,
            codec,
            _entity: PhantomData,
        })
    }

    /// Base query set for every ordinary read.
    pub fn get_queryset(&self) -> QuerySet<'a, E> {
        QuerySet::new(self.conn, self.codec, Visibility::Default)
    }

    pub fn all(&self) -> QuerySet<'a, E> {
        self.get_queryset()
    }

    /// Exactly one visible record matching `lookup`.
    ///
    /// # Errors
    /// - `NotFound` when nothing matches, including undecodable tokens.
    /// - `MultipleResults` when the lookup is not unique.
    pub fn get(&self, lookup: &Lookup) -> QueryResult<E> {
        self.get_queryset().filter(lookup)?.get()
    }

    pub fn filter(&self, lookup: &Lookup) -> QueryResult<QuerySet<'a, E>> {
        self.get_queryset().filter(lookup)
    }

    pub fn exclude(&self, lookup: &Lookup) -> QueryResult<QuerySet<'a, E>> {
        self.get_queryset().exclude(lookup)
    }
}
