#![allow(dead_code)]

use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use softkeep_core::db::{ensure_entity_table, open_db_in_memory};
use softkeep_core::{
    CodecConfig, ColumnDef, ColumnType, Entity, EntityPolicy, IdCodec, RecordMeta,
};

pub const TEST_SECRET: &str = "test-secret-key";

/// Soft-delete entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub meta: RecordMeta,
    pub title: String,
    pub body: Option<String>,
}

impl Article {
    pub fn new(title: &str) -> Self {
        Self {
            meta: RecordMeta::unsaved(),
            title: title.to_string(),
            body: None,
        }
    }
}

impl Entity for Article {
    const TABLE: &'static str = "articles";
    const POLICY: EntityPolicy = EntityPolicy::SOFT_DELETE;
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::required("title", ColumnType::Text),
        ColumnDef::optional("body", ColumnType::Text),
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn field_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            self.body.clone().map_or(Value::Null, Value::Text),
        ]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            meta,
            title: row.get("title")?,
            body: row.get("body")?,
        })
    }
}

/// Hard-delete entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub meta: RecordMeta,
    pub amount_cents: i64,
}

impl Receipt {
    pub fn new(amount_cents: i64) -> Self {
        Self {
            meta: RecordMeta::unsaved(),
            amount_cents,
        }
    }
}

impl Entity for Receipt {
    const TABLE: &'static str = "receipts";
    const POLICY: EntityPolicy = EntityPolicy::HARD_DELETE;
    const COLUMNS: &'static [ColumnDef] =
        &[ColumnDef::required("amount_cents", ColumnType::Integer)];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn field_values(&self) -> Vec<Value> {
        vec![Value::Integer(self.amount_cents)]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            meta,
            amount_cents: row.get("amount_cents")?,
        })
    }
}

pub fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    ensure_entity_table::<Article>(&conn).unwrap();
    ensure_entity_table::<Receipt>(&conn).unwrap();
    conn
}

pub fn codec() -> IdCodec {
    IdCodec::new(&CodecConfig::new(TEST_SECRET)).unwrap()
}

pub fn stored_row_count(conn: &Connection, table: &str, id: i64) -> i64 {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE id = ?1;"),
        [id],
        |row| row.get(0),
    )
    .unwrap()
}
