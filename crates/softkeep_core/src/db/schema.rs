//! Entity table DDL and readiness checks.
//!
//! # Invariants
//! - DDL is idempotent (`IF NOT EXISTS`).
//! - Identifiers come from `Entity` consts and are always quoted.

use super::{DbError, DbResult};
use crate::model::record::{Entity, BASE_COLUMNS};
use log::info;
use rusqlite::Connection;

/// Creates the entity table and its deletion-state index if missing, then
/// verifies the resulting shape.
pub fn ensure_entity_table<E: Entity>(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(&create_table_sql::<E>())?;
    verify_entity_table::<E>(conn)?;
    info!(
        "event=schema_ensure module=db status=ok table={} columns={}",
        E::TABLE,
        BASE_COLUMNS.len() + E::COLUMNS.len()
    );
    Ok(())
}

/// Checks that the entity table and every required column exist.
///
/// # Errors
/// - `MissingRequiredTable` when the table does not exist.
/// - `MissingRequiredColumn` for the first absent base or entity column.
pub fn verify_entity_table<E: Entity>(conn: &Connection) -> DbResult<()> {
    if !table_exists(conn, E::TABLE)? {
        return Err(DbError::MissingRequiredTable(E::TABLE));
    }

    let present = table_columns(conn, E::TABLE)?;
    for column in column_names::<E>() {
        if !present.iter().any(|name| name == column) {
            return Err(DbError::MissingRequiredColumn {
                table: E::TABLE,
                column,
            });
        }
    }
    Ok(())
}

/// Base columns followed by entity columns, in select order.
pub(crate) fn column_names<E: Entity>() -> Vec<&'static str> {
    BASE_COLUMNS
        .iter()
        .copied()
        .chain(E::COLUMNS.iter().map(|column| column.name))
        .collect()
}

/// Whether `field` names a column of the entity table.
pub(crate) fn has_column<E: Entity>(field: &str) -> bool {
    BASE_COLUMNS.contains(&field) || E::COLUMNS.iter().any(|column| column.name == field)
}

/// Comma-separated, quoted select list for the entity table.
pub(crate) fn select_list<E: Entity>() -> String {
    column_names::<E>()
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quotes an SQL identifier, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql<E: Entity>() -> String {
    let table = quote_ident(E::TABLE);
    let mut columns = vec![
        "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
        "\"created_at\" INTEGER NOT NULL".to_string(),
        "\"modified_at\" INTEGER NOT NULL".to_string(),
        "\"is_deleted\" INTEGER NOT NULL DEFAULT 0 CHECK (\"is_deleted\" IN (0, 1))".to_string(),
    ];
    for column in E::COLUMNS {
        let null_clause = if column.nullable { "" } else { " NOT NULL" };
        columns.push(format!(
            "{} {}{}",
            quote_ident(column.name),
            column.column_type.sql_name(),
            null_clause
        ));
    }
    columns.push("CHECK (\"created_at\" <= \"modified_at\")".to_string());

    let index = quote_ident(&format!("idx_{}_is_deleted", E::TABLE));
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    {}\n);\nCREATE INDEX IF NOT EXISTS {index} ON {table} (\"is_deleted\");",
        columns.join(",\n    ")
    )
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", quote_ident(table)))?;
    let mut rows = stmt.query([])?;
    let mut names = Vec::new();
    while let Some(row) = rows.next()? {
        names.push(row.get::<_, String>(1)?);
    }
    Ok(names)
}
