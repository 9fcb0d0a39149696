//! Record visibility and identifier policy over a SQLite record store.
//! Ordinary reads hide soft-deleted rows, administrative reads see every
//! row, and callers address records by opaque tokens instead of raw ids.

pub mod codec;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;

pub use codec::{IdCodec, TokenError};
pub use config::{CodecConfig, ConfigError};
pub use gateway::{AdminGateway, AdminListFilter, AdminRow, Gateway};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{
    ColumnDef, ColumnType, DeleteMode, DeleteOutcome, Entity, EntityPolicy, RecordId, RecordMeta,
};
pub use query::{FieldValue, Lookup, LookupOp, QueryError, QueryResult, QuerySet, Visibility};
pub use repo::record_repo::{RecordStore, RepoError, RepoResult, SqliteRecordStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
