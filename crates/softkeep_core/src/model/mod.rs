//! Record contract shared by every persisted entity type.
//!
//! # Responsibility
//! - Define the lifecycle metadata (`id`, timestamps, deletion flag) every
//!   record carries.
//! - Define per-type static deletion policy and the delete/restore
//!   operations that honor it.
//!
//! # Invariants
//! - `id` is assigned once by the store and never reused.
//! - `created_at <= modified_at` for every persisted record.
//! - Soft-deleted records stay in storage until hard-deleted.

pub mod record;
