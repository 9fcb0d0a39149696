//! Record store contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the store operations the record base and gateways depend on.
//! - Isolate SQLite statement details from policy code.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`, `Unsaved`) in addition
//!   to DB transport errors.

pub mod record_repo;
