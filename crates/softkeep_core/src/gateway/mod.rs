//! Read gateways: the ordinary path and the administrative path.
//!
//! # Responsibility
//! - `Gateway` serves ordinary reads; soft-deleted rows are hidden unless
//!   a lookup names `is_deleted` explicitly.
//! - `AdminGateway` serves trusted management surfaces and never hides
//!   rows.
//!
//! # Invariants
//! - Both gateways decode opaque identifiers the same way, through
//!   `Lookup::resolve`.
//! - The two gateways are independent types over the same store; neither
//!   wraps the other.

pub mod admin;
pub mod objects;

pub use admin::{AdminGateway, AdminListFilter, AdminRow};
pub use objects::Gateway;
