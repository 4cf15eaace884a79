//! Local persistence: the signed-in session, per-device flags and pending
//! sale drafts.
//!
//! - `model`: rows as typed values.
//! - `repo`: SQL-only functions over a SQLite pool.
//!
//! Callers import from `crm_client::store`; the repository API is
//! re-exported here.

pub mod model;
pub mod repo;

pub use model::{Borrador, SesionGuardada};
pub use repo::*;
