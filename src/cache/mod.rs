//! Local persistence for offline support.
//!
//! Records are stored per kind and keyed by id. The cache is a strict copy of
//! what the catalog returned; nothing is ever written back to the server.

mod storage;
mod traits;

pub use storage::{NoopCache, SqliteCache};
pub use traits::Cache;
