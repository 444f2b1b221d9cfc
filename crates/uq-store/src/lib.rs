//! Durable key-value storage for uniqpass sessions.
//!
//! One SQLite file per user holding the remembered secret.

pub mod error;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{Store, resolve_base_dir, resolve_db_path};
