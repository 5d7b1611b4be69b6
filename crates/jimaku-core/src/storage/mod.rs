//! Storage Module - SQLite record store
//!
//! Persists card scheduling state and the append-only review log. The
//! scheduler itself is pure; this layer owns durability and the
//! transactional read-modify-write of a review.

mod migrations;
mod sqlite;

pub use migrations::{apply_migrations, get_current_version, Migration, MIGRATIONS};
pub use sqlite::{CardRecord, Result, ReviewLogRecord, Storage, StorageError};
