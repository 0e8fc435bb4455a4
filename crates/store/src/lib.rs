//! Dataset storage for Quarry.
//!
//! A CSV file is ingested once into SQLite; the agent's tools then query it
//! with plain SQL.

pub mod csv_loader;
pub mod sqlite;

pub use csv_loader::{ColumnType, DATETIME_FORMAT};
pub use sqlite::{DESCRIBE_COLUMNS, SqliteStore};
