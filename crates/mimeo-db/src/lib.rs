//! Mimeo DB - SQLite-backed knowledge store tables.

mod database;
mod error;
mod migrations;
mod operations;

pub use database::Database;
pub use error::{DbError, DbResult};
