//! Database CRUD operations.

pub mod items;
pub mod chunks;
pub mod stats;
