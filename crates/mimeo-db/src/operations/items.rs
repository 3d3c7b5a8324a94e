//! Item operations, keyed by item name.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use mimeo_core::{Chunk, ItemKind, StoredItem};
use rusqlite::{params, OptionalExtension, Transaction};

const ITEM_COLUMNS: &str = "id, kind, name, content_hash, created_at, metadata";

impl Database {
    /// Insert an item and its chunks in one transaction.
    ///
    /// Fails with [`DbError::Duplicate`] if an item with the same name is
    /// already stored.
    pub fn insert_item_with_chunks(&self, item: &StoredItem, chunks: &[Chunk]) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists: Option<String> = tx
            .query_row("SELECT id FROM items WHERE name = ?1", params![item.name], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_some() {
            return Err(DbError::Duplicate(item.name.clone()));
        }

        write_item(&tx, item, chunks)?;
        tx.commit()?;
        Ok(())
    }

    /// Swap out any item with the same name for `item` and its chunks, in
    /// one transaction. Returns whether a previous item was removed.
    pub fn replace_item_with_chunks(&self, item: &StoredItem, chunks: &[Chunk]) -> DbResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let removed = tx.execute("DELETE FROM items WHERE name = ?1", params![item.name])?;
        write_item(&tx, item, chunks)?;
        tx.commit()?;
        Ok(removed > 0)
    }

    pub fn item_exists(&self, name: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List items, newest first, optionally restricted to one kind.
    pub fn list_items(&self, kind: Option<ItemKind>, limit: Option<i64>) -> DbResult<Vec<StoredItem>> {
        let conn = self.conn()?;
        let limit = limit.unwrap_or(100);

        let items = match kind {
            Some(kind) => {
                let sql = format!(
                    "SELECT {} FROM items WHERE kind = ?1 ORDER BY created_at DESC LIMIT ?2",
                    ITEM_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![kind.as_str(), limit], row_to_item)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM items ORDER BY created_at DESC LIMIT ?1",
                    ITEM_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![limit], row_to_item)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(items)
    }
}

fn write_item(tx: &Transaction, item: &StoredItem, chunks: &[Chunk]) -> DbResult<()> {
    tx.execute(
        r#"
        INSERT INTO items (id, kind, name, content_hash, created_at, metadata)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            item.id,
            item.kind.as_str(),
            item.name,
            item.content_hash,
            item.created_at.to_rfc3339(),
            item.metadata.to_string(),
        ],
    )?;

    let mut stmt =
        tx.prepare("INSERT INTO chunks (id, item_id, chunk_index, content) VALUES (?1, ?2, ?3, ?4)")?;
    for chunk in chunks {
        stmt.execute(params![chunk.id, chunk.item_id, chunk.chunk_index, chunk.content])?;
    }
    Ok(())
}

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<StoredItem> {
    let kind_str: String = row.get(1)?;
    let created_at_str: String = row.get(4)?;
    let metadata_str: String = row.get(5)?;

    Ok(StoredItem {
        id: row.get(0)?,
        kind: ItemKind::from_str(&kind_str).unwrap_or(ItemKind::Document),
        name: row.get(2)?,
        content_hash: row.get(3)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        metadata: serde_json::from_str(&metadata_str).unwrap_or_default(),
    })
}

impl Database {
    pub fn get_item_by_name(&self, name: &str) -> DbResult<Option<StoredItem>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM items WHERE name = ?1", ITEM_COLUMNS);
        let item = conn.query_row(&sql, params![name], row_to_item).optional()?;
        Ok(item)
    }
}
