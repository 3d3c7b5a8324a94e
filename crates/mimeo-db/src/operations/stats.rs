//! Knowledge store statistics.

use crate::database::Database;
use crate::error::DbResult;
use mimeo_core::StoreStats;
use std::collections::HashMap;

impl Database {
    pub fn get_stats(&self) -> DbResult<StoreStats> {
        let conn = self.conn()?;

        let total_items: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;

        let mut items_by_kind = HashMap::new();
        {
            let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM items GROUP BY kind")?;
            let rows = stmt.query_map([], |row| {
                let kind: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((kind, count))
            })?;
            for row in rows {
                let (kind, count) = row?;
                items_by_kind.insert(kind, count);
            }
        }

        let total_chunks: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        let embedded_chunks: i64 =
            conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;

        let page_count: i64 = conn.pragma_query_value(None, "page_count", |row| row.get(0))?;
        let page_size: i64 = conn.pragma_query_value(None, "page_size", |row| row.get(0))?;

        Ok(StoreStats {
            total_items,
            items_by_kind,
            total_chunks,
            embedded_chunks,
            database_size_bytes: page_count * page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimeo_core::{Chunk, ItemKind, StoredItem};

    #[test]
    fn test_get_stats() {
        let db = Database::open_in_memory().unwrap();

        let doc = StoredItem::new(ItemKind::Document, "document-a.pdf", "h1");
        let chunk = Chunk::new(doc.id.clone(), 0, "text");
        db.insert_item_with_chunks(&doc, std::slice::from_ref(&chunk)).unwrap();
        db.store_embedding(&chunk.id, &[1.0, 0.0], "m").unwrap();

        let caption = StoredItem::new(ItemKind::Caption, "caption-x", "h2");
        db.insert_item_with_chunks(&caption, &[]).unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.items_by_kind.get("document"), Some(&1));
        assert_eq!(stats.items_by_kind.get("caption"), Some(&1));
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.embedded_chunks, 1);
        assert!(stats.database_size_bytes > 0);
    }
}
