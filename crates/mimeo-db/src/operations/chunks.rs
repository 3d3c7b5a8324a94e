//! Chunk and embedding operations.

use crate::database::Database;
use crate::error::DbResult;
use mimeo_core::ChunkId;
use rusqlite::params;

impl Database {
    /// Store embedding for a chunk.
    pub fn store_embedding(&self, chunk_id: &ChunkId, vector: &[f32], model: &str) -> DbResult<()> {
        let conn = self.conn()?;

        let vector_bytes: Vec<u8> = vector.iter().flat_map(|f| f.to_le_bytes()).collect();

        conn.execute(
            r#"
            INSERT OR REPLACE INTO embeddings (chunk_id, vector, model, dimensions)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![chunk_id, vector_bytes, model, vector.len() as i32],
        )?;

        Ok(())
    }
}

#[cfg(test)]
impl Database {
    pub(crate) fn get_chunks_by_item(&self, item_id: &mimeo_core::ItemId) -> DbResult<Vec<mimeo_core::Chunk>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, item_id, chunk_index, content
             FROM chunks WHERE item_id = ?1 ORDER BY chunk_index",
        )?;

        let chunks = stmt.query_map(params![item_id], |row| {
            Ok(mimeo_core::Chunk {
                id: row.get(0)?,
                item_id: row.get(1)?,
                chunk_index: row.get(2)?,
                content: row.get(3)?,
            })
        })?;

        chunks.collect::<Result<Vec<_>, _>>().map_err(crate::error::DbError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimeo_core::{Chunk, ItemKind, StoredItem};

    #[test]
    fn test_embeddings() {
        let db = Database::open_in_memory().unwrap();

        let item = StoredItem::new(ItemKind::Document, "document-notes.txt", "h");
        let chunk = Chunk::new(item.id.clone(), 0, "Test content");
        db.insert_item_with_chunks(&item, std::slice::from_ref(&chunk)).unwrap();

        assert_eq!(db.get_stats().unwrap().embedded_chunks, 0);

        let vector = vec![0.1, 0.2, 0.3, 0.4];
        db.store_embedding(&chunk.id, &vector, "test-model").unwrap();
        // Re-embedding replaces the stored vector
        db.store_embedding(&chunk.id, &vector, "test-model").unwrap();

        let conn = db.conn().unwrap();
        let (bytes, dimensions): (Vec<u8>, i32) = conn
            .query_row(
                "SELECT vector, dimensions FROM embeddings WHERE chunk_id = ?1",
                params![chunk.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(dimensions, 4);
        assert_eq!(bytes.len(), 16);
        assert_eq!(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 0.1);
        drop(conn);
        assert_eq!(db.get_stats().unwrap().embedded_chunks, 1);
    }

    #[test]
    fn test_chunks_ordered_by_index() {
        let db = Database::open_in_memory().unwrap();

        let item = StoredItem::new(ItemKind::Transcript, "ana - reel", "h");
        let chunks = vec![
            Chunk::new(item.id.clone(), 1, "second"),
            Chunk::new(item.id.clone(), 0, "first"),
        ];
        db.insert_item_with_chunks(&item, &chunks).unwrap();

        let fetched = db.get_chunks_by_item(&item.id).unwrap();
        assert_eq!(fetched[0].content, "first");
        assert_eq!(fetched[1].content, "second");
    }
}
