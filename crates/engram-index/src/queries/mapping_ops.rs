//! vector_mappings — the authoritative vector↔event resolver.

use rusqlite::{params, Connection};

use engram_core::EngramResult;

use super::event_crud::OptionalRow;
use crate::{from_sqlite_err, to_index_err};

/// Record (or replace) the mapping from an event to its vector.
pub fn upsert_mapping(
    conn: &Connection,
    memory_id: &str,
    vector_id: &str,
    model: &str,
    content_hash: &str,
) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO vector_mappings (memory_id, vector_id, model, content_hash)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(memory_id) DO UPDATE SET
            vector_id = excluded.vector_id,
            model = excluded.model,
            content_hash = excluded.content_hash",
        params![memory_id, vector_id, model, content_hash],
    )
    .map_err(from_sqlite_err)?;
    Ok(())
}

/// Find a vector already indexed for this content under the same model.
/// Identical content shares one stored vector.
pub fn vector_id_for_content_hash(
    conn: &Connection,
    content_hash: &str,
    model: &str,
) -> EngramResult<Option<String>> {
    conn.query_row(
        "SELECT vector_id FROM vector_mappings
         WHERE content_hash = ?1 AND model = ?2
         LIMIT 1",
        params![content_hash, model],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| to_index_err(e.to_string()))
}

/// Resolve a vector id to its event id.
pub fn memory_id_for_vector(conn: &Connection, vector_id: &str) -> EngramResult<Option<String>> {
    conn.query_row(
        "SELECT memory_id FROM vector_mappings WHERE vector_id = ?1",
        params![vector_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| to_index_err(e.to_string()))
}

/// Resolve a batch of vector ids, preserving input order. Unmapped ids
/// yield `None` in their slot.
pub fn memory_ids_for_vectors(
    conn: &Connection,
    vector_ids: &[String],
) -> EngramResult<Vec<Option<String>>> {
    let mut out = Vec::with_capacity(vector_ids.len());
    for vector_id in vector_ids {
        out.push(memory_id_for_vector(conn, vector_id)?);
    }
    Ok(out)
}

/// Look up the vector id recorded for an event, if any.
pub fn vector_id_for_memory(conn: &Connection, memory_id: &str) -> EngramResult<Option<String>> {
    conn.query_row(
        "SELECT vector_id FROM vector_mappings WHERE memory_id = ?1",
        params![memory_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| to_index_err(e.to_string()))
}
