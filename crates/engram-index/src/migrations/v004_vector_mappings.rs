//! v004: vector_mappings — the authoritative vector↔event resolver.
//!
//! `content_hash` lets identical content share one stored vector.

use rusqlite::Connection;

use engram_core::EngramResult;

use crate::to_index_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS vector_mappings (
            memory_id     TEXT PRIMARY KEY,
            vector_id     TEXT NOT NULL,
            model         TEXT NOT NULL,
            content_hash  TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_vector_mappings_vector ON vector_mappings(vector_id);
        CREATE INDEX IF NOT EXISTS idx_vector_mappings_hash
            ON vector_mappings(content_hash, model);
        ",
    )
    .map_err(|e| to_index_err(e.to_string()))?;
    Ok(())
}
