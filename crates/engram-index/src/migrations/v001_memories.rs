//! v001: memories table with its secondary indexes.

use rusqlite::Connection;

use engram_core::EngramResult;

use crate::to_index_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS memories (
            id            TEXT PRIMARY KEY,
            event_type    TEXT NOT NULL,
            content       TEXT NOT NULL,
            metadata      TEXT NOT NULL DEFAULT '{}',
            timestamp     TEXT NOT NULL,
            session_id    TEXT NOT NULL,
            workspace_id  TEXT,
            git_branch    TEXT,
            git_commit    TEXT,
            embedding_id  TEXT,
            created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_memories_session ON memories(session_id);
        CREATE INDEX IF NOT EXISTS idx_memories_workspace ON memories(workspace_id);
        CREATE INDEX IF NOT EXISTS idx_memories_timestamp ON memories(timestamp);
        CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(event_type);
        ",
    )
    .map_err(|e| to_index_err(e.to_string()))?;
    Ok(())
}
