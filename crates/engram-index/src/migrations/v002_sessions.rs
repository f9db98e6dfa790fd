//! v002: sessions table.

use rusqlite::Connection;

use engram_core::EngramResult;

use crate::to_index_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sessions (
            id             TEXT PRIMARY KEY,
            start_time     TEXT NOT NULL,
            last_activity  TEXT NOT NULL,
            end_time       TEXT,
            workspace_id   TEXT,
            is_active      INTEGER NOT NULL DEFAULT 1,
            metadata       TEXT NOT NULL DEFAULT '{}'
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_workspace ON sessions(workspace_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_active ON sessions(is_active);
        ",
    )
    .map_err(|e| to_index_err(e.to_string()))?;
    Ok(())
}
