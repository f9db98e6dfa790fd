//! v003: git_states table.

use rusqlite::Connection;

use engram_core::EngramResult;

use crate::to_index_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS git_states (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            workspace_id  TEXT NOT NULL,
            branch        TEXT NOT NULL,
            commit_hash   TEXT NOT NULL,
            is_dirty      INTEGER NOT NULL DEFAULT 0,
            tracked_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_git_states_workspace_branch
            ON git_states(workspace_id, branch);
        ",
    )
    .map_err(|e| to_index_err(e.to_string()))?;
    Ok(())
}
