//! Git-state tracking rows.

use rusqlite::{params, Connection};

use engram_core::EngramResult;

use crate::from_sqlite_err;

/// A tracked git state for a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitState {
    pub workspace_id: String,
    pub branch: String,
    pub commit_hash: String,
    pub is_dirty: bool,
}

/// Record the current git state of a workspace.
pub fn record_git_state(conn: &Connection, state: &GitState) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO git_states (workspace_id, branch, commit_hash, is_dirty)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            state.workspace_id,
            state.branch,
            state.commit_hash,
            state.is_dirty as i32
        ],
    )
    .map_err(from_sqlite_err)?;
    Ok(())
}

/// Latest tracked state for a workspace branch.
pub fn latest_git_state(
    conn: &Connection,
    workspace_id: &str,
    branch: &str,
) -> EngramResult<Option<GitState>> {
    let mut stmt = conn
        .prepare(
            "SELECT workspace_id, branch, commit_hash, is_dirty
             FROM git_states
             WHERE workspace_id = ?1 AND branch = ?2
             ORDER BY tracked_at DESC LIMIT 1",
        )
        .map_err(|e| crate::to_index_err(e.to_string()))?;

    let mut rows = stmt
        .query_map(params![workspace_id, branch], |row| {
            Ok(GitState {
                workspace_id: row.get(0)?,
                branch: row.get(1)?,
                commit_hash: row.get(2)?,
                is_dirty: row.get::<_, i32>(3)? != 0,
            })
        })
        .map_err(|e| crate::to_index_err(e.to_string()))?;

    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| crate::to_index_err(e.to_string()))?)),
        None => Ok(None),
    }
}
