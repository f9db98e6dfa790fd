//! Session row mirror ops used by the session manager.

use rusqlite::{params, Connection};

use engram_core::{EngramResult, Session};

use super::event_crud::OptionalRow;
use crate::{from_sqlite_err, to_index_err};

/// Insert or replace a session row.
pub fn upsert_session(conn: &Connection, session: &Session) -> EngramResult<()> {
    let metadata_json =
        serde_json::to_string(&session.metadata).map_err(|e| to_index_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO sessions (id, start_time, last_activity, end_time, workspace_id, is_active, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            last_activity = excluded.last_activity,
            end_time = excluded.end_time,
            is_active = excluded.is_active,
            metadata = excluded.metadata",
        params![
            session.id,
            session.start_time.to_rfc3339(),
            session.last_activity.to_rfc3339(),
            session.end_time.map(|t| t.to_rfc3339()),
            session.workspace_id,
            session.is_active as i32,
            metadata_json,
        ],
    )
    .map_err(from_sqlite_err)?;
    Ok(())
}

/// Get a session row by id.
pub fn get_session(conn: &Connection, id: &str) -> EngramResult<Option<Session>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, start_time, last_activity, end_time, workspace_id, is_active, metadata
             FROM sessions WHERE id = ?1",
        )
        .map_err(|e| to_index_err(e.to_string()))?;

    let result = stmt
        .query_row(params![id], |row| Ok(row_to_session(row)))
        .optional()
        .map_err(|e| to_index_err(e.to_string()))?;

    match result {
        Some(Ok(session)) => Ok(Some(session)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

/// All rows still flagged active (for rehydration on startup).
pub fn active_sessions(conn: &Connection) -> EngramResult<Vec<Session>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, start_time, last_activity, end_time, workspace_id, is_active, metadata
             FROM sessions WHERE is_active = 1",
        )
        .map_err(|e| to_index_err(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| Ok(row_to_session(row)))
        .map_err(|e| to_index_err(e.to_string()))?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row.map_err(|e| to_index_err(e.to_string()))??);
    }
    Ok(sessions)
}

fn row_to_session(row: &rusqlite::Row<'_>) -> EngramResult<Session> {
    let parse_dt = |s: &str| -> EngramResult<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| to_index_err(format!("parse datetime '{s}': {e}")))
    };

    let start_str: String = row.get(1).map_err(|e| to_index_err(e.to_string()))?;
    let activity_str: String = row.get(2).map_err(|e| to_index_err(e.to_string()))?;
    let end_str: Option<String> = row.get(3).map_err(|e| to_index_err(e.to_string()))?;
    let metadata_json: String = row.get(6).map_err(|e| to_index_err(e.to_string()))?;

    Ok(Session {
        id: row.get(0).map_err(|e| to_index_err(e.to_string()))?,
        start_time: parse_dt(&start_str)?,
        last_activity: parse_dt(&activity_str)?,
        end_time: end_str.as_deref().map(parse_dt).transpose()?,
        workspace_id: row
            .get::<_, Option<String>>(4)
            .map_err(|e| to_index_err(e.to_string()))?
            .unwrap_or_default(),
        is_active: row
            .get::<_, i32>(5)
            .map_err(|e| to_index_err(e.to_string()))?
            != 0,
        metadata: serde_json::from_str(&metadata_json)
            .map_err(|e| to_index_err(format!("parse session metadata: {e}")))?,
    })
}
