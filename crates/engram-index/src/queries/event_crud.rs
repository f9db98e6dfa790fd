//! Insert, get, and bulk ops for event rows.

use rusqlite::{params, Connection};

use engram_core::{Event, EngramResult};

use crate::{from_sqlite_err, to_index_err};

/// Insert a single event row inside a transaction.
pub fn insert_event(conn: &Connection, event: &Event) -> EngramResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_index_err(format!("insert_event begin: {e}")))?;

    match insert_event_inner(&tx, event) {
        Ok(()) => {
            tx.commit()
                .map_err(|e| to_index_err(format!("insert_event commit: {e}")))?;
            Ok(())
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Inner insert logic, operating on the provided connection (or transaction via Deref).
fn insert_event_inner(conn: &Connection, event: &Event) -> EngramResult<()> {
    let metadata_json =
        serde_json::to_string(&event.metadata).map_err(|e| to_index_err(e.to_string()))?;

    conn.execute(
        "INSERT INTO memories (
            id, event_type, content, metadata, timestamp, session_id,
            workspace_id, git_branch, git_commit
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            event.id,
            event.event_type.as_str(),
            event.content,
            metadata_json,
            event.timestamp.to_rfc3339(),
            event.session_id,
            event.workspace_id,
            event.git_branch,
            event.git_commit,
        ],
    )
    .map_err(from_sqlite_err)?;
    Ok(())
}

/// Bulk insert inside one IMMEDIATE transaction. If any row violates a
/// constraint, nothing is written.
pub fn bulk_insert(conn: &Connection, events: &[Event]) -> EngramResult<usize> {
    if events.is_empty() {
        return Ok(0);
    }
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| to_index_err(e.to_string()))?;

    let mut count = 0;
    for event in events {
        if let Err(e) = insert_event_inner(conn, event) {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
        count += 1;
    }

    conn.execute_batch("COMMIT")
        .map_err(|e| to_index_err(e.to_string()))?;
    Ok(count)
}

/// Get a single event by id.
pub fn get_event(conn: &Connection, id: &str) -> EngramResult<Option<Event>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, event_type, content, metadata, timestamp, session_id,
                    workspace_id, git_branch, git_commit
             FROM memories WHERE id = ?1",
        )
        .map_err(|e| to_index_err(e.to_string()))?;

    let result = stmt
        .query_row(params![id], |row| Ok(row_to_event(row)))
        .optional()
        .map_err(|e| to_index_err(e.to_string()))?;

    match result {
        Some(Ok(event)) => Ok(Some(event)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

/// Bulk get by ids, preserving the order of the input list. Missing ids
/// are skipped silently.
pub fn bulk_get(conn: &Connection, ids: &[String]) -> EngramResult<Vec<Event>> {
    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(event) = get_event(conn, id)? {
            results.push(event);
        }
    }
    Ok(results)
}

/// Parse a row from the memories table into an Event.
pub(crate) fn row_to_event(row: &rusqlite::Row<'_>) -> EngramResult<Event> {
    let event_type_str: String = row.get(1).map_err(|e| to_index_err(e.to_string()))?;
    let metadata_json: String = row.get(3).map_err(|e| to_index_err(e.to_string()))?;
    let timestamp_str: String = row.get(4).map_err(|e| to_index_err(e.to_string()))?;

    let event_type = event_type_str
        .parse()
        .map_err(|_| to_index_err(format!("parse event_type '{event_type_str}'")))?;
    let metadata = serde_json::from_str(&metadata_json)
        .map_err(|e| to_index_err(format!("parse metadata: {e}")))?;
    let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp_str)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| to_index_err(format!("parse timestamp '{timestamp_str}': {e}")))?;

    Ok(Event {
        id: row.get(0).map_err(|e| to_index_err(e.to_string()))?,
        event_type,
        content: row.get(2).map_err(|e| to_index_err(e.to_string()))?,
        metadata,
        timestamp,
        session_id: row.get(5).map_err(|e| to_index_err(e.to_string()))?,
        workspace_id: row.get(6).map_err(|e| to_index_err(e.to_string()))?,
        git_branch: row.get(7).map_err(|e| to_index_err(e.to_string()))?,
        git_commit: row.get(8).map_err(|e| to_index_err(e.to_string()))?,
    })
}

/// Helper trait to make `query_row` return `Option` on not-found.
pub(crate) trait OptionalRow<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalRow<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
