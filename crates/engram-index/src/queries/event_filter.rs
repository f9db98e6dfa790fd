//! Dynamic filtered queries over event rows.
//!
//! WHERE clauses are composed from the filter fields and bound as
//! parameters; values are never concatenated into the SQL text.

use rusqlite::{Connection, ToSql};

use engram_core::{EngramResult, Event, OrderBy, OrderDirection, QueryFilters};

use super::event_crud::row_to_event;
use crate::to_index_err;

const SELECT_COLUMNS: &str = "id, event_type, content, metadata, timestamp, session_id,
    workspace_id, git_branch, git_commit";

/// Run a filtered query, ordered and bounded per the filter.
pub fn filter_events(conn: &Connection, filters: &QueryFilters) -> EngramResult<Vec<Event>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(ref workspace_id) = filters.workspace_id {
        clauses.push(format!("workspace_id = ?{}", params.len() + 1));
        params.push(Box::new(workspace_id.clone()));
    }
    if let Some(ref session_id) = filters.session_id {
        clauses.push(format!("session_id = ?{}", params.len() + 1));
        params.push(Box::new(session_id.clone()));
    }
    if let Some(event_type) = filters.event_type {
        clauses.push(format!("event_type = ?{}", params.len() + 1));
        params.push(Box::new(event_type.as_str().to_string()));
    }
    if let Some(ref git_branch) = filters.git_branch {
        clauses.push(format!("git_branch = ?{}", params.len() + 1));
        params.push(Box::new(git_branch.clone()));
    }
    if let Some(start) = filters.start_time {
        clauses.push(format!("timestamp >= ?{}", params.len() + 1));
        params.push(Box::new(start.to_rfc3339()));
    }
    if let Some(end) = filters.end_time {
        clauses.push(format!("timestamp <= ?{}", params.len() + 1));
        params.push(Box::new(end.to_rfc3339()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    // Column and direction come from closed enums, safe to interpolate.
    let order_by = filters.order_by.unwrap_or(OrderBy::Timestamp);
    let direction = filters.order_direction.unwrap_or(OrderDirection::Asc);
    let mut sql = format!(
        "SELECT {SELECT_COLUMNS} FROM memories{where_sql} ORDER BY {} {}",
        order_by.column(),
        direction.sql(),
    );

    if let Some(limit) = filters.limit {
        sql.push_str(&format!(" LIMIT ?{}", params.len() + 1));
        params.push(Box::new(limit as i64));
    }

    let mut stmt = conn.prepare(&sql).map_err(|e| to_index_err(e.to_string()))?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let rows = stmt
        .query_map(param_refs.as_slice(), |row| Ok(row_to_event(row)))
        .map_err(|e| to_index_err(e.to_string()))?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row.map_err(|e| to_index_err(e.to_string()))??);
    }
    Ok(events)
}

/// Count rows in a table. The table name comes from a closed allow-list.
pub fn count(conn: &Connection, table: &str) -> EngramResult<usize> {
    const TABLES: &[&str] = &[
        "memories",
        "sessions",
        "git_states",
        "vector_mappings",
        "migrations",
    ];
    if !TABLES.contains(&table) {
        return Err(engram_core::EngramError::validation(
            "table",
            format!("unknown table '{table}'"),
        ));
    }
    let n: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .map_err(|e| to_index_err(e.to_string()))?;
    Ok(n as usize)
}
