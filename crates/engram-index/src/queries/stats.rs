//! Aggregations powering `statistics()`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use engram_core::EngramResult;

use crate::to_index_err;

/// Aggregate statistics over the memories table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStatistics {
    pub total_memories: usize,
    /// Sum of content bytes.
    pub total_size: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub by_type: HashMap<String, usize>,
}

/// Compute statistics in a single pass over the aggregate queries.
pub fn collect(conn: &Connection) -> EngramResult<IndexStatistics> {
    let (total_memories, total_size): (i64, i64) = conn
        .query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(CAST(content AS BLOB))), 0) FROM memories",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|e| to_index_err(e.to_string()))?;

    let (oldest_str, newest_str): (Option<String>, Option<String>) = conn
        .query_row(
            "SELECT MIN(timestamp), MAX(timestamp) FROM memories",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|e| to_index_err(e.to_string()))?;

    let parse_dt = |s: String| -> EngramResult<DateTime<Utc>> {
        chrono::DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| to_index_err(format!("parse timestamp '{s}': {e}")))
    };

    let mut by_type = HashMap::new();
    let mut stmt = conn
        .prepare("SELECT event_type, COUNT(*) FROM memories GROUP BY event_type")
        .map_err(|e| to_index_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(|e| to_index_err(e.to_string()))?;
    for row in rows {
        let (event_type, count) = row.map_err(|e| to_index_err(e.to_string()))?;
        by_type.insert(event_type, count as usize);
    }

    Ok(IndexStatistics {
        total_memories: total_memories as usize,
        total_size: total_size as u64,
        oldest: oldest_str.map(parse_dt).transpose()?,
        newest: newest_str.map(parse_dt).transpose()?,
        by_type,
    })
}
