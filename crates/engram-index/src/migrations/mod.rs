//! Named, ordered migrations. Each runs in its own transaction and records
//! itself in the `migrations` table; already-applied names are skipped.

mod v001_memories;
mod v002_sessions;
mod v003_git_states;
mod v004_vector_mappings;

use rusqlite::Connection;

use engram_core::EngramResult;

use crate::to_index_err;

type MigrationFn = fn(&Connection) -> EngramResult<()>;

/// The ordered migration list. Append-only.
const MIGRATIONS: &[(&str, MigrationFn)] = &[
    ("v001_memories", v001_memories::migrate),
    ("v002_sessions", v002_sessions::migrate),
    ("v003_git_states", v003_git_states::migrate),
    ("v004_vector_mappings", v004_vector_mappings::migrate),
];

/// Run all pending migrations on the given connection.
pub fn run_migrations(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS migrations (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            applied_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )
    .map_err(|e| to_index_err(e.to_string()))?;

    for (name, migrate) in MIGRATIONS {
        if is_applied(conn, name)? {
            continue;
        }
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| to_index_err(format!("migration {name} begin: {e}")))?;
        match migrate(&tx).and_then(|()| record(&tx, name)) {
            Ok(()) => {
                tx.commit()
                    .map_err(|e| to_index_err(format!("migration {name} commit: {e}")))?;
                tracing::debug!(migration = name, "applied");
            }
            Err(e) => {
                let _ = tx.rollback();
                return Err(e);
            }
        }
    }
    Ok(())
}

fn is_applied(conn: &Connection, name: &str) -> EngramResult<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?1)",
        [name],
        |row| row.get(0),
    )
    .map_err(|e| to_index_err(e.to_string()))
}

fn record(conn: &Connection, name: &str) -> EngramResult<()> {
    conn.execute("INSERT INTO migrations (name) VALUES (?1)", [name])
        .map_err(|e| to_index_err(e.to_string()))?;
    Ok(())
}
