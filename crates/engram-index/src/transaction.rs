//! Transaction context handed to `RelationalIndex::transaction` closures.

use rusqlite::{Connection, ToSql};

use engram_core::EngramResult;

use crate::to_index_err;

/// Scoped access to a connection inside an open transaction.
pub struct TxContext<'a> {
    conn: &'a Connection,
}

impl<'a> TxContext<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Execute a statement, returning the affected row count.
    pub fn run(&self, sql: &str, params: &[&dyn ToSql]) -> EngramResult<usize> {
        self.conn
            .execute(sql, params)
            .map_err(crate::from_sqlite_err)
    }

    /// Fetch at most one row, mapped through `f`.
    pub fn get<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> EngramResult<Option<T>>
    where
        F: FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        match self.conn.query_row(sql, params, f) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(to_index_err(e.to_string())),
        }
    }

    /// Fetch all rows, mapped through `f`.
    pub fn all<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> EngramResult<Vec<T>>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| to_index_err(e.to_string()))?;
        let rows = stmt
            .query_map(params, f)
            .map_err(|e| to_index_err(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| to_index_err(e.to_string()))?);
        }
        Ok(out)
    }
}

/// Run `f` inside a transaction on the given connection; commit on Ok,
/// roll back on Err.
pub(crate) fn with_transaction<T, F>(conn: &Connection, f: F) -> EngramResult<T>
where
    F: FnOnce(&TxContext<'_>) -> EngramResult<T>,
{
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_index_err(format!("transaction begin: {e}")))?;
    let ctx = TxContext::new(&tx);
    match f(&ctx) {
        Ok(v) => {
            tx.commit()
                .map_err(|e| to_index_err(format!("transaction commit: {e}")))?;
            Ok(v)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}
