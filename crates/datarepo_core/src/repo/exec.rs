//! Statement execution shared by resource and API repositories.

use crate::model::{FieldValue, Record};
use crate::query::sql::SelectQuery;
use crate::repo::error::RepoResult;
use log::{debug, error};
use rusqlite::{params_from_iter, Connection};
use std::time::Instant;

/// Runs `query` and decodes every row with the query's projection.
pub(crate) fn fetch_records(conn: &Connection, query: &SelectQuery) -> RepoResult<Vec<Record>> {
    let started_at = Instant::now();
    let (sql, binds) = query.to_sql();

    let result = (|| -> RepoResult<Vec<Record>> {
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(Record::from_row(row, query.columns())?);
        }
        Ok(records)
    })();

    match &result {
        Ok(records) => debug!(
            "event=repo_query module=repo status=ok table={} rows={} duration_ms={}",
            query.table(),
            records.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=repo_query module=repo status=error table={} duration_ms={} error={}",
            query.table(),
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

/// Counts rows matching `query`'s conditions, ignoring order and paging.
pub(crate) fn count_records(conn: &Connection, query: &SelectQuery) -> RepoResult<u64> {
    let (sql, binds) = query.to_count_sql();
    let count: i64 = conn.query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Executes a write statement and returns the affected-row count.
pub(crate) fn execute_write(
    conn: &Connection,
    operation: &str,
    table: &str,
    sql: &str,
    binds: Vec<FieldValue>,
) -> RepoResult<usize> {
    let started_at = Instant::now();
    match conn.execute(sql, params_from_iter(binds)) {
        Ok(changed) => {
            debug!(
                "event=repo_write module=repo status=ok op={} table={} rows={} duration_ms={}",
                operation,
                table,
                changed,
                started_at.elapsed().as_millis()
            );
            Ok(changed)
        }
        Err(err) => {
            error!(
                "event=repo_write module=repo status=error op={} table={} duration_ms={} error={}",
                operation,
                table,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}
