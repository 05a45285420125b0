//! SQLite connect options, pool construction and statement execution.
//!
//! The pool is pinned to a single connection that never idles out, so an
//! in-memory database lives exactly as long as the adapter stays connected.

use super::{DbPool, connection_error};
use crate::config::{BackendKind, ConnectionConfig, SQLITE_MEMORY};
use crate::db::params::bind_sqlite;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{ExecuteResult, QueryParam, Row};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, warn};

pub(super) fn connect_options(config: &ConnectionConfig) -> DbResult<SqliteConnectOptions> {
    let filename = config.filename.as_deref().ok_or_else(|| {
        DbError::connection(
            "SQLite requires a filename",
            "Set `filename` to a database file path or :memory:",
        )
    })?;

    if filename == SQLITE_MEMORY {
        return SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            DbError::connection(
                format!("Invalid SQLite connection string: {}", e),
                "Check the connection URL format: sqlite:path/to/db.sqlite",
            )
        });
    }

    Ok(SqliteConnectOptions::new()
        .filename(filename)
        .create_if_missing(true))
}

pub(super) async fn open(config: &ConnectionConfig) -> DbResult<DbPool> {
    let options = connect_options(config)?;
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .acquire_timeout(config.pool.acquire_timeout_or_default())
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| connection_error(BackendKind::Sqlite, e))?;
    Ok(DbPool::SQLite(pool))
}

pub(super) async fn server_version(pool: &SqlitePool) -> Option<String> {
    match sqlx::query_scalar::<_, String>("SELECT sqlite_version()")
        .fetch_one(pool)
        .await
    {
        Ok(version) => {
            debug!(version = %version, "Got server version");
            Some(version)
        }
        Err(e) => {
            warn!(error = %e, "Failed to get server version");
            None
        }
    }
}

pub(super) async fn fetch_all<'e, E>(
    executor: E,
    sql: &'e str,
    params: &'e [QueryParam],
) -> Result<Vec<Row>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = if params.is_empty() {
        executor.fetch_all(sql).await?
    } else {
        bind_sqlite(sql, params).fetch_all(executor).await?
    };
    Ok(rows.iter().map(RowToJson::to_json_map).collect())
}

pub(super) async fn execute<'e, E>(
    executor: E,
    sql: &'e str,
    params: &'e [QueryParam],
) -> Result<ExecuteResult, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = if params.is_empty() {
        executor.execute(sql).await?
    } else {
        bind_sqlite(sql, params).execute(executor).await?
    };
    let mut outcome = ExecuteResult::affected(result.rows_affected());
    // last_insert_rowid() is sticky per connection, so only trust it right after an insert.
    let id = result.last_insert_rowid();
    if id != 0 && result.rows_affected() > 0 && is_insert(sql) {
        outcome.last_insert_id = Some(id);
    }
    Ok(outcome)
}

fn is_insert(sql: &str) -> bool {
    let head: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    head.eq_ignore_ascii_case("insert") || head.eq_ignore_ascii_case("replace")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_filename_is_a_connection_error() {
        let config = ConnectionConfig::new(BackendKind::Sqlite);
        assert!(matches!(
            connect_options(&config),
            Err(DbError::Connection { .. })
        ));
    }

    #[test]
    fn test_is_insert() {
        assert!(is_insert("  INSERT INTO t VALUES (1)"));
        assert!(is_insert("replace into t values (1)"));
        assert!(!is_insert("UPDATE t SET a = 1"));
        assert!(!is_insert("WITH x AS (SELECT 1) INSERT INTO t SELECT * FROM x"));
    }

    #[test]
    fn test_file_options_create_if_missing() {
        let config = ConnectionConfig::sqlite("data/app.db");
        let options = connect_options(&config).unwrap();
        assert!(options.get_filename().ends_with("app.db"));
    }
}
