//! Integration tests for the embedded adapter: lifecycle, statements, pool
//! status, health checks and the query logger.

use dbkit::config::{BackendKind, ConnectionConfig};
use dbkit::db::{Adapter, LogKind, MemoryQueryLogger, SqlAdapter};
use dbkit::error::DbError;
use dbkit::models::QueryParam;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

async fn memory_adapter() -> SqlAdapter {
    let adapter = SqlAdapter::new(ConnectionConfig::sqlite_memory()).unwrap();
    assert_ok!(adapter.connect().await);
    adapter
        .execute(
            "CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, qty INTEGER)",
            &[],
        )
        .await
        .unwrap();
    adapter
}

#[tokio::test]
async fn test_connect_close_lifecycle() {
    let adapter = SqlAdapter::new(ConnectionConfig::sqlite_memory()).unwrap();
    assert!(!adapter.is_connected());

    assert_ok!(adapter.connect().await);
    assert!(adapter.is_connected());
    assert!(adapter.server_version().is_some());

    // Second connect is a no-op
    assert_ok!(adapter.connect().await);

    assert_ok!(adapter.close().await);
    assert!(!adapter.is_connected());
    assert_ok!(adapter.close().await);
}

#[tokio::test]
async fn test_connect_without_filename_fails_and_can_retry() {
    let adapter = SqlAdapter::new(ConnectionConfig::new(BackendKind::Sqlite)).unwrap();
    let err = assert_err!(adapter.connect().await);
    assert!(matches!(err, DbError::Connection { .. }));
    assert!(err.suggestion().is_some());
    assert!(!adapter.is_connected());

    // Still disconnected, so a second attempt fails the same way instead of hanging
    assert!(matches!(
        adapter.connect().await,
        Err(DbError::Connection { .. })
    ));
}

#[tokio::test]
async fn test_statements_require_connection() {
    let adapter = SqlAdapter::new(ConnectionConfig::sqlite_memory()).unwrap();
    assert!(matches!(
        adapter.query("SELECT 1", &[]).await,
        Err(DbError::NotConnected { .. })
    ));
    assert!(matches!(
        adapter.execute("DELETE FROM items", &[]).await,
        Err(DbError::NotConnected { .. })
    ));
    assert!(matches!(
        adapter.pool_status().await,
        Err(DbError::NotConnected { .. })
    ));
}

#[tokio::test]
async fn test_insert_and_query() {
    let adapter = memory_adapter().await;

    let result = adapter
        .execute(
            "INSERT INTO items (name, qty) VALUES (?, ?)",
            &[QueryParam::from("apple"), QueryParam::Int(3)],
        )
        .await
        .unwrap();
    assert_eq!(result.affected_rows, 1);
    assert_eq!(result.last_insert_id, Some(1));

    let rows = adapter
        .query("SELECT id, name, qty FROM items WHERE name = ?", &[QueryParam::from("apple")])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "apple");
    assert_eq!(rows[0]["qty"], 3);
    let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(columns, vec!["id", "name", "qty"]);

    // Zero matches is an empty result, not an error
    let none = adapter
        .query("SELECT * FROM items WHERE name = ?", &[QueryParam::from("pear")])
        .await
        .unwrap();
    assert!(none.is_empty());

    let update = adapter
        .execute("UPDATE items SET qty = qty + 1", &[])
        .await
        .unwrap();
    assert_eq!(update.affected_rows, 1);
    assert_eq!(update.last_insert_id, None);
}

#[tokio::test]
async fn test_question_mark_inside_literal_is_not_a_placeholder() {
    let adapter = memory_adapter().await;
    adapter
        .execute(
            "INSERT INTO items (name, qty) VALUES ('why?', ?)",
            &[QueryParam::Int(1)],
        )
        .await
        .unwrap();

    let rows = adapter
        .query("SELECT name FROM items WHERE name = 'why?' AND qty = ?", &[1.into()])
        .await
        .unwrap();
    assert_eq!(rows[0]["name"], "why?");
}

#[tokio::test]
async fn test_placeholder_count_mismatch_is_rejected() {
    let adapter = memory_adapter().await;
    let err = assert_err!(
        adapter
            .query("SELECT * FROM items WHERE id = ? AND name = ?", &[QueryParam::Int(1)])
            .await
    );
    assert!(matches!(err, DbError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_backend_errors_keep_native_cause() {
    let adapter = memory_adapter().await;

    let err = assert_err!(adapter.query("SELECT * FROM missing_table", &[]).await);
    assert!(matches!(err, DbError::Query { .. }));
    assert!(err.to_string().contains("missing_table"));
    assert!(std::error::Error::source(&err).is_some());

    let err = assert_err!(
        adapter
            .execute("INSERT INTO items (name) VALUES (NULL)", &[])
            .await
    );
    assert!(matches!(err, DbError::Execute { .. }));
}

#[tokio::test]
async fn test_returning_clause_populates_rows() {
    let adapter = memory_adapter().await;
    let result = adapter
        .execute(
            "INSERT INTO items (name, qty) VALUES (?, ?), (?, ?) RETURNING id, name",
            &["a".into(), 1.into(), "b".into(), 2.into()],
        )
        .await
        .unwrap();
    let rows = result.rows.unwrap();
    assert_eq!(result.affected_rows, 2);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["name"], "b");
}

#[tokio::test]
async fn test_value_types_round_trip() {
    let adapter = SqlAdapter::new(ConnectionConfig::sqlite_memory()).unwrap();
    adapter.connect().await.unwrap();
    adapter
        .execute(
            "CREATE TABLE kinds (i INTEGER, r REAL, t TEXT, b BLOB, n TEXT)",
            &[],
        )
        .await
        .unwrap();
    adapter
        .execute(
            "INSERT INTO kinds VALUES (?, ?, ?, ?, ?)",
            &[
                QueryParam::Int(-7),
                QueryParam::Float(2.5),
                QueryParam::from("héllo"),
                QueryParam::Bytes(vec![0xde, 0xad]),
                QueryParam::Null,
            ],
        )
        .await
        .unwrap();

    let rows = adapter.query("SELECT * FROM kinds", &[]).await.unwrap();
    assert_eq!(rows[0]["i"], -7);
    assert_eq!(rows[0]["r"], 2.5);
    assert_eq!(rows[0]["t"], "héllo");
    assert_eq!(rows[0]["b"], "3q0=");
    assert!(rows[0]["n"].is_null());
}

#[tokio::test]
async fn test_pool_status_and_health_check() {
    let adapter = memory_adapter().await;

    let status = adapter.pool_status().await.unwrap();
    assert!(status.active + status.idle <= status.total);
    assert_eq!(status.total, 1);

    assert!(adapter.last_health_check().is_none());
    let health = adapter.health_check().await;
    assert!(health.healthy);
    assert!(health.error.is_none());
    assert_eq!(adapter.last_health_check(), Some(health.timestamp));

    adapter.close().await.unwrap();
    let health = adapter.health_check().await;
    assert!(!health.healthy);
    assert!(health.error.is_some());
    assert!(matches!(
        adapter.pool_status().await,
        Err(DbError::NotConnected { .. })
    ));
}

#[tokio::test]
async fn test_query_logger_receives_every_statement() {
    let adapter = memory_adapter().await;
    assert!(adapter.query_logger().is_none());

    let logger = Arc::new(MemoryQueryLogger::new());
    adapter.set_query_logger(Some(logger.clone()));
    assert!(adapter.query_logger().is_some());

    adapter
        .execute("INSERT INTO items (name) VALUES (?)", &["x".into()])
        .await
        .unwrap();
    adapter.query("SELECT * FROM items", &[]).await.unwrap();
    let _ = adapter.query("SELECT * FROM nope", &[]).await;
    adapter.health_check().await;

    let entries = logger.entries();
    let kinds: Vec<LogKind> = entries.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![LogKind::Execute, LogKind::Query, LogKind::Error]);
    assert_eq!(entries[0].params, vec![QueryParam::from("x")]);
    assert!(entries[2].error.is_some());
    assert_eq!(logger.health_checks().len(), 1);

    // Detached loggers see nothing further
    adapter.set_query_logger(None);
    adapter.query("SELECT 1", &[]).await.unwrap();
    assert_eq!(logger.entries().len(), 3);
}

#[tokio::test]
async fn test_file_database_persists_across_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    let config = ConnectionConfig::sqlite(path.to_string_lossy().to_string());

    let adapter = SqlAdapter::new(config.clone()).unwrap();
    adapter.connect().await.unwrap();
    adapter
        .execute("CREATE TABLE notes (body TEXT)", &[])
        .await
        .unwrap();
    adapter
        .execute("INSERT INTO notes VALUES (?)", &["kept".into()])
        .await
        .unwrap();
    adapter.close().await.unwrap();
    assert!(path.exists());

    let reopened = SqlAdapter::new(config).unwrap();
    reopened.connect().await.unwrap();
    let rows = reopened.query("SELECT body FROM notes", &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["body"], "kept");
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_memory_databases_are_private() {
    let first = memory_adapter().await;
    let second = SqlAdapter::new(ConnectionConfig::sqlite_memory()).unwrap();
    second.connect().await.unwrap();
    assert!(second.query("SELECT * FROM items", &[]).await.is_err());
    assert!(first.query("SELECT * FROM items", &[]).await.is_ok());
}
