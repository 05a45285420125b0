//! Query observer hook.
//!
//! Adapters report every statement that reaches the backend, and every health
//! check, to the logger currently attached to them. The logger is owned by the
//! caller; adapters only hold a shared handle.

use crate::models::{HealthCheckResult, QueryParam};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Query,
    Execute,
    Error,
}

/// One statement that reached the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryLogEntry {
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub sql: String,
    pub params: Vec<QueryParam>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_millis() as u64)
    }
}

/// Observer for statements and health checks.
pub trait QueryLogger: Send + Sync {
    fn log(&self, entry: &QueryLogEntry);

    fn health_check(&self, _result: &HealthCheckResult) {}
}

/// Forwards entries to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingQueryLogger;

impl QueryLogger for TracingQueryLogger {
    fn log(&self, entry: &QueryLogEntry) {
        match entry.kind {
            LogKind::Error => warn!(
                sql = %entry.sql,
                params = entry.params.len(),
                duration_ms = entry.duration.as_millis() as u64,
                error = ?entry.error,
                "Statement failed"
            ),
            kind => debug!(
                kind = ?kind,
                sql = %entry.sql,
                params = entry.params.len(),
                duration_ms = entry.duration.as_millis() as u64,
                "Statement completed"
            ),
        }
    }

    fn health_check(&self, result: &HealthCheckResult) {
        if result.healthy {
            debug!(latency_ms = result.latency_ms, "Health check passed");
        } else {
            warn!(
                latency_ms = result.latency_ms,
                error = ?result.error,
                "Health check failed"
            );
        }
    }
}

/// Replaceable logger handle shared by an adapter and its transaction views.
#[derive(Default)]
pub(crate) struct LoggerSlot {
    inner: RwLock<Option<Arc<dyn QueryLogger>>>,
}

impl LoggerSlot {
    pub fn set(&self, logger: Option<Arc<dyn QueryLogger>>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = logger;
    }

    pub fn get(&self) -> Option<Arc<dyn QueryLogger>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn emit(
        &self,
        kind: LogKind,
        sql: &str,
        params: &[QueryParam],
        duration: Duration,
        error: Option<String>,
    ) {
        if let Some(logger) = self.get() {
            logger.log(&QueryLogEntry {
                kind,
                sql: sql.to_string(),
                params: params.to_vec(),
                duration,
                timestamp: Utc::now(),
                error,
            });
        }
    }

    pub fn emit_health(&self, result: &HealthCheckResult) {
        if let Some(logger) = self.get() {
            logger.health_check(result);
        }
    }
}

impl std::fmt::Debug for LoggerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerSlot")
            .field("attached", &self.get().is_some())
            .finish()
    }
}

/// Collects entries in memory; handy for assertions.
#[derive(Debug, Default)]
pub struct MemoryQueryLogger {
    entries: std::sync::Mutex<Vec<QueryLogEntry>>,
    health_checks: std::sync::Mutex<Vec<HealthCheckResult>>,
}

impl MemoryQueryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<QueryLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn health_checks(&self) -> Vec<HealthCheckResult> {
        self.health_checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl QueryLogger for MemoryQueryLogger {
    fn log(&self, entry: &QueryLogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
    }

    fn health_check(&self, result: &HealthCheckResult) {
        self.health_checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result.clone());
    }
}
