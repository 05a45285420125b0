//! The uniform adapter contract.
//!
//! Every backend implements [`Adapter`]. Consumers depend on this trait only,
//! never on a driver's native handle.
//!
//! # Transactions
//!
//! [`AdapterExt::transaction`] runs a callback inside a transaction scope. The
//! callback receives a scoped view (`Arc<dyn Adapter>`) bound to the one
//! connection or session the scope owns. Calling `transaction` again on that
//! view nests:
//!
//! - Relational backends push a savepoint. A failing nested scope rolls back to
//!   it and leaves the outer scope usable.
//! - The document backend has no savepoint primitive. A nested scope shares the
//!   outer session, and a failing nested scope dooms the whole outer
//!   transaction: the outermost exit aborts, even if the outer callback caught
//!   the nested error.
//!
//! Only the outermost scope issues COMMIT or ROLLBACK. Errors from the callback
//! are returned to the caller unchanged after the rollback.

use crate::config::{BackendKind, ConnectionConfig};
use crate::db::logger::{LoggerSlot, QueryLogger};
use crate::error::{DbError, DbResult};
use crate::models::{
    ConnectionState, ExecuteResult, HealthCheckResult, PoolStatus, QueryParam, Row,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Type-erased transaction body handed to [`Adapter::run_transaction`].
pub type ScopeFn<'a> = Box<dyn FnOnce(Arc<dyn Adapter>) -> BoxFuture<'a, DbResult<()>> + Send + 'a>;

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Backend kind this adapter talks to.
    fn backend(&self) -> BackendKind;

    /// Current lifecycle state (no network round trip).
    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Open the backend connection or pool, honoring the retry policy.
    ///
    /// A no-op when already connected. On failure the adapter stays
    /// disconnected and can be retried.
    async fn connect(&self) -> DbResult<()>;

    /// Release all backend resources. Closing twice is a no-op; closing a
    /// transaction view is rejected with `Transaction`.
    async fn close(&self) -> DbResult<()>;

    /// Read path. Zero matching rows is an empty vector, never an error.
    async fn query(&self, statement: &str, params: &[QueryParam]) -> DbResult<Vec<Row>>;

    /// Write path.
    async fn execute(&self, statement: &str, params: &[QueryParam]) -> DbResult<ExecuteResult>;

    /// Object-safe transaction primitive; see [`AdapterExt::transaction`].
    async fn run_transaction(&self, scope: ScopeFn<'_>) -> DbResult<()>;

    async fn create_savepoint(&self, name: &str) -> DbResult<()>;

    /// Roll back to the newest live savepoint called `name`, destroying it and
    /// every savepoint created after it.
    async fn rollback_to_savepoint(&self, name: &str) -> DbResult<()>;

    /// Release the newest live savepoint called `name`, destroying it and
    /// every savepoint created after it.
    async fn release_savepoint(&self, name: &str) -> DbResult<()>;

    /// Nesting depth of this view: 0 outside a scope, 1 for the outermost scope.
    fn transaction_depth(&self) -> usize {
        0
    }

    fn in_transaction(&self) -> bool {
        self.transaction_depth() > 0
    }

    /// Live pool occupancy. Fails with `NotConnected` unless connected.
    async fn pool_status(&self) -> DbResult<PoolStatus>;

    /// Round-trip check. Never fails; problems are reported in the result.
    async fn health_check(&self) -> HealthCheckResult;

    fn last_health_check(&self) -> Option<DateTime<Utc>>;

    /// Attach (or with `None`, detach) the statement observer.
    fn set_query_logger(&self, logger: Option<Arc<dyn QueryLogger>>);

    fn query_logger(&self) -> Option<Arc<dyn QueryLogger>>;

    /// Server version captured at connect time.
    fn server_version(&self) -> Option<String> {
        None
    }
}

/// Generic conveniences over [`Adapter`], available on `dyn Adapter` too.
pub trait AdapterExt: Adapter {
    /// Run `f` inside a transaction scope and return its value.
    ///
    /// When `f` fails, the scope is rolled back and `f`'s own error is
    /// returned as-is. Errors raised by the engine itself (BEGIN or COMMIT
    /// failures, discipline violations) are converted with `E::from`.
    fn transaction<'a, T, E, F, Fut>(&'a self, f: F) -> BoxFuture<'a, Result<T, E>>
    where
        T: Send + 'a,
        E: From<DbError> + Send + 'a,
        F: FnOnce(Arc<dyn Adapter>) -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
    {
        Box::pin(async move {
            let mut outcome: Option<Result<T, E>> = None;
            let slot = &mut outcome;
            let scope: ScopeFn<'_> = Box::new(move |tx| {
                Box::pin(async move {
                    match f(tx).await {
                        Ok(value) => {
                            *slot = Some(Ok(value));
                            Ok(())
                        }
                        Err(err) => {
                            *slot = Some(Err(err));
                            Err(DbError::transaction("transaction body failed"))
                        }
                    }
                })
            });
            let result = self.run_transaction(scope).await;

            match (outcome, result) {
                (Some(Err(err)), _) => Err(err),
                (Some(Ok(value)), Ok(())) => Ok(value),
                (_, Err(err)) => Err(E::from(err)),
                (None, Ok(())) => Err(E::from(DbError::internal(
                    "transaction completed without running its body",
                ))),
            }
        })
    }
}

impl<A: Adapter + ?Sized> AdapterExt for A {}

/// State shared by every adapter implementation: lifecycle, observer, last health check.
#[derive(Debug, Default)]
pub(crate) struct AdapterCore {
    state: AtomicU8,
    pub logger: LoggerSlot,
    last_health_check: Mutex<Option<DateTime<Utc>>>,
}

impl AdapterCore {
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Atomically move from `from` to `to`; false if the state was something else.
    pub fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claim the `Connecting` state for a connect attempt.
    ///
    /// Returns `Ok(false)` when already connected (nothing to do).
    pub fn begin_connect(&self, backend: BackendKind) -> DbResult<bool> {
        if self.transition(ConnectionState::Disconnected, ConnectionState::Connecting) {
            return Ok(true);
        }
        match self.state() {
            ConnectionState::Connected => Ok(false),
            state => Err(DbError::connection(
                format!("Cannot connect {} adapter while {:?}", backend, state),
                "Wait for the pending connect or close to finish",
            )),
        }
    }

    /// Claim the `Closing` state for a close.
    ///
    /// Returns `Ok(false)` when there is nothing to close. A close racing a
    /// connect attempt is refused rather than silently dropped.
    pub fn begin_close(&self, backend: BackendKind) -> DbResult<bool> {
        if self.transition(ConnectionState::Connected, ConnectionState::Closing) {
            return Ok(true);
        }
        match self.state() {
            ConnectionState::Connecting => Err(DbError::connection(
                format!("Cannot close {} adapter while it is connecting", backend),
                "Wait for the pending connect to finish, then close",
            )),
            _ => Ok(false),
        }
    }

    pub fn record_health_check(&self, result: &HealthCheckResult) {
        *self
            .last_health_check
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(result.timestamp);
        self.logger.emit_health(result);
    }

    pub fn last_health_check(&self) -> Option<DateTime<Utc>> {
        *self
            .last_health_check
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reject pool options the drivers would otherwise accept or retry on.
pub(crate) fn validate_pool(config: &ConnectionConfig) -> DbResult<()> {
    config.pool.validate().map_err(|message| {
        DbError::connection(
            format!("Invalid pool options: {}", message),
            "Set max_connections above 0 and no lower than min_connections",
        )
    })
}

/// Retry `attempt` up to `max_retries` extra times, sleeping `delay` between tries.
pub(crate) async fn with_retries<T, F, Fut>(
    backend: BackendKind,
    max_retries: u32,
    delay: std::time::Duration,
    mut attempt: F,
) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    let mut tries = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if tries < max_retries => {
                tries += 1;
                tracing::warn!(
                    backend = %backend,
                    attempt = tries,
                    max_retries = max_retries,
                    error = %err,
                    "Connect attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_core_state_transitions() {
        let core = AdapterCore::default();
        assert_eq!(core.state(), ConnectionState::Disconnected);
        assert!(core.begin_connect(BackendKind::Sqlite).unwrap());
        assert!(core.begin_connect(BackendKind::Sqlite).is_err());
        core.set_state(ConnectionState::Connected);
        assert!(!core.begin_connect(BackendKind::Sqlite).unwrap());
        assert!(!core.transition(ConnectionState::Disconnected, ConnectionState::Closing));
        assert!(core.transition(ConnectionState::Connected, ConnectionState::Closing));
    }

    #[test]
    fn test_close_during_connect_is_refused() {
        let core = AdapterCore::default();
        assert!(!core.begin_close(BackendKind::Sqlite).unwrap());
        assert!(core.begin_connect(BackendKind::Sqlite).unwrap());
        assert!(matches!(
            core.begin_close(BackendKind::Sqlite),
            Err(DbError::Connection { .. })
        ));
        assert_eq!(core.state(), ConnectionState::Connecting);
        core.set_state(ConnectionState::Connected);
        assert!(core.begin_close(BackendKind::Sqlite).unwrap());
        assert_eq!(core.state(), ConnectionState::Closing);
        assert!(!core.begin_close(BackendKind::Sqlite).unwrap());
    }

    #[test]
    fn test_record_health_check_updates_timestamp() {
        let core = AdapterCore::default();
        assert!(core.last_health_check().is_none());
        let result = HealthCheckResult::healthy(Utc::now(), 1);
        core.record_health_check(&result);
        assert_eq!(core.last_health_check(), Some(result.timestamp));
    }

    #[tokio::test]
    async fn test_with_retries_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: DbResult<()> =
            with_retries(BackendKind::Postgres, 2, Duration::from_millis(1), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(DbError::connection("refused", "retry")) }
            })
            .await;
        assert!(matches!(result, Err(DbError::Connection { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retries_returns_first_success() {
        let calls = AtomicU32::new(0);
        let value = with_retries(BackendKind::MySql, 5, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 1 {
                    Err(DbError::connection("refused", "retry"))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
