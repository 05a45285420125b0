//! Adapter construction keyed by the backend discriminator.

use crate::config::{BackendKind, ConnectionConfig};
use crate::db::adapter::Adapter;
use crate::db::mongo::MongoAdapter;
use crate::db::sql::SqlAdapter;
use crate::error::DbResult;
use std::sync::Arc;

/// Builds a disconnected adapter for a configuration.
///
/// [`ConnectionManager`](crate::db::ConnectionManager) uses [`create_adapter`]
/// unless a different factory is supplied, typically by tests.
pub type AdapterFactory = Arc<dyn Fn(ConnectionConfig) -> DbResult<Arc<dyn Adapter>> + Send + Sync>;

/// Create the adapter matching `config.backend`. The adapter is not connected.
pub fn create_adapter(config: ConnectionConfig) -> DbResult<Arc<dyn Adapter>> {
    let adapter: Arc<dyn Adapter> = match config.backend {
        BackendKind::Postgres | BackendKind::MySql | BackendKind::Sqlite => {
            Arc::new(SqlAdapter::new(config)?)
        }
        BackendKind::Mongo => Arc::new(MongoAdapter::new(config)?),
    };
    Ok(adapter)
}

/// The default factory as an [`AdapterFactory`] value.
pub fn default_factory() -> AdapterFactory {
    Arc::new(create_adapter)
}
