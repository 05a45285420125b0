//! Named registry of connected adapters.

use crate::config::{BackendKind, ConnectionConfig};
use crate::db::adapter::Adapter;
use crate::db::factory::{AdapterFactory, default_factory};
use crate::error::{DbError, DbResult};
use crate::models::ConnectionStatus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Name used when the caller does not pick one.
pub const DEFAULT_CONNECTION: &str = "default";

struct ManagedConnection {
    name: String,
    adapter: Arc<dyn Adapter>,
    config: ConnectionConfig,
}

impl ManagedConnection {
    fn status(&self) -> ConnectionStatus {
        let embedded = self.config.backend == BackendKind::Sqlite;
        ConnectionStatus {
            name: self.name.clone(),
            backend: self.config.backend,
            connected: self.adapter.is_connected(),
            host: if embedded {
                None
            } else {
                self.config.display_host()
            },
            database: if embedded {
                None
            } else {
                self.config.database.clone()
            },
            filename: if embedded {
                self.config.filename.clone()
            } else {
                None
            },
        }
    }
}

/// Connections are kept in creation order.
#[derive(Clone)]
pub struct ConnectionManager {
    connections: Arc<RwLock<Vec<ManagedConnection>>>,
    factory: AdapterFactory,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("factory", &"AdapterFactory")
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create a manager that builds adapters with [`create_adapter`](crate::db::create_adapter).
    pub fn new() -> Self {
        Self::with_factory(default_factory())
    }

    /// Create a manager with a caller-supplied adapter factory.
    pub fn with_factory(factory: AdapterFactory) -> Self {
        Self {
            connections: Arc::new(RwLock::new(Vec::new())),
            factory,
        }
    }

    /// Build, connect and register an adapter under `name`.
    pub async fn connect(
        &self,
        name: impl Into<String>,
        config: ConnectionConfig,
    ) -> DbResult<ConnectionStatus> {
        let name = name.into();

        // Early check for existing connection
        if self.exists(&name).await {
            return Err(already_exists(&name));
        }

        info!(
            connection = %name,
            backend = %config.backend,
            "Registering connection"
        );

        let adapter = (self.factory)(config.clone())?;
        adapter.connect().await?;

        // Re-check after the handshake; a concurrent connect may have won the name
        {
            let mut connections = self.connections.write().await;
            if !connections.iter().any(|c| c.name == name) {
                let entry = ManagedConnection {
                    name: name.clone(),
                    adapter,
                    config,
                };
                let status = entry.status();
                connections.push(entry);
                info!(connection = %name, "Connection registered");
                return Ok(status);
            }
        } // Lock released here

        if let Err(e) = adapter.close().await {
            warn!(connection = %name, error = %e, "Failed to close duplicate adapter");
        }
        Err(already_exists(&name))
    }

    /// Register a connection under [`DEFAULT_CONNECTION`].
    pub async fn connect_default(&self, config: ConnectionConfig) -> DbResult<ConnectionStatus> {
        self.connect(DEFAULT_CONNECTION, config).await
    }

    /// Get the adapter registered under `name`.
    pub async fn get_connection(&self, name: &str) -> DbResult<Arc<dyn Adapter>> {
        let connections = self.connections.read().await;
        connections
            .iter()
            .find(|c| c.name == name)
            .map(|c| Arc::clone(&c.adapter))
            .ok_or_else(|| DbError::connection_not_found(name))
    }

    /// Get the adapter registered under [`DEFAULT_CONNECTION`].
    pub async fn default_connection(&self) -> DbResult<Arc<dyn Adapter>> {
        self.get_connection(DEFAULT_CONNECTION).await
    }

    /// Registered names in creation order.
    pub async fn get_connection_names(&self) -> Vec<String> {
        let connections = self.connections.read().await;
        connections.iter().map(|c| c.name.clone()).collect()
    }

    /// Status of every registered connection in creation order.
    pub async fn statuses(&self) -> Vec<ConnectionStatus> {
        let connections = self.connections.read().await;
        connections.iter().map(ManagedConnection::status).collect()
    }

    pub async fn exists(&self, name: &str) -> bool {
        let connections = self.connections.read().await;
        connections.iter().any(|c| c.name == name)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Close one connection, or every connection when `name` is `None`.
    ///
    /// A named close removes the entry and surfaces the adapter's close error.
    /// Closing everything behaves like [`close_all`](Self::close_all).
    pub async fn close(&self, name: Option<&str>) -> DbResult<()> {
        let Some(name) = name else {
            self.close_all().await;
            return Ok(());
        };

        let entry = {
            let mut connections = self.connections.write().await;
            let index = connections
                .iter()
                .position(|c| c.name == name)
                .ok_or_else(|| DbError::connection_not_found(name))?;
            connections.remove(index)
        }; // Lock released before the adapter closes

        info!(connection = %name, "Closing connection");
        entry.adapter.close().await
    }

    /// Close every connection one after another, logging and skipping failures.
    pub async fn close_all(&self) {
        let entries: Vec<ManagedConnection> = {
            let mut connections = self.connections.write().await;
            connections.drain(..).collect()
        };

        for entry in entries {
            info!(connection = %entry.name, "Closing connection");
            if let Err(e) = entry.adapter.close().await {
                warn!(connection = %entry.name, error = %e, "Failed to close connection");
            }
        }
        info!("All connections closed");
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn already_exists(name: &str) -> DbError {
    DbError::connection(
        format!("Connection '{}' already exists", name),
        "Close it first or use a different connection name",
    )
}
