//! dbkit
//!
//! One adapter contract over PostgreSQL, MySQL, SQLite and MongoDB: connection
//! lifecycle, parameterized statements, nested transactions with savepoints,
//! and a backend-aware condition translator.

pub mod condition;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use condition::{Condition, FindOptions, SortDirection, Statement};
pub use config::{BackendKind, ConnectionConfig, PoolOptions};
pub use db::{Adapter, AdapterExt, ConnectionManager, create_adapter};
pub use error::{DbError, DbResult};
