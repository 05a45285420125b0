//! Database abstraction layer.
//!
//! This module provides the adapter contract and its backends:
//! - The `Adapter` trait and transaction sugar
//! - Relational adapters (PostgreSQL, MySQL, SQLite) over sqlx pools
//! - The MongoDB adapter over the official driver
//! - Placeholder rewriting and the savepoint stack
//! - Row decoding and parameter binding
//! - Statement observers
//! - A named connection registry

#[macro_use]
pub mod macros;
pub mod adapter;
pub mod factory;
pub mod logger;
pub mod manager;
pub mod mongo;
pub mod params;
pub mod placeholder;
pub mod savepoint;
pub mod sql;
pub mod types;

pub use adapter::{Adapter, AdapterExt, ScopeFn};
pub use factory::{AdapterFactory, create_adapter, default_factory};
pub use logger::{LogKind, MemoryQueryLogger, QueryLogEntry, QueryLogger, TracingQueryLogger};
pub use macros::Dialect;
pub use manager::{ConnectionManager, DEFAULT_CONNECTION};
pub use mongo::{MongoAdapter, MongoTransaction};
pub use sql::{SqlAdapter, SqlTransaction};
