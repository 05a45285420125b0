//! Data models for dbkit.
//!
//! This module re-exports all model types shared by the adapters.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{ConnectionState, ConnectionStatus, HealthCheckResult, PoolStatus};
pub use query::{ExecuteResult, QueryParam, Row};
