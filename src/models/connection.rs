//! Connection-related data models.
//!
//! This module defines adapter lifecycle states and the point-in-time snapshots
//! adapters hand out: pool occupancy, health checks and manager status.

use crate::config::BackendKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Adapter lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Closing = 3,
}

impl ConnectionState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Closing,
            _ => Self::Disconnected,
        }
    }

    /// Check if the adapter can serve statements.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Snapshot of backend pool occupancy at the instant of the call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub total: u32,
    pub active: u32,
    pub idle: u32,
    pub waiting: u32,
}

impl PoolStatus {
    /// Status of a single persistent connection.
    pub fn single() -> Self {
        Self {
            total: 1,
            active: 1,
            idle: 0,
            waiting: 0,
        }
    }

    /// Build a snapshot from the pool size and its idle count.
    pub fn from_size(total: u32, idle: u32) -> Self {
        let idle = idle.min(total);
        Self {
            total,
            active: total - idle,
            idle,
            waiting: 0,
        }
    }
}

/// Result of a round-trip health check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub timestamp: DateTime<Utc>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthCheckResult {
    pub fn healthy(timestamp: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            healthy: true,
            timestamp,
            latency_ms,
            error: None,
        }
    }

    pub fn unhealthy(timestamp: DateTime<Utc>, latency_ms: u64, error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            timestamp,
            latency_ms,
            error: Some(error.into()),
        }
    }
}

/// Information about a managed connection, returned after a successful connect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub name: String,
    pub backend: BackendKind,
    pub connected: bool,
    /// Networked backends only ("host" or "host:port")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Embedded backend only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}
