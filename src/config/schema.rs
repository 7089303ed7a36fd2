//! Configuration schema definitions.
//!
//! This module defines the configuration structure for injected exchanges.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct InjectorConfig {
    /// How responses render their header block.
    pub response: ResponseConfig,

    /// Caller-side limits applied by the injection runner.
    pub inject: InjectConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Header rendering behavior of a response.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResponseConfig {
    /// Add a `Date` field when the handler did not set one.
    pub send_date: bool,

    /// Announce `Connection: keep-alive` when the exchange allows it.
    pub keep_alive: bool,

    /// Use chunked transfer coding when the body length is unknown.
    pub chunked_by_default: bool,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            send_date: true,
            keep_alive: true,
            chunked_by_default: true,
        }
    }
}

/// Injection runner settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct InjectConfig {
    /// Deadline for a whole injected exchange. None waits forever.
    pub timeout_ms: Option<u64>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
