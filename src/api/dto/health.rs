//! DTOs for the health check endpoint.

use serde::Serialize;

/// Overall service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: ComponentCheck,
}

/// Result of probing one dependency.
#[derive(Debug, Serialize)]
pub struct ComponentCheck {
    /// `ok` or `error`.
    pub status: &'static str,
    /// Round-trip time of the probe.
    pub latency_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentCheck {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
