//! Health monitoring
//!
//! [`HealthMonitor`] polls the service's status endpoint on a fixed interval
//! from a background task it owns. Only the latest report is kept. A failed
//! poll never surfaces as an error: it reads as every subsystem being
//! unhealthy.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::Client;
use crate::models::timestamp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    /// Not polled yet, or a status the service reported that we don't know
    #[default]
    #[serde(other)]
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    #[serde(default)]
    pub status: HealthStatus,
}

impl ComponentHealth {
    pub fn new(status: HealthStatus) -> Self {
        Self { status }
    }
}

/// One reading of the status endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: HealthStatus,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub backend: ComponentHealth,
    #[serde(default)]
    pub database: ComponentHealth,
    #[serde(default, rename = "llm", alias = "llmService", alias = "llm_service")]
    pub llm: ComponentHealth,
}

impl HealthReport {
    /// Report with the same status for the aggregate and every subsystem
    pub fn uniform(status: HealthStatus) -> Self {
        let component = ComponentHealth::new(status);
        Self {
            status,
            timestamp: None,
            backend: component,
            database: component,
            llm: component,
        }
    }

    /// State before the first poll completes
    pub fn unknown() -> Self {
        Self::uniform(HealthStatus::Unknown)
    }

    /// Substituted when the status endpoint cannot be reached
    pub fn unreachable() -> Self {
        Self::uniform(HealthStatus::Unhealthy)
    }

    pub fn is_operational(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// Subsystem readings with display names
    pub fn components(&self) -> [(&'static str, HealthStatus); 3] {
        [
            ("Backend", self.backend.status),
            ("Database", self.database.status),
            ("LLM", self.llm.status),
        ]
    }
}

/// Response of the ping endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub message: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Polls the status endpoint once, mapping any failure to an all-unhealthy
/// report
pub async fn poll_once(client: &dyn Client) -> HealthReport {
    match client.health_status().await {
        Ok(report) => {
            debug!(status = %report.status, "health check completed");
            report
        }
        Err(err) => {
            warn!(error = %err, "health check failed");
            HealthReport::unreachable()
        }
    }
}

/// Background health poller.
///
/// Polls immediately on start, then once per interval. The polling task is
/// aborted when the monitor is stopped or dropped.
pub struct HealthMonitor {
    snapshot: watch::Receiver<HealthReport>,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    pub fn start(client: Arc<dyn Client>, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(HealthReport::unknown());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // A slow poll pushes the next one back instead of bursting
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let report = poll_once(client.as_ref()).await;
                tx.send_replace(report);
            }
        });

        Self { snapshot: rx, task }
    }

    /// Latest report
    pub fn snapshot(&self) -> HealthReport {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every completed poll
    pub fn subscribe(&self) -> watch::Receiver<HealthReport> {
        self.snapshot.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops polling. Equivalent to dropping the monitor.
    pub fn stop(self) {}
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
