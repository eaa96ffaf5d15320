//! Runtime settings
//!
//! Settings come from CLI flags (the base URL also from the environment);
//! there is no config file.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::ClientConfig;
use crate::controller::ControllerConfig;

/// Environment variable selecting the plan service base URL
pub const API_URL_ENV: &str = "TASKS_GENERATOR_API_URL";

/// Base URL used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// How often the health monitor polls the status endpoint
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Number of plans the recent feed asks for
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// How long a success notice stays visible
pub const SUCCESS_NOTICE_TTL: Duration = Duration::from_secs(3);

/// Aggregated settings for a client session
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub controller: ControllerConfig,
    pub health_interval: Duration,
    pub recent_limit: usize,
    /// Directory exported markdown files are written to
    pub export_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            controller: ControllerConfig::default(),
            health_interval: HEALTH_POLL_INTERVAL,
            recent_limit: DEFAULT_RECENT_LIMIT,
            export_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }
}
