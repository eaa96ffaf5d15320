//! Recent plans feed
//!
//! A read-only listing of the newest plans. It fetches on first load and again
//! only when told it is stale, e.g. after a plan was generated.

use tracing::{debug, warn};

use crate::api::Client;
use crate::config::DEFAULT_RECENT_LIMIT;
use crate::controller::ControllerEvent;
use crate::models::PlanSummary;

/// Largest page the service will return
pub const MAX_RECENT_LIMIT: usize = 20;

const LOAD_FAILED: &str = "Failed to load recent plans";

#[derive(Debug, Clone)]
pub struct RecentPlansFeed {
    limit: usize,
    plans: Vec<PlanSummary>,
    error: Option<String>,
    loaded: bool,
    stale: bool,
}

impl Default for RecentPlansFeed {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_LIMIT)
    }
}

impl RecentPlansFeed {
    /// Creates an empty feed; `limit` is clamped to what the service accepts
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.clamp(1, MAX_RECENT_LIMIT),
            plans: Vec::new(),
            error: None,
            loaded: false,
            stale: true,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Plans from the last successful fetch, newest first
    pub fn plans(&self) -> &[PlanSummary] {
        &self.plans
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether any fetch has succeeded yet
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Marks the feed stale when the controller reports a new plan
    pub fn handle_event(&mut self, event: &ControllerEvent) {
        if matches!(event, ControllerEvent::RecentPlansStale) {
            debug!("recent plans marked stale");
            self.mark_stale();
        }
    }

    /// Fetches the listing. On failure the previous listing is kept and an
    /// error is recorded.
    pub async fn load(&mut self, client: &dyn Client) {
        match client.recent_plans(self.limit).await {
            Ok(mut plans) => {
                plans.truncate(self.limit);
                debug!(count = plans.len(), "recent plans loaded");
                self.plans = plans;
                self.error = None;
                self.loaded = true;
                self.stale = false;
            }
            Err(err) => {
                warn!(error = %err, "error fetching recent plans");
                self.error = Some(LOAD_FAILED.to_string());
            }
        }
    }

    /// Refetches only when the feed is stale. Returns whether a fetch ran.
    pub async fn refresh_if_stale(&mut self, client: &dyn Client) -> bool {
        if !self.stale {
            return false;
        }
        self.load(client).await;
        true
    }
}
