//! HTTP client implementation
//!
//! This module provides the reqwest-backed client for the plan service REST API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client as ReqwestClient, Error as ReqwestError, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Client;
use crate::config::DEFAULT_API_URL;
use crate::health::{HealthReport, Pong};
use crate::models::{ExportedPlan, FeaturePlan, PlanId, PlanSummary, TaskCollection};
use crate::validation::ValidInput;

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    #[error("API error ({status}): {}", .detail.as_deref().unwrap_or("no details"))]
    Api { status: u16, detail: Option<String> },
}

impl ClientError {
    /// The message the service attached to a failed request, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Api { detail, .. } => detail.as_deref(),
            ClientError::Http(_) => None,
        }
    }
}

/// Error body returned by the service on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// reqwest-backed client for the plan service
#[derive(Debug, Clone)]
pub struct HttpClientImpl {
    http_client: Arc<ReqwestClient>,
    config: ClientConfig,
}

impl HttpClientImpl {
    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self, ClientError> {
        let http_client = ReqwestClient::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client: Arc::new(http_client),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.http_client.get(&url).send().await?;
        read_json(response).await
    }
}

/// Turns a non-2xx response into `ClientError::Api`, keeping the service's
/// `detail` message when it sent one
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            detail: Some(serde_json::Value::String(message)),
        }) => Some(message),
        Ok(ErrorBody {
            detail: Some(other),
        }) => Some(other.to_string()),
        _ => None,
    };
    warn!(status = status.as_u16(), detail = ?detail, "plan service returned an error");

    Err(ClientError::Api {
        status: status.as_u16(),
        detail,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

#[async_trait::async_trait]
impl Client for HttpClientImpl {
    async fn generate_plan(&self, input: &ValidInput) -> Result<FeaturePlan, ClientError> {
        let url = self.url("/features/generate");
        debug!(%url, goal = input.goal(), "POST");
        let response = self.http_client.post(&url).json(input).send().await?;
        read_json(response).await
    }

    async fn recent_plans(&self, limit: usize) -> Result<Vec<PlanSummary>, ClientError> {
        let url = self.url("/features/recent");
        debug!(%url, limit, "GET");
        let response = self
            .http_client
            .get(&url)
            .query(&[("limit", limit)])
            .send()
            .await?;
        read_json(response).await
    }

    async fn get_plan(&self, id: &PlanId) -> Result<FeaturePlan, ClientError> {
        self.get_json(&format!("/features/{}", id)).await
    }

    async fn update_tasks(&self, id: &PlanId, tasks: &TaskCollection) -> Result<(), ClientError> {
        #[derive(Serialize)]
        struct UpdateTasksRequest<'a> {
            engineering_tasks: &'a TaskCollection,
        }

        let url = self.url(&format!("/features/{}/tasks", id));
        debug!(%url, tasks = tasks.task_count(), "PUT");
        let request = UpdateTasksRequest {
            engineering_tasks: tasks,
        };
        let response = self.http_client.put(&url).json(&request).send().await?;

        // The body is only an acknowledgement
        check_status(response).await?;
        Ok(())
    }

    async fn export_plan(&self, id: &PlanId) -> Result<ExportedPlan, ClientError> {
        self.get_json(&format!("/features/{}/export", id)).await
    }

    async fn health_status(&self) -> Result<HealthReport, ClientError> {
        self.get_json("/health/status").await
    }

    async fn ping(&self) -> Result<Pong, ClientError> {
        self.get_json("/health/ping").await
    }
}
