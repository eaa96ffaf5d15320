//! Client trait definition
//!
//! This module defines the `Client` trait that abstracts over the plan service,
//! so workflows can run against the HTTP implementation or an in-process stub.

use super::ClientError;
use crate::health::{HealthReport, Pong};
use crate::models::{ExportedPlan, FeaturePlan, PlanId, PlanSummary, TaskCollection};
use crate::validation::ValidInput;

/// Trait defining the plan service interface
#[async_trait::async_trait]
pub trait Client: Send + Sync {
    /// Generate a new feature plan
    async fn generate_plan(&self, input: &ValidInput) -> Result<FeaturePlan, ClientError>;

    /// List the most recent plans, newest first
    async fn recent_plans(&self, limit: usize) -> Result<Vec<PlanSummary>, ClientError>;

    /// Get a plan by id
    async fn get_plan(&self, id: &PlanId) -> Result<FeaturePlan, ClientError>;

    /// Replace the engineering tasks of a plan
    async fn update_tasks(&self, id: &PlanId, tasks: &TaskCollection) -> Result<(), ClientError>;

    /// Render a plan as markdown
    async fn export_plan(&self, id: &PlanId) -> Result<ExportedPlan, ClientError>;

    /// Get the aggregate health of the service and its dependencies
    async fn health_status(&self) -> Result<HealthReport, ClientError>;

    /// Check that the service answers at all
    async fn ping(&self) -> Result<Pong, ClientError>;
}
