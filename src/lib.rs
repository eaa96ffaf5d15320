//! Tasks generator library crate
//!
//! Client-side model and workflows for AI-generated feature plans: request a
//! plan, reorder and edit its engineering tasks locally, save them back, export
//! the plan as markdown, and keep an eye on service health.

pub mod api;
pub mod cli;
pub mod config;
pub mod controller;
pub mod export;
pub mod health;
pub mod models;
pub mod recent;
pub mod store;
pub mod validation;

pub use api::{Client, ClientConfig, ClientError, HttpClientImpl};
pub use controller::{ControllerError, ControllerEvent, ControllerState, PlanController};
pub use health::{HealthMonitor, HealthReport, HealthStatus};
pub use models::{FeaturePlan, PlanId, Priority, Task, TaskCollection};
pub use recent::RecentPlansFeed;
pub use store::PlanStore;
pub use validation::{validate, FeatureDraft, ValidInput, ValidationError};
