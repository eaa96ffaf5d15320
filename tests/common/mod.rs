//! In-memory plan service shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tasks_generator::api::{Client, ClientError};
use tasks_generator::health::{HealthReport, Pong};
use tasks_generator::models::{
    ExportedPlan, FeaturePlan, PlanId, PlanSummary, Priority, Risk, Severity, Task,
    TaskCollection, UserStory,
};
use tasks_generator::validation::{validate, ValidInput};

pub fn task(title: &str) -> Task {
    Task::new(title, format!("{} description", title), Priority::Medium, "1 day")
}

pub fn sample_tasks() -> TaskCollection {
    vec![
        (
            "Backend".to_string(),
            vec![task("Theme API"), task("Preference column"), task("Migration")],
        ),
        ("Frontend".to_string(), vec![task("Toggle")]),
        ("Testing".to_string(), vec![]),
    ]
    .into_iter()
    .collect()
}

pub fn sample_plan(id: impl Into<PlanId>, goal: &str) -> FeaturePlan {
    FeaturePlan::new(
        id.into(),
        goal.to_string(),
        vec![UserStory {
            title: "Switch themes".to_string(),
            description: "As a user I want a dark theme".to_string(),
            acceptance_criteria: vec!["Theme persists across sessions".to_string()],
        }],
        sample_tasks(),
        vec![Risk {
            risk: "Low contrast".to_string(),
            mitigation: "Run an accessibility audit".to_string(),
            severity: Severity::Low,
        }],
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    )
}

pub fn dark_mode_input() -> ValidInput {
    validate("Add dark mode", &["end users"], &["no new dependencies"]).unwrap()
}

pub fn titles(tasks: &TaskCollection, category: &str) -> Vec<String> {
    tasks
        .tasks(category)
        .unwrap()
        .iter()
        .map(|t| t.title.clone())
        .collect()
}

#[derive(Default)]
pub struct StubState {
    pub plans: HashMap<PlanId, FeaturePlan>,
    pub next_id: u64,
    pub recent: Vec<PlanSummary>,
    /// `None` makes the status endpoint fail
    pub health: Option<HealthReport>,
    /// Operation name to the `detail` its failure carries
    pub failures: HashMap<&'static str, Option<String>>,
    pub generate_delay: Option<Duration>,
    pub load_delays: HashMap<PlanId, Duration>,
    pub save_delay: Option<Duration>,
    pub export_delay: Option<Duration>,
    pub calls: Vec<String>,
    pub updates: Vec<(PlanId, TaskCollection)>,
    pub health_polls: usize,
}

/// A [`Client`] backed by an in-memory map of plans
#[derive(Default)]
pub struct StubClient {
    state: Mutex<StubState>,
}

impl StubClient {
    pub fn new() -> Self {
        let stub = Self::default();
        stub.state().next_id = 1;
        stub
    }

    pub fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }

    pub fn insert(&self, plan: FeaturePlan) {
        self.state().plans.insert(plan.id().clone(), plan);
    }

    pub fn fail(&self, op: &'static str, detail: Option<&str>) {
        self.state().failures.insert(op, detail.map(String::from));
    }

    pub fn recover(&self, op: &'static str) {
        self.state().failures.remove(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Records the call and returns the configured failure, if any
    fn enter(&self, op: &'static str, call: String) -> Result<(), ClientError> {
        let mut state = self.state();
        state.calls.push(call);
        match state.failures.get(op) {
            Some(detail) => Err(ClientError::Api {
                status: 500,
                detail: detail.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Client for StubClient {
    async fn generate_plan(&self, input: &ValidInput) -> Result<FeaturePlan, ClientError> {
        let delay = self.state().generate_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.enter("generate_plan", format!("generate:{}", input.goal()))?;

        let mut state = self.state();
        let plan = sample_plan(state.next_id, input.goal());
        state.next_id += 1;
        state.plans.insert(plan.id().clone(), plan.clone());
        Ok(plan)
    }

    async fn recent_plans(&self, limit: usize) -> Result<Vec<PlanSummary>, ClientError> {
        self.enter("recent_plans", format!("recent:{}", limit))?;
        Ok(self.state().recent.clone())
    }

    async fn get_plan(&self, id: &PlanId) -> Result<FeaturePlan, ClientError> {
        let delay = self.state().load_delays.get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.enter("get_plan", format!("get:{}", id))?;

        self.state()
            .plans
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::Api {
                status: 404,
                detail: Some("Feature plan not found".to_string()),
            })
    }

    async fn update_tasks(&self, id: &PlanId, tasks: &TaskCollection) -> Result<(), ClientError> {
        let delay = self.state().save_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.enter("update_tasks", format!("update:{}", id))?;

        let mut state = self.state();
        state.updates.push((id.clone(), tasks.clone()));
        if let Some(plan) = state.plans.get(id).cloned() {
            let updated = FeaturePlan::new(
                plan.id().clone(),
                plan.goal().to_string(),
                plan.user_stories().to_vec(),
                tasks.clone(),
                plan.risks().to_vec(),
                plan.created_at(),
            );
            state.plans.insert(id.clone(), updated);
        }
        Ok(())
    }

    async fn export_plan(&self, id: &PlanId) -> Result<ExportedPlan, ClientError> {
        let delay = self.state().export_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.enter("export_plan", format!("export:{}", id))?;

        let state = self.state();
        let plan = state.plans.get(id).ok_or_else(|| ClientError::Api {
            status: 404,
            detail: Some("Feature plan not found".to_string()),
        })?;
        Ok(ExportedPlan {
            content: format!("# Feature Plan: {}\n", plan.goal()),
            filename: format!("feature_plan_{}.md", id),
        })
    }

    async fn health_status(&self) -> Result<HealthReport, ClientError> {
        let mut state = self.state();
        state.health_polls += 1;
        state.health.clone().ok_or(ClientError::Api {
            status: 503,
            detail: None,
        })
    }

    async fn ping(&self) -> Result<Pong, ClientError> {
        self.enter("ping", "ping".to_string())?;
        Ok(Pong {
            message: "pong".to_string(),
            timestamp: None,
        })
    }
}
