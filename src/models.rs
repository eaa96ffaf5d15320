//! Core models for the tasks generator
//!
//! This module contains the feature plan data types and the categorized task
//! collection that local edits operate on.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Maximum length of a plan goal, in characters
pub const MAX_GOAL_CHARS: usize = 500;

/// Errors raised by plan and task collection operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("Unknown task category '{0}'")]
    UnknownCategory(String),

    #[error("Task index {index} out of range for category '{category}' ({len} tasks)")]
    IndexOutOfRange {
        category: String,
        index: usize,
        len: usize,
    },

    #[error("No feature plan is loaded")]
    NoPlan,
}

/// Server-assigned plan identifier.
///
/// The plan service hands out integers, but the identifier is treated as
/// opaque and string ids round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanId {
    Number(u64),
    Text(String),
}

impl From<u64> for PlanId {
    fn from(value: u64) -> Self {
        PlanId::Number(value)
    }
}

impl From<&str> for PlanId {
    fn from(value: &str) -> Self {
        value.parse().unwrap_or_else(|never: Infallible| match never {})
    }
}

impl FromStr for PlanId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<u64>() {
            Ok(n) => PlanId::Number(n),
            Err(_) => PlanId::Text(s.to_string()),
        })
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanId::Number(n) => write!(f, "{}", n),
            PlanId::Text(s) => f.write_str(s),
        }
    }
}

/// Task priority as assigned by the plan generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "critical", alias = "CRITICAL")]
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(format!(
                "unknown priority '{}' (expected low, medium, high or critical)",
                other
            )),
        }
    }
}

/// Severity of an identified risk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[default]
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        };
        f.write_str(s)
    }
}

/// A single engineering task within a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Service-side task id, carried so updates round-trip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub priority: Priority,
    pub estimated_effort: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl Task {
    /// Creates a task with no service-side metadata
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
        estimated_effort: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: description.into(),
            category: None,
            priority,
            estimated_effort: estimated_effort.into(),
            order: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStory {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub risk: String,
    pub mitigation: String,
    #[serde(default)]
    pub severity: Severity,
}

/// Engineering tasks grouped by category, in the order the service sent them.
///
/// Categories are open-ended strings decided at generation time. Operations
/// never add or remove categories; they return a new collection and leave the
/// original untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskCollection(IndexMap<String, Vec<Task>>);

impl TaskCollection {
    pub fn new(categories: IndexMap<String, Vec<Task>>) -> Self {
        Self(categories)
    }

    /// Category names in display order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Tasks of one category, if it exists
    pub fn tasks(&self, category: &str) -> Option<&[Task]> {
        self.0.get(category).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Task])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of tasks across all categories
    pub fn task_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Moves the task at `from` to position `to` within `category`.
    ///
    /// Both indices must be in range. Equal indices return an identical
    /// collection.
    pub fn reorder(&self, category: &str, from: usize, to: usize) -> Result<Self, PlanError> {
        let tasks = self.category_tasks(category)?;
        check_index(category, from, tasks.len())?;
        check_index(category, to, tasks.len())?;

        let mut next = self.clone();
        if from != to {
            if let Some(tasks) = next.0.get_mut(category) {
                let task = tasks.remove(from);
                tasks.insert(to, task);
            }
        }
        Ok(next)
    }

    /// Replaces the task at `index` in `category` with `task`
    pub fn edit_task(&self, category: &str, index: usize, task: Task) -> Result<Self, PlanError> {
        let tasks = self.category_tasks(category)?;
        check_index(category, index, tasks.len())?;

        let mut next = self.clone();
        if let Some(tasks) = next.0.get_mut(category) {
            tasks[index] = task;
        }
        Ok(next)
    }

    fn category_tasks(&self, category: &str) -> Result<&Vec<Task>, PlanError> {
        self.0
            .get(category)
            .ok_or_else(|| PlanError::UnknownCategory(category.to_string()))
    }
}

fn check_index(category: &str, index: usize, len: usize) -> Result<(), PlanError> {
    if index < len {
        Ok(())
    } else {
        Err(PlanError::IndexOutOfRange {
            category: category.to_string(),
            index,
            len,
        })
    }
}

impl FromIterator<(String, Vec<Task>)> for TaskCollection {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Task>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A generated feature plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePlan {
    id: PlanId,
    goal: String,
    #[serde(default)]
    user_stories: Vec<UserStory>,
    #[serde(default)]
    engineering_tasks: TaskCollection,
    #[serde(default)]
    risks: Vec<Risk>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    created_at: DateTime<Utc>,
}

impl FeaturePlan {
    pub fn new(
        id: PlanId,
        goal: String,
        user_stories: Vec<UserStory>,
        engineering_tasks: TaskCollection,
        risks: Vec<Risk>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            goal,
            user_stories,
            engineering_tasks,
            risks,
            created_at,
        }
    }

    pub fn id(&self) -> &PlanId {
        &self.id
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn user_stories(&self) -> &[UserStory] {
        &self.user_stories
    }

    pub fn engineering_tasks(&self) -> &TaskCollection {
        &self.engineering_tasks
    }

    pub fn risks(&self) -> &[Risk] {
        &self.risks
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replaces the engineering tasks after they were persisted
    pub(crate) fn set_engineering_tasks(&mut self, tasks: TaskCollection) {
        self.engineering_tasks = tasks;
    }
}

/// Summary row of the recent plans listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub id: PlanId,
    pub goal: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// Markdown rendering of a plan as returned by the export endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedPlan {
    pub content: String,
    pub filename: String,
}

/// Timestamps from the plan service may come without an offset; those are
/// read as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Ok(dt.with_timezone(&Utc)),
            Err(_) => raw.parse::<NaiveDateTime>().map(|naive| naive.and_utc()),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
