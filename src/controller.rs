//! Plan controller
//!
//! Orchestrates the user-facing workflows (generate, select a recent plan,
//! save edits, export, go back) against the plan service and keeps the
//! [`PlanStore`] in step with their results.
//!
//! State lives behind a mutex that is never held across a request, so other
//! callers stay responsive while a workflow waits on the network. Transitions
//! are applied in the order requests resolve: when two loads race, the one
//! that resolves last wins unless `discard_stale_loads` is set.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{Client, ClientError};
use crate::config::SUCCESS_NOTICE_TTL;
use crate::export::ExportSink;
use crate::models::{FeaturePlan, PlanError, PlanId, Task, TaskCollection};
use crate::store::PlanStore;
use crate::validation::ValidInput;

const GENERATE_FAILED: &str = "Failed to generate feature plan. Please try again.";
const LOAD_FAILED: &str = "Failed to load feature plan";
const SAVE_FAILED: &str = "Failed to update tasks";
const EXPORT_FAILED: &str = "Failed to export feature plan";

/// A controller workflow that talks to the plan service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Generate,
    SelectRecent,
    Save,
    Export,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Generate => "plan generation",
            Operation::SelectRecent => "plan loading",
            Operation::Save => "saving tasks",
            Operation::Export => "plan export",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Generating,
    Loaded,
    Saving,
    Exporting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    StateChanged(ControllerState),
    /// A plan was generated, so recent plan listings are out of date
    RecentPlansStale,
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("{0} is already in progress")]
    Busy(Operation),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("{message}")]
    Request {
        message: String,
        #[source]
        source: ClientError,
    },

    #[error("{message}")]
    Export {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// How long success notices stay up
    pub notice_ttl: Duration,
    /// Ignore a load that resolves after a more recently started one
    pub discard_stale_loads: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            notice_ttl: SUCCESS_NOTICE_TTL,
            discard_stale_loads: false,
        }
    }
}

struct Inner {
    store: PlanStore,
    in_flight: Vec<Operation>,
    error: Option<String>,
    success: Option<String>,
    notice_seq: u64,
    notice_timer: Option<JoinHandle<()>>,
    // Sequence numbers of started and applied loads
    load_seq: u64,
    applied_load: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            store: PlanStore::new(),
            in_flight: Vec::new(),
            error: None,
            success: None,
            notice_seq: 0,
            notice_timer: None,
            load_seq: 0,
            applied_load: 0,
        }
    }

    fn state(&self) -> ControllerState {
        match self.in_flight.last() {
            Some(Operation::Generate | Operation::SelectRecent) => ControllerState::Generating,
            Some(Operation::Save) => ControllerState::Saving,
            Some(Operation::Export) => ControllerState::Exporting,
            None if self.store.plan().is_some() => ControllerState::Loaded,
            None => ControllerState::Idle,
        }
    }

    /// Marks `op` as in flight and clears notices left by earlier actions
    fn begin(&mut self, op: Operation) -> Result<u64, ControllerError> {
        if self.in_flight.contains(&op) {
            return Err(ControllerError::Busy(op));
        }
        if matches!(op, Operation::Save | Operation::Export) && self.store.plan().is_none() {
            return Err(PlanError::NoPlan.into());
        }

        self.in_flight.push(op);
        self.error = None;
        self.clear_success();
        self.load_seq += 1;
        Ok(self.load_seq)
    }

    fn finish(&mut self, op: Operation) {
        self.in_flight.retain(|o| *o != op);
    }

    /// Loads `plan` unless a newer load was already applied and stale loads
    /// are discarded. Returns whether the plan was loaded.
    fn apply_load(&mut self, ticket: u64, plan: FeaturePlan, discard_stale: bool) -> bool {
        if discard_stale && ticket < self.applied_load {
            debug!(plan = %plan.id(), ticket, applied = self.applied_load, "discarding stale plan load");
            return false;
        }
        self.applied_load = self.applied_load.max(ticket);
        self.store.load(plan);
        true
    }

    fn clear_success(&mut self) {
        self.success = None;
        if let Some(timer) = self.notice_timer.take() {
            timer.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.notice_timer.take() {
            timer.abort();
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    match inner.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Drives plan workflows against a [`Client`] and owns the current plan
#[derive(Clone)]
pub struct PlanController {
    inner: Arc<Mutex<Inner>>,
    client: Arc<dyn Client>,
    sink: Arc<dyn ExportSink>,
    config: ControllerConfig,
    events: Arc<broadcast::Sender<ControllerEvent>>,
}

impl PlanController {
    pub fn new(client: Arc<dyn Client>, sink: Arc<dyn ExportSink>) -> Self {
        Self::with_config(client, sink, ControllerConfig::default())
    }

    pub fn with_config(
        client: Arc<dyn Client>,
        sink: Arc<dyn ExportSink>,
        config: ControllerConfig,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            inner: Arc::new(Mutex::new(Inner::new())),
            client,
            sink,
            config,
            events: Arc::new(tx),
        }
    }

    // Helper method to access state and notify observers about the resulting state
    fn with_inner<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Inner) -> R,
    {
        let (result, state) = {
            let mut inner = lock(&self.inner);
            let result = f(&mut inner);
            (result, inner.state())
        };
        self.emit(ControllerEvent::StateChanged(state));
        result
    }

    fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Inner) -> R,
    {
        f(&lock(&self.inner))
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Subscribe to state changes and refresh signals
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ControllerState {
        self.read(Inner::state)
    }

    /// The plan as last loaded or saved
    pub fn plan(&self) -> Option<FeaturePlan> {
        self.read(|inner| inner.store.plan().cloned())
    }

    /// The edit buffer, including unsaved edits
    pub fn local_tasks(&self) -> Option<TaskCollection> {
        self.read(|inner| inner.store.local_tasks().cloned())
    }

    pub fn has_unsaved_edits(&self) -> bool {
        self.read(|inner| inner.store.has_unsaved_edits())
    }

    pub fn is_busy(&self, op: Operation) -> bool {
        self.read(|inner| inner.in_flight.contains(&op))
    }

    /// Error from the last failed action, until the next action starts
    pub fn error(&self) -> Option<String> {
        self.read(|inner| inner.error.clone())
    }

    /// Success notice, cleared automatically after the notice TTL
    pub fn success(&self) -> Option<String> {
        self.read(|inner| inner.success.clone())
    }

    pub fn dismiss_error(&self) {
        self.with_inner(|inner| inner.error = None);
    }

    /// Generates a plan and makes it the current one.
    ///
    /// Returns the id of the generated plan. With `discard_stale_loads` set, a
    /// plan that arrives after a newer load was applied exists on the service
    /// but does not become current, and no success notice is shown for it.
    pub async fn generate(&self, input: &ValidInput) -> Result<PlanId, ControllerError> {
        let ticket = self.with_inner(|inner| inner.begin(Operation::Generate))?;
        info!(goal = input.goal(), "generating feature plan");

        match self.client.generate_plan(input).await {
            Ok(plan) => {
                let id = plan.id().clone();
                let discard = self.config.discard_stale_loads;
                let applied = self.with_inner(|inner| {
                    inner.finish(Operation::Generate);
                    inner.apply_load(ticket, plan, discard)
                });
                if applied {
                    info!(plan = %id, "feature plan generated");
                    self.show_success("Feature plan generated successfully!");
                } else {
                    info!(plan = %id, "feature plan generated but a newer load is current");
                }
                self.emit(ControllerEvent::RecentPlansStale);
                Ok(id)
            }
            Err(err) => Err(self.fail(Operation::Generate, GENERATE_FAILED, err)),
        }
    }

    /// Loads an existing plan from the service and makes it the current one
    pub async fn select_recent(&self, id: &PlanId) -> Result<(), ControllerError> {
        let ticket = self.with_inner(|inner| inner.begin(Operation::SelectRecent))?;
        debug!(plan = %id, "loading feature plan");

        match self.client.get_plan(id).await {
            Ok(plan) => {
                let discard = self.config.discard_stale_loads;
                self.with_inner(|inner| {
                    inner.finish(Operation::SelectRecent);
                    inner.apply_load(ticket, plan, discard);
                });
                info!(plan = %id, "feature plan loaded");
                Ok(())
            }
            Err(err) => Err(self.fail(Operation::SelectRecent, LOAD_FAILED, err)),
        }
    }

    /// Reorders a task in the edit buffer
    pub fn reorder_task(&self, category: &str, from: usize, to: usize) -> Result<(), ControllerError> {
        self.with_inner(|inner| inner.store.reorder_task(category, from, to))?;
        Ok(())
    }

    /// Replaces a task in the edit buffer
    pub fn edit_task(&self, category: &str, index: usize, task: Task) -> Result<(), ControllerError> {
        self.with_inner(|inner| inner.store.edit_task(category, index, task))?;
        Ok(())
    }

    /// Persists the edit buffer as the current plan's engineering tasks.
    ///
    /// On failure the buffer keeps the unsaved edits.
    pub async fn save_edits(&self) -> Result<(), ControllerError> {
        let (id, tasks) = self.with_inner(|inner| {
            inner.begin(Operation::Save)?;
            let snapshot = inner.store.plan().map(|plan| plan.id().clone()).and_then(|id| {
                inner.store.commit_local_edits().ok().map(|tasks| (id, tasks))
            });
            match snapshot {
                Some(snapshot) => Ok(snapshot),
                None => {
                    inner.finish(Operation::Save);
                    Err(ControllerError::from(PlanError::NoPlan))
                }
            }
        })?;
        debug!(plan = %id, tasks = tasks.task_count(), "saving engineering tasks");

        match self.client.update_tasks(&id, &tasks).await {
            Ok(()) => {
                let applied = self.with_inner(|inner| {
                    inner.finish(Operation::Save);
                    inner.store.mark_saved(&id, tasks)
                });
                if !applied {
                    debug!(plan = %id, "saved plan is no longer current");
                }
                info!(plan = %id, "engineering tasks saved");
                self.show_success("Tasks updated successfully!");
                Ok(())
            }
            Err(err) => Err(self.fail(Operation::Save, SAVE_FAILED, err)),
        }
    }

    /// Exports a plan as markdown and hands it to the export sink
    pub async fn export(&self, id: &PlanId) -> Result<PathBuf, ControllerError> {
        self.with_inner(|inner| inner.begin(Operation::Export))?;
        debug!(plan = %id, "exporting feature plan");

        let exported = match self.client.export_plan(id).await {
            Ok(exported) => exported,
            Err(err) => return Err(self.fail(Operation::Export, EXPORT_FAILED, err)),
        };

        match self.sink.save(&exported) {
            Ok(path) => {
                self.with_inner(|inner| inner.finish(Operation::Export));
                info!(plan = %id, path = %path.display(), "feature plan exported");
                self.show_success("Feature plan exported successfully!");
                Ok(path)
            }
            Err(source) => {
                warn!(plan = %id, error = %source, "could not save exported plan");
                self.with_inner(|inner| {
                    inner.finish(Operation::Export);
                    inner.error = Some(EXPORT_FAILED.to_string());
                });
                Err(ControllerError::Export {
                    message: EXPORT_FAILED.to_string(),
                    source,
                })
            }
        }
    }

    /// Returns to the form, discarding the current plan and unsaved edits
    pub fn back(&self) {
        self.with_inner(|inner| {
            inner.store.clear();
            inner.error = None;
            inner.clear_success();
        });
    }

    /// Records a failed request and converts it into the user-facing error
    fn fail(&self, op: Operation, fallback: &str, err: ClientError) -> ControllerError {
        let message = err.detail().unwrap_or(fallback).to_string();
        warn!(operation = %op, error = %err, "plan service request failed");
        self.with_inner(|inner| {
            inner.finish(op);
            inner.error = Some(message.clone());
        });
        ControllerError::Request {
            message,
            source: err,
        }
    }

    /// Shows a success notice and schedules its removal. A newer notice or
    /// action cancels the pending removal. Subscribers are notified when the
    /// notice expires.
    fn show_success(&self, message: &str) {
        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        let events = Arc::downgrade(&self.events);
        let ttl = self.config.notice_ttl;

        let mut inner = lock(&self.inner);
        inner.clear_success();
        inner.notice_seq += 1;
        let seq = inner.notice_seq;
        inner.success = Some(message.to_string());
        inner.notice_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let state = {
                let mut inner = lock(&inner);
                if inner.notice_seq != seq {
                    return;
                }
                inner.success = None;
                inner.notice_timer = None;
                inner.state()
            };
            if let Some(events) = events.upgrade() {
                let _ = events.send(ControllerEvent::StateChanged(state));
            }
        }));
    }
}
