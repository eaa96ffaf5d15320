//! Plan store
//!
//! Holds the single plan currently in view together with its local edit
//! buffer. The buffer starts as a copy of the plan's tasks and diverges as the
//! user reorders or edits; it is only reconciled with the plan when a save
//! succeeds.

use crate::models::{FeaturePlan, PlanError, PlanId, Task, TaskCollection};

#[derive(Debug, Clone)]
struct Editing {
    plan: FeaturePlan,
    local: TaskCollection,
}

#[derive(Debug, Clone, Default)]
pub struct PlanStore {
    current: Option<Editing>,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current plan wholesale and resets the edit buffer to the
    /// plan's tasks
    pub fn load(&mut self, plan: FeaturePlan) {
        let local = plan.engineering_tasks().clone();
        self.current = Some(Editing { plan, local });
    }

    /// Drops the current plan and any unsaved edits
    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn plan(&self) -> Option<&FeaturePlan> {
        self.current.as_ref().map(|e| &e.plan)
    }

    pub fn local_tasks(&self) -> Option<&TaskCollection> {
        self.current.as_ref().map(|e| &e.local)
    }

    pub fn has_unsaved_edits(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|e| &e.local != e.plan.engineering_tasks())
    }

    /// Returns the edit buffer to be persisted
    pub fn commit_local_edits(&self) -> Result<TaskCollection, PlanError> {
        self.local_tasks().cloned().ok_or(PlanError::NoPlan)
    }

    pub fn reorder_task(&mut self, category: &str, from: usize, to: usize) -> Result<(), PlanError> {
        self.apply(|tasks| tasks.reorder(category, from, to))
    }

    pub fn edit_task(&mut self, category: &str, index: usize, task: Task) -> Result<(), PlanError> {
        self.apply(|tasks| tasks.edit_task(category, index, task))
    }

    /// Makes `tasks` the saved baseline of plan `id`.
    ///
    /// Returns false when a different plan (or none) has been loaded since the
    /// save started. The edit buffer is left alone either way.
    pub fn mark_saved(&mut self, id: &PlanId, tasks: TaskCollection) -> bool {
        match self.current.as_mut() {
            Some(editing) if editing.plan.id() == id => {
                editing.plan.set_engineering_tasks(tasks);
                true
            }
            _ => false,
        }
    }

    /// Swaps in a new buffer computed from the current one, so a failed
    /// operation leaves the buffer untouched
    fn apply<F>(&mut self, f: F) -> Result<(), PlanError>
    where
        F: FnOnce(&TaskCollection) -> Result<TaskCollection, PlanError>,
    {
        let editing = self.current.as_mut().ok_or(PlanError::NoPlan)?;
        editing.local = f(&editing.local)?;
        Ok(())
    }
}
